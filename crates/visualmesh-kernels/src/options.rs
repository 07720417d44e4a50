use std::fmt::Display;

use serde::{Deserialize, Serialize};
use visualmesh_spirv::Elem;

use crate::config::GlobalConfig;

/// Scalar precision shared by every float type and constant of a generated module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    #[default]
    #[serde(rename = "f32")]
    F32,
    #[serde(rename = "f64")]
    F64,
}

impl Precision {
    pub fn width(&self) -> u32 {
        match self {
            Precision::F32 => 32,
            Precision::F64 => 64,
        }
    }

    pub fn elem(&self) -> Elem {
        Elem::Float(self.width())
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.width())
    }
}

/// Build time parameters of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelOptions {
    pub precision: Precision,
    pub debug_symbols: bool,
    pub local_size: [u32; 3],
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            precision: Precision::F32,
            debug_symbols: false,
            local_size: [1, 1, 1],
        }
    }
}

impl KernelOptions {
    /// Options taken from the global configuration.
    pub fn from_config() -> Self {
        let config = GlobalConfig::get();
        Self {
            precision: config.compilation.precision,
            debug_symbols: config.compilation.debug_symbols,
            local_size: config.compilation.local_size,
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_debug_symbols(mut self, debug_symbols: bool) -> Self {
        self.debug_symbols = debug_symbols;
        self
    }

    pub fn with_local_size(mut self, local_size: [u32; 3]) -> Self {
        self.local_size = local_size;
        self
    }
}
