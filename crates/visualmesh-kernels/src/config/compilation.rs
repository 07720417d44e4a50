use super::logger::{BinaryLogLevel, LoggerConfig};
use crate::options::Precision;

/// Settings applied to every generated kernel.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompilationConfig {
    #[serde(default)]
    pub logger: LoggerConfig<CompilationLogLevel>,

    /// Emit `OpSource`/`OpName` debug annotations.
    #[serde(default)]
    pub debug_symbols: bool,

    /// Scalar precision of every float type and constant.
    #[serde(default)]
    pub precision: Precision,

    /// Workgroup size of the generated entry points.
    #[serde(default = "local_size_default")]
    pub local_size: [u32; 3],
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            debug_symbols: false,
            precision: Precision::default(),
            local_size: local_size_default(),
        }
    }
}

fn local_size_default() -> [u32; 3] {
    [1, 1, 1]
}

pub type CompilationLogLevel = BinaryLogLevel;
