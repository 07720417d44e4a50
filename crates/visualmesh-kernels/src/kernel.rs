use std::fmt::Display;

use rspirv::binary::Disassemble;
use serde::{Deserialize, Serialize};

use crate::{format::SensorFormat, options::Precision, resources::Binding};

/// A serialized image loading kernel, ready to be handed to a Vulkan pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpirvKernel {
    pub entry_point: String,
    pub format: SensorFormat,
    pub precision: Precision,
    pub assembled_module: Vec<u32>,
    pub bindings: Vec<Binding>,
}

impl Eq for SpirvKernel {}
impl PartialEq for SpirvKernel {
    fn eq(&self, other: &Self) -> bool {
        self.assembled_module == other.assembled_module
    }
}

impl SpirvKernel {
    /// Little endian bytes of the module, the layout `vkCreateShaderModule` expects.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.assembled_module
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect()
    }
}

impl Display for SpirvKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match rspirv::dr::load_words(&self.assembled_module) {
            Ok(module) => write!(f, "{}", module.disassemble()),
            Err(_) => write!(f, "SPIR-V ({} words)", self.assembled_module.len()),
        }
    }
}
