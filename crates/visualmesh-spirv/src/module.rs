//! In-memory module layout and the final serializer.
//!
//! Sections are kept apart while the module is populated and are only concatenated when the module
//! is assembled, so construction order never leaks into the binary layout:
//!
//! 1. `OpCapability`
//! 2. `OpExtension`
//! 3. `OpExtInstImport`
//! 4. `OpMemoryModel`
//! 5. `OpEntryPoint`
//! 6. `OpExecutionMode`
//! 7. Debug: `OpString`/`OpSource`, then `OpName`/`OpMemberName`
//! 8. Annotations (`OpDecorate`, `OpMemberDecorate`)
//! 9. Types, constants and module scope variables
//! 10. Function definitions

use rspirv::{binary::Assemble, dr::Instruction, spirv::Word};

/// SPIR-V magic number, first word of every module.
pub const MAGIC_NUMBER: u32 = 0x0723_0203;

/// Number of words in the module header.
pub const HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub generator: u32,
    pub bound: Word,
}

impl Header {
    pub fn words(&self) -> [u32; HEADER_LEN] {
        [MAGIC_NUMBER, self.version, self.generator, self.bound, 0]
    }
}

/// Version word for `major.minor`.
pub fn version_word(major: u8, minor: u8) -> u32 {
    ((major as u32) << 16) | ((minor as u32) << 8)
}

#[derive(Debug, Clone)]
pub struct Block {
    pub label: Instruction,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub def: Instruction,
    pub parameters: Vec<Instruction>,
    pub blocks: Vec<Block>,
    pub end: Instruction,
}

impl Function {
    pub fn id(&self) -> Option<Word> {
        self.def.result_id
    }

    pub fn all_inst_iter(&self) -> impl Iterator<Item = &Instruction> {
        std::iter::once(&self.def)
            .chain(self.parameters.iter())
            .chain(
                self.blocks
                    .iter()
                    .flat_map(|block| std::iter::once(&block.label).chain(&block.instructions)),
            )
            .chain(std::iter::once(&self.end))
    }
}

/// A finished module, ready to be serialized.
#[derive(Debug, Clone)]
pub struct Module {
    pub header: Header,
    pub capabilities: Vec<Instruction>,
    pub extensions: Vec<Instruction>,
    pub ext_inst_imports: Vec<Instruction>,
    pub memory_model: Instruction,
    pub entry_points: Vec<Instruction>,
    pub execution_modes: Vec<Instruction>,
    pub debug_source: Vec<Instruction>,
    pub debug_names: Vec<Instruction>,
    pub annotations: Vec<Instruction>,
    pub types_global_values: Vec<Instruction>,
    pub functions: Vec<Function>,
}

impl Module {
    /// Every instruction outside of function bodies, in serialization order.
    pub fn global_inst_iter(&self) -> impl Iterator<Item = &Instruction> {
        self.capabilities
            .iter()
            .chain(&self.extensions)
            .chain(&self.ext_inst_imports)
            .chain(std::iter::once(&self.memory_model))
            .chain(&self.entry_points)
            .chain(&self.execution_modes)
            .chain(&self.debug_source)
            .chain(&self.debug_names)
            .chain(&self.annotations)
            .chain(&self.types_global_values)
    }

    pub fn all_inst_iter(&self) -> impl Iterator<Item = &Instruction> {
        self.global_inst_iter()
            .chain(self.functions.iter().flat_map(|f| f.all_inst_iter()))
    }

    /// Serialize the module into its binary word stream.
    pub fn assemble(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(HEADER_LEN + 16 * self.types_global_values.len());
        words.extend_from_slice(&self.header.words());
        for inst in self.all_inst_iter() {
            inst.assemble_into(&mut words);
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_words() {
        assert_eq!(version_word(1, 0), 0x0001_0000);
        assert_eq!(version_word(1, 3), 0x0001_0300);
    }
}
