use rspirv::{
    dr::{Instruction, Operand},
    spirv::{Op, SourceLanguage, Word},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::Item,
};

/// Debug annotations. Targets are always checked, but names are only emitted when `debug_symbols`
/// is enabled.
impl ModuleBuilder {
    pub fn source(&mut self, language: SourceLanguage, version: u32) {
        if !self.config.debug_symbols || !self.debug_source.is_empty() {
            return;
        }
        self.debug_source.push(Instruction::new(
            Op::Source,
            None,
            None,
            vec![
                Operand::SourceLanguage(language),
                Operand::LiteralBit32(version),
            ],
        ));
    }

    fn is_visible(&self, id: Word) -> bool {
        self.state.is_defined(id) || self.type_of(id).is_some()
    }

    /// Name an id. Only the first name given to an id is kept.
    pub fn name(&mut self, target: Word, name: impl Into<String>) -> BuildResult<()> {
        if !self.is_visible(target) {
            return Err(BuildError::MissingTarget(target));
        }
        if !self.config.debug_symbols {
            return Ok(());
        }
        if self.state.debug_names.insert((target, None)) {
            self.debug_names.push(Instruction::new(
                Op::Name,
                None,
                None,
                vec![Operand::IdRef(target), Operand::LiteralString(name.into())],
            ));
        }
        Ok(())
    }

    pub fn member_name(
        &mut self,
        target: Word,
        member: u32,
        name: impl Into<String>,
    ) -> BuildResult<()> {
        match self.state.items.get(&target) {
            Some(Item::Struct(members)) if member < members.len() as u32 => {}
            Some(Item::Struct(members)) => {
                return Err(BuildError::ComponentOutOfRange {
                    index: member,
                    width: members.len() as u32,
                })
            }
            _ => return Err(BuildError::MissingTarget(target)),
        }
        if !self.config.debug_symbols {
            return Ok(());
        }
        if self.state.debug_names.insert((target, Some(member))) {
            self.debug_names.push(Instruction::new(
                Op::MemberName,
                None,
                None,
                vec![
                    Operand::IdRef(target),
                    Operand::LiteralBit32(member),
                    Operand::LiteralString(name.into()),
                ],
            ));
        }
        Ok(())
    }
}
