use rspirv::{
    binary::Assemble,
    dr::{Instruction, Operand},
    spirv::{BuiltIn, Decoration, Op, StorageClass, Word},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::Item,
    variable::Value,
};

/// Extension needed for the `StorageBuffer` storage class before SPIR-V 1.3.
pub const STORAGE_BUFFER_EXTENSION: &str = "SPV_KHR_storage_buffer_storage_class";

/// How a kernel uses a storage buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl ModuleBuilder {
    fn annotate(&mut self, target: Word, instruction: Instruction) -> BuildResult<()> {
        if !self.state.is_defined(target) {
            return Err(BuildError::MissingTarget(target));
        }
        let mut words = Vec::new();
        instruction.assemble_into(&mut words);
        if self.state.annotations.insert(words) {
            self.annotations.push(instruction);
        }
        Ok(())
    }

    /// Attach a decoration. Repeating an identical decoration is a no-op.
    pub fn decorate(
        &mut self,
        target: Word,
        decoration: Decoration,
        operands: Vec<Operand>,
    ) -> BuildResult<()> {
        let mut all = vec![Operand::IdRef(target), Operand::Decoration(decoration)];
        all.extend(operands);
        self.annotate(target, Instruction::new(Op::Decorate, None, None, all))
    }

    /// Attach a decoration to one member of a struct type.
    pub fn member_decorate(
        &mut self,
        target: Word,
        member: u32,
        decoration: Decoration,
        operands: Vec<Operand>,
    ) -> BuildResult<()> {
        let Some(Item::Struct(members)) = self.state.items.get(&target) else {
            return Err(BuildError::MissingTarget(target));
        };
        let width = members.len() as u32;
        if member >= width {
            return Err(BuildError::ComponentOutOfRange {
                index: member,
                width,
            });
        }
        let mut all = vec![
            Operand::IdRef(target),
            Operand::LiteralBit32(member),
            Operand::Decoration(decoration),
        ];
        all.extend(operands);
        self.annotate(target, Instruction::new(Op::MemberDecorate, None, None, all))
    }

    /// Place a resource variable at `(set, binding)`. Each slot can only be used once.
    pub fn descriptor_binding(&mut self, variable: Value, set: u32, binding: u32) -> BuildResult<()> {
        let item = self.check(Op::Decorate, &variable)?;
        if !matches!(
            item,
            Item::Pointer(
                StorageClass::UniformConstant | StorageClass::Uniform | StorageClass::StorageBuffer,
                _
            )
        ) {
            return Err(BuildError::TypeMismatch {
                op: Op::Decorate,
                expected: "resource variable".into(),
                found: item.to_string(),
            });
        }
        if let Some(existing) = self.state.bindings.get(&(set, binding)) {
            return Err(BuildError::DuplicateBinding {
                set,
                binding,
                existing: *existing,
            });
        }
        self.state.bindings.insert((set, binding), variable.id);
        self.decorate(
            variable.id,
            Decoration::DescriptorSet,
            vec![Operand::LiteralBit32(set)],
        )?;
        self.decorate(
            variable.id,
            Decoration::Binding,
            vec![Operand::LiteralBit32(binding)],
        )
    }

    /// Declare a storage buffer holding a runtime sized array of `element`.
    ///
    /// The array is wrapped in a `Block` struct with its only member at offset 0, and the array
    /// stride is the packed size of `element`.
    pub fn storage_buffer(&mut self, element: Item, access: Access) -> BuildResult<Value> {
        self.extension(STORAGE_BUFFER_EXTENSION);
        let block = Item::Struct(vec![Item::RuntimeArray(Box::new(element))]);
        let block_id = self.type_id(&block)?;
        self.decorate(block_id, Decoration::Block, vec![])?;
        self.member_decorate(
            block_id,
            0,
            Decoration::Offset,
            vec![Operand::LiteralBit32(0)],
        )?;

        let variable = self.variable(StorageClass::StorageBuffer, block)?;
        if access == Access::ReadOnly {
            self.decorate(variable.id, Decoration::NonWritable, vec![])?;
        }
        Ok(variable)
    }

    /// Declare an opaque resource such as an image or a sampler.
    pub fn uniform_constant(&mut self, item: Item) -> BuildResult<Value> {
        self.variable(StorageClass::UniformConstant, item)
    }

    /// Input variable bound to a built-in. Requesting the same built-in twice returns the same
    /// variable.
    pub fn builtin_input(&mut self, builtin: BuiltIn, item: Item) -> BuildResult<Value> {
        if let Some(existing) = self.state.used_builtins.get(&builtin).copied() {
            let expected = self.type_id(&Item::pointer(StorageClass::Input, item))?;
            if existing.ty != expected {
                return Err(BuildError::TypeMismatch {
                    op: Op::Variable,
                    expected: self.item(existing.ty)?.to_string(),
                    found: self.item(expected)?.to_string(),
                });
            }
            return Ok(existing);
        }
        let variable = self.variable(StorageClass::Input, item)?;
        self.decorate(
            variable.id,
            Decoration::BuiltIn,
            vec![Operand::BuiltIn(builtin)],
        )?;
        self.state.used_builtins.insert(builtin, variable);
        Ok(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Elem;

    #[test]
    fn decorations_need_a_target() {
        let mut b = ModuleBuilder::default();
        assert_eq!(
            b.decorate(99, Decoration::Block, vec![]),
            Err(BuildError::MissingTarget(99))
        );
    }

    #[test]
    fn identical_decorations_are_emitted_once() {
        let mut b = ModuleBuilder::default();
        let element = Item::Vector(Elem::Float(32), 4);
        b.storage_buffer(element.clone(), Access::ReadWrite).unwrap();
        let count = b.annotations.len();
        b.storage_buffer(element, Access::ReadWrite).unwrap();
        assert_eq!(b.annotations.len(), count);
    }

    #[test]
    fn bindings_are_unique_per_set() {
        let mut b = ModuleBuilder::default();
        let sampler = b.uniform_constant(Item::Sampler).unwrap();
        let other = b.uniform_constant(Item::Sampler).unwrap();
        b.descriptor_binding(sampler, 0, 0).unwrap();
        assert_eq!(
            b.descriptor_binding(other, 0, 0),
            Err(BuildError::DuplicateBinding {
                set: 0,
                binding: 0,
                existing: sampler.id
            })
        );
        b.descriptor_binding(other, 1, 0).unwrap();
    }

    #[test]
    fn builtins_are_shared() {
        let mut b = ModuleBuilder::default();
        let uvec3 = Item::Vector(Elem::Int(32, false), 3);
        let a = b
            .builtin_input(BuiltIn::GlobalInvocationId, uvec3.clone())
            .unwrap();
        let c = b.builtin_input(BuiltIn::GlobalInvocationId, uvec3).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn member_index_is_checked() {
        let mut b = ModuleBuilder::default();
        let id = b.type_id(&Item::Struct(vec![Item::u32()])).unwrap();
        assert_eq!(
            b.member_decorate(id, 1, Decoration::Offset, vec![Operand::LiteralBit32(4)]),
            Err(BuildError::ComponentOutOfRange { index: 1, width: 1 })
        );
    }
}
