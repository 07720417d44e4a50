use rspirv::{
    dr::Operand,
    spirv::{Op, StorageClass},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::{Elem, Item},
    variable::Value,
};

impl ModuleBuilder {
    /// Declare a module scope variable. The returned value is a pointer to `item`.
    pub fn variable(&mut self, storage_class: StorageClass, item: Item) -> BuildResult<Value> {
        if storage_class == StorageClass::Function {
            return Err(BuildError::TypeMismatch {
                op: Op::Variable,
                expected: "module scope storage class".into(),
                found: format!("{storage_class:?}"),
            });
        }
        let ty = self.type_id(&Item::pointer(storage_class, item))?;
        self.define_global(
            Op::Variable,
            ty,
            vec![Operand::StorageClass(storage_class)],
        )
    }

    fn pointer_operand(&self, op: Op, pointer: &Value) -> BuildResult<(StorageClass, Item)> {
        match self.check(op, pointer)? {
            Item::Pointer(class, inner) => Ok((class, *inner)),
            other => Err(BuildError::TypeMismatch {
                op,
                expected: "pointer".into(),
                found: other.to_string(),
            }),
        }
    }

    /// Pointer to an element inside a composite. Struct members must be selected with constants.
    pub fn access_chain(&mut self, base: Value, indices: &[Value]) -> BuildResult<Value> {
        let op = Op::AccessChain;
        let (storage_class, mut item) = self.pointer_operand(op, &base)?;

        for index in indices {
            let index_item = self.check(op, index)?;
            if !matches!(index_item, Item::Scalar(Elem::Int(..))) {
                return Err(BuildError::TypeMismatch {
                    op,
                    expected: "integer index".into(),
                    found: index_item.to_string(),
                });
            }
            item = match item {
                Item::Struct(mut members) => {
                    let member = self
                        .constant_value(index.id)
                        .ok_or_else(|| BuildError::TypeMismatch {
                            op,
                            expected: "constant struct member index".into(),
                            found: format!("%{}", index.id),
                        })?
                        .as_u64();
                    let width = members.len() as u32;
                    let member = u32::try_from(member).map_err(|_| {
                        BuildError::ComponentOutOfRange {
                            index: u32::MAX,
                            width,
                        }
                    })?;
                    if member >= width {
                        return Err(BuildError::ComponentOutOfRange {
                            index: member,
                            width,
                        });
                    }
                    members.swap_remove(member as usize)
                }
                Item::RuntimeArray(inner) => *inner,
                Item::Vector(elem, _) => Item::Scalar(elem),
                other => {
                    return Err(BuildError::TypeMismatch {
                        op,
                        expected: "composite".into(),
                        found: other.to_string(),
                    })
                }
            };
        }

        let ty = self.type_id(&Item::pointer(storage_class, item))?;
        let mut operands = vec![Operand::IdRef(base.id)];
        operands.extend(indices.iter().map(|index| Operand::IdRef(index.id)));
        self.emit_value(op, ty, operands)
    }

    pub fn load(&mut self, pointer: Value) -> BuildResult<Value> {
        let (_, item) = self.pointer_operand(Op::Load, &pointer)?;
        let ty = self.type_id(&item)?;
        self.emit_value(Op::Load, ty, vec![Operand::IdRef(pointer.id)])
    }

    pub fn store(&mut self, pointer: Value, value: Value) -> BuildResult<()> {
        let op = Op::Store;
        let (_, item) = self.pointer_operand(op, &pointer)?;
        let found = self.check(op, &value)?;
        if found != item {
            return Err(BuildError::TypeMismatch {
                op,
                expected: item.to_string(),
                found: found.to_string(),
            });
        }
        self.emit_void(
            op,
            vec![Operand::IdRef(pointer.id), Operand::IdRef(value.id)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::ConstVal;
    use rspirv::spirv::FunctionControl;

    fn buffer() -> Item {
        Item::Struct(vec![Item::RuntimeArray(Box::new(Item::Vector(
            Elem::Float(32),
            4,
        )))])
    }

    #[test]
    fn access_chain_walks_struct_then_array() {
        let mut b = ModuleBuilder::default();
        let var = b.variable(StorageClass::StorageBuffer, buffer()).unwrap();
        let zero = b.const_u32(0).unwrap();
        let seven = b.const_u32(7).unwrap();
        b.begin_function("f", &Item::void(), &[], FunctionControl::NONE)
            .unwrap();

        let ptr = b.access_chain(var, &[zero, seven]).unwrap();
        assert_eq!(
            b.item(ptr.ty).unwrap(),
            &Item::pointer(StorageClass::StorageBuffer, Item::Vector(Elem::Float(32), 4))
        );

        let value = b.load(ptr).unwrap();
        b.store(ptr, value).unwrap();
        let wrong = b.const_float(Elem::Float(32), 1.0).unwrap();
        assert!(b.store(ptr, wrong).is_err());
    }

    #[test]
    fn struct_member_must_be_in_range() {
        let mut b = ModuleBuilder::default();
        let var = b.variable(StorageClass::StorageBuffer, buffer()).unwrap();
        let one = b.const_u32(1).unwrap();
        b.begin_function("f", &Item::void(), &[], FunctionControl::NONE)
            .unwrap();
        assert_eq!(
            b.access_chain(var, &[one]),
            Err(BuildError::ComponentOutOfRange { index: 1, width: 1 })
        );
    }

    #[test]
    fn wide_struct_member_index_is_not_truncated() {
        let mut b = ModuleBuilder::default();
        let var = b.variable(StorageClass::StorageBuffer, buffer()).unwrap();
        let wide = b
            .constant_scalar(
                &Item::Scalar(Elem::Int(64, false)),
                ConstVal::Bit64(1 << 32),
            )
            .unwrap();
        b.begin_function("f", &Item::void(), &[], FunctionControl::NONE)
            .unwrap();
        assert_eq!(
            b.access_chain(var, &[wide]),
            Err(BuildError::ComponentOutOfRange {
                index: u32::MAX,
                width: 1
            })
        );
    }

    #[test]
    fn function_storage_is_not_module_scope() {
        let mut b = ModuleBuilder::default();
        assert!(b.variable(StorageClass::Function, Item::u32()).is_err());
    }
}
