use rspirv::{
    dr::Operand,
    spirv::{Op, Word},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::{Elem, Item},
    lookups::ConstKey,
    variable::{ConstVal, Value},
};

impl ModuleBuilder {
    fn get_or_insert_const(
        &mut self,
        key: ConstKey,
        insert: impl FnOnce(&mut Self) -> BuildResult<Value>,
    ) -> BuildResult<Value> {
        if let Some(id) = self.state.constants.get(&key).copied() {
            let ty = self.type_of(id).ok_or(BuildError::UndefinedId(id))?;
            log::trace!("reusing constant %{id}");
            return Ok(Value::new(id, ty));
        }
        let value = insert(self)?;
        self.state.constants.insert(key, value.id);
        Ok(value)
    }

    pub fn constant_bool(&mut self, value: bool) -> BuildResult<Value> {
        self.get_or_insert_const(ConstKey::Bool(value), |b| {
            let ty = b.type_id(&Item::bool())?;
            let op = match value {
                true => Op::ConstantTrue,
                false => Op::ConstantFalse,
            };
            b.define_global(op, ty, vec![])
        })
    }

    /// Intern a numeric scalar constant. The literal width must match the type width.
    pub fn constant_scalar(&mut self, item: &Item, value: ConstVal) -> BuildResult<Value> {
        let width = match item {
            Item::Scalar(Elem::Int(width, _)) | Item::Scalar(Elem::Float(width)) => *width,
            other => {
                return Err(BuildError::TypeMismatch {
                    op: Op::Constant,
                    expected: "numeric scalar".into(),
                    found: other.to_string(),
                })
            }
        };
        let literal_width = match value {
            ConstVal::Bit32(_) => 32,
            ConstVal::Bit64(_) => 64,
        };
        if (width > 32) != (literal_width > 32) {
            return Err(BuildError::TypeMismatch {
                op: Op::Constant,
                expected: item.to_string(),
                found: format!("{literal_width} bit literal"),
            });
        }

        let ty = self.type_id(item)?;
        self.get_or_insert_const(ConstKey::Scalar(ty, value), |b| {
            let constant = b.define_global(Op::Constant, ty, vec![value.operand()])?;
            b.state.constant_values.insert(constant.id, value);
            Ok(constant)
        })
    }

    /// Intern a composite constant built from other constants.
    pub fn constant_composite(&mut self, item: &Item, constituents: &[Value]) -> BuildResult<Value> {
        let Item::Vector(elem, width) = item else {
            return Err(BuildError::TypeMismatch {
                op: Op::ConstantComposite,
                expected: "vector".into(),
                found: item.to_string(),
            });
        };
        if constituents.len() as u32 != *width {
            return Err(BuildError::TypeMismatch {
                op: Op::ConstantComposite,
                expected: format!("{width} constituents"),
                found: constituents.len().to_string(),
            });
        }
        let scalar = Item::Scalar(*elem);
        for constituent in constituents {
            if !self.state.constants.values().any(|id| *id == constituent.id) {
                return Err(BuildError::UndefinedId(constituent.id));
            }
            let found = self.check(Op::ConstantComposite, constituent)?;
            if found != scalar {
                return Err(BuildError::TypeMismatch {
                    op: Op::ConstantComposite,
                    expected: scalar.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let ty = self.type_id(item)?;
        let ids: Vec<Word> = constituents.iter().map(|it| it.id).collect();
        self.get_or_insert_const(ConstKey::Composite(ty, ids.clone()), |b| {
            let operands = ids.into_iter().map(Operand::IdRef).collect();
            b.define_global(Op::ConstantComposite, ty, operands)
        })
    }

    pub fn const_u32(&mut self, value: u32) -> BuildResult<Value> {
        self.constant_scalar(&Item::u32(), ConstVal::Bit32(value))
    }

    /// A float constant of the given element width.
    pub fn const_float(&mut self, elem: Elem, value: f64) -> BuildResult<Value> {
        let Elem::Float(width) = elem else {
            return Err(BuildError::TypeMismatch {
                op: Op::Constant,
                expected: "float".into(),
                found: elem.to_string(),
            });
        };
        self.constant_scalar(&Item::Scalar(elem), ConstVal::from_float(value, width))
    }

    /// A float vector constant, one value per component.
    pub fn const_vector(&mut self, elem: Elem, values: &[f64]) -> BuildResult<Value> {
        let item = Item::vector(elem, values.len() as u32)?;
        let constituents = values
            .iter()
            .map(|value| self.const_float(elem, *value))
            .collect::<BuildResult<Vec<_>>>()?;
        self.constant_composite(&item, &constituents)
    }

    /// Literal bits of an interned scalar constant.
    pub fn constant_value(&self, id: Word) -> Option<ConstVal> {
        self.state.constant_values.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_constants_are_interned() {
        let mut b = ModuleBuilder::default();
        let a = b.const_float(Elem::Float(32), 0.25).unwrap();
        let c = b.const_float(Elem::Float(32), 0.25).unwrap();
        let d = b.const_float(Elem::Float(32), 0.5).unwrap();
        assert_eq!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn same_literal_different_type_is_distinct() {
        let mut b = ModuleBuilder::default();
        let single = b.const_float(Elem::Float(32), 1.0).unwrap();
        let double = b.const_float(Elem::Float(64), 1.0).unwrap();
        assert_ne!(single.id, double.id);
        assert_ne!(single.ty, double.ty);
    }

    #[test]
    fn composite_requires_constants() {
        let mut b = ModuleBuilder::default();
        let item = Item::Vector(Elem::Float(32), 2);
        let x = b.const_float(Elem::Float(32), 1.0).unwrap();
        let bogus = Value::new(4242, x.ty);
        assert_eq!(
            b.constant_composite(&item, &[x, bogus]),
            Err(BuildError::UndefinedId(4242))
        );
    }

    #[test]
    fn literal_width_must_match() {
        let mut b = ModuleBuilder::default();
        let result = b.constant_scalar(&Item::float(64), ConstVal::Bit32(0));
        assert!(matches!(result, Err(BuildError::TypeMismatch { .. })));
    }
}
