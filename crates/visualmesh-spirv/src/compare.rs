use rspirv::{dr::Operand, spirv::Op};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::Elem,
    variable::Value,
};

impl ModuleBuilder {
    /// Ordered float equality, producing a bool of the same vectorization.
    pub fn f_ord_equal(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        let op = Op::FOrdEqual;
        let item = self.float_operand(op, &lhs)?;
        let rhs_item = self.float_operand(op, &rhs)?;
        if lhs.ty != rhs.ty {
            return Err(BuildError::TypeMismatch {
                op,
                expected: item.to_string(),
                found: rhs_item.to_string(),
            });
        }
        let ty = self.type_id(&item.same_vectorization(Elem::Bool))?;
        self.emit_value(
            op,
            ty,
            vec![Operand::IdRef(lhs.id), Operand::IdRef(rhs.id)],
        )
    }

    /// Component wise `condition ? accept : reject`.
    ///
    /// SPIR-V 1.0 requires the condition to have exactly as many components as the operands.
    pub fn select(&mut self, condition: Value, accept: Value, reject: Value) -> BuildResult<Value> {
        let op = Op::Select;
        let cond_item = self.check(op, &condition)?;
        let item = self.check(op, &accept)?;
        let reject_item = self.check(op, &reject)?;

        if accept.ty != reject.ty {
            return Err(BuildError::TypeMismatch {
                op,
                expected: item.to_string(),
                found: reject_item.to_string(),
            });
        }
        let expected = item.same_vectorization(Elem::Bool);
        if item.width().is_none() || cond_item != expected {
            return Err(BuildError::TypeMismatch {
                op,
                expected: expected.to_string(),
                found: cond_item.to_string(),
            });
        }
        self.emit_value(
            op,
            accept.ty,
            vec![
                Operand::IdRef(condition.id),
                Operand::IdRef(accept.id),
                Operand::IdRef(reject.id),
            ],
        )
    }
}
