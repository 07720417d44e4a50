use rspirv::{
    dr::Operand,
    spirv::{Op, Word},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::{Elem, Item},
    variable::Value,
};

/// Name of the GLSL extended instruction set.
pub const GLSL_STD_450: &str = "GLSL.std.450";

/// `Floor` in GLSL.std.450.
const GLSL_FLOOR: u32 = 8;

impl ModuleBuilder {
    pub(crate) fn float_operand(&self, op: Op, value: &Value) -> BuildResult<Item> {
        let item = self.check(op, value)?;
        if !item.is_float() {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "float scalar or vector".into(),
                found: item.to_string(),
            });
        }
        Ok(item)
    }

    fn float_binary(&mut self, op: Op, lhs: Value, rhs: Value) -> BuildResult<Value> {
        let lhs_item = self.float_operand(op, &lhs)?;
        let rhs_item = self.float_operand(op, &rhs)?;
        if lhs.ty != rhs.ty {
            return Err(BuildError::TypeMismatch {
                op,
                expected: lhs_item.to_string(),
                found: rhs_item.to_string(),
            });
        }
        self.emit_value(
            op,
            lhs.ty,
            vec![Operand::IdRef(lhs.id), Operand::IdRef(rhs.id)],
        )
    }

    pub fn f_add(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        self.float_binary(Op::FAdd, lhs, rhs)
    }

    pub fn f_sub(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        self.float_binary(Op::FSub, lhs, rhs)
    }

    pub fn f_mul(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        self.float_binary(Op::FMul, lhs, rhs)
    }

    /// Floored modulo, the result takes the sign of `rhs`.
    pub fn f_mod(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        self.float_binary(Op::FMod, lhs, rhs)
    }

    /// Scale every component of a float vector.
    pub fn vector_times_scalar(&mut self, vector: Value, scalar: Value) -> BuildResult<Value> {
        let op = Op::VectorTimesScalar;
        let vector_item = self.float_operand(op, &vector)?;
        let scalar_item = self.float_operand(op, &scalar)?;
        if !matches!(vector_item, Item::Vector(..))
            || scalar_item != Item::Scalar(vector_item.elem())
        {
            return Err(BuildError::TypeMismatch {
                op,
                expected: format!("{vector_item} and {}", vector_item.elem()),
                found: format!("{vector_item} and {scalar_item}"),
            });
        }
        self.emit_value(
            op,
            vector.ty,
            vec![Operand::IdRef(vector.id), Operand::IdRef(scalar.id)],
        )
    }

    /// Call an instruction of an extended instruction set, importing the set on first use.
    pub fn ext_inst(
        &mut self,
        set: &str,
        instruction: u32,
        ty: Word,
        args: &[Value],
    ) -> BuildResult<Value> {
        self.item(ty)?;
        for arg in args {
            self.check(Op::ExtInst, arg)?;
        }
        let set = self.ext_inst_import(set);
        let mut operands = vec![
            Operand::IdRef(set),
            Operand::LiteralExtInstInteger(instruction),
        ];
        operands.extend(args.iter().map(|arg| Operand::IdRef(arg.id)));
        self.emit_value(Op::ExtInst, ty, operands)
    }

    /// Component wise floor.
    pub fn floor(&mut self, value: Value) -> BuildResult<Value> {
        self.float_operand(Op::ExtInst, &value)?;
        self.ext_inst(GLSL_STD_450, GLSL_FLOOR, value.ty, &[value])
    }

    /// Dot product of two float vectors of the same type.
    pub fn dot(&mut self, lhs: Value, rhs: Value) -> BuildResult<Value> {
        let op = Op::Dot;
        let item = self.float_operand(op, &lhs)?;
        let rhs_item = self.float_operand(op, &rhs)?;
        let Item::Vector(elem, _) = item else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "float vector".into(),
                found: item.to_string(),
            });
        };
        if lhs.ty != rhs.ty {
            return Err(BuildError::TypeMismatch {
                op,
                expected: item.to_string(),
                found: rhs_item.to_string(),
            });
        }
        let ty = self.type_id(&Item::Scalar(elem))?;
        self.emit_value(
            op,
            ty,
            vec![Operand::IdRef(lhs.id), Operand::IdRef(rhs.id)],
        )
    }

    /// Convert an unsigned integer into a float of the given width.
    pub fn convert_u_to_f(&mut self, value: Value, elem: Elem) -> BuildResult<Value> {
        let op = Op::ConvertUToF;
        let item = self.check(op, &value)?;
        if !matches!(item.elem(), Elem::Int(_, false)) || !matches!(elem, Elem::Float(_)) {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "unsigned integer".into(),
                found: item.to_string(),
            });
        }
        let ty = self.type_id(&item.same_vectorization(elem))?;
        self.emit_value(op, ty, vec![Operand::IdRef(value.id)])
    }
}
