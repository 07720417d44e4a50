use rspirv::{dr::Operand, spirv::Op};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::{check_vector_width, Item},
    variable::Value,
};

impl ModuleBuilder {
    /// Build a vector from scalars and smaller vectors of the same element type.
    pub fn composite_construct(&mut self, item: &Item, parts: &[Value]) -> BuildResult<Value> {
        let op = Op::CompositeConstruct;
        let Item::Vector(elem, width) = item else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "vector".into(),
                found: item.to_string(),
            });
        };
        check_vector_width(*width)?;

        let mut components = 0;
        for part in parts {
            let part_item = self.check(op, part)?;
            match part_item.width() {
                Some(count) if part_item.elem() == *elem => components += count,
                _ => {
                    return Err(BuildError::TypeMismatch {
                        op,
                        expected: format!("{elem} scalar or vector"),
                        found: part_item.to_string(),
                    })
                }
            }
        }
        if components != *width {
            return Err(BuildError::TypeMismatch {
                op,
                expected: format!("{width} components"),
                found: components.to_string(),
            });
        }

        let ty = self.type_id(item)?;
        let operands = parts.iter().map(|part| Operand::IdRef(part.id)).collect();
        self.emit_value(op, ty, operands)
    }

    /// Copy a scalar into every component of a new vector.
    pub fn splat(&mut self, scalar: Value, width: u32) -> BuildResult<Value> {
        let item = self.check(Op::CompositeConstruct, &scalar)?;
        let Item::Scalar(elem) = item else {
            return Err(BuildError::TypeMismatch {
                op: Op::CompositeConstruct,
                expected: "scalar".into(),
                found: item.to_string(),
            });
        };
        let vector = Item::vector(elem, width)?;
        self.composite_construct(&vector, &vec![scalar; width as usize])
    }

    /// Read a single component out of a vector.
    pub fn composite_extract(&mut self, vector: Value, index: u32) -> BuildResult<Value> {
        let op = Op::CompositeExtract;
        let item = self.check(op, &vector)?;
        let Item::Vector(elem, width) = item else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "vector".into(),
                found: item.to_string(),
            });
        };
        if index >= width {
            return Err(BuildError::ComponentOutOfRange { index, width });
        }
        let ty = self.type_id(&Item::Scalar(elem))?;
        self.emit_value(
            op,
            ty,
            vec![Operand::IdRef(vector.id), Operand::LiteralBit32(index)],
        )
    }

    /// Pick components from the concatenation of two vectors.
    pub fn vector_shuffle(&mut self, lhs: Value, rhs: Value, indices: &[u32]) -> BuildResult<Value> {
        let op = Op::VectorShuffle;
        let lhs_item = self.check(op, &lhs)?;
        let rhs_item = self.check(op, &rhs)?;
        let (Item::Vector(elem, lhs_width), Item::Vector(rhs_elem, rhs_width)) =
            (&lhs_item, &rhs_item)
        else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "two vectors".into(),
                found: format!("{lhs_item} and {rhs_item}"),
            });
        };
        if elem != rhs_elem {
            return Err(BuildError::TypeMismatch {
                op,
                expected: lhs_item.to_string(),
                found: rhs_item.to_string(),
            });
        }

        let width = lhs_width + rhs_width;
        if let Some(index) = indices.iter().find(|index| **index >= width) {
            return Err(BuildError::ComponentOutOfRange {
                index: *index,
                width,
            });
        }
        let ty = self.type_id(&Item::vector(*elem, indices.len() as u32)?)?;

        let mut operands = vec![Operand::IdRef(lhs.id), Operand::IdRef(rhs.id)];
        operands.extend(indices.iter().map(|index| Operand::LiteralBit32(*index)));
        self.emit_value(op, ty, operands)
    }

    /// Rearrange the components of one vector, ex: `v.zyx` is `swizzle(v, &[2, 1, 0])`.
    ///
    /// A single index extracts a scalar.
    pub fn swizzle(&mut self, vector: Value, indices: &[u32]) -> BuildResult<Value> {
        let item = self.check(Op::VectorShuffle, &vector)?;
        let Item::Vector(_, width) = item else {
            return Err(BuildError::TypeMismatch {
                op: Op::VectorShuffle,
                expected: "vector".into(),
                found: item.to_string(),
            });
        };
        if let Some(index) = indices.iter().find(|index| **index >= width) {
            return Err(BuildError::ComponentOutOfRange {
                index: *index,
                width,
            });
        }
        match indices {
            [index] => self.composite_extract(vector, *index),
            _ => self.vector_shuffle(vector, vector, indices),
        }
    }
}
