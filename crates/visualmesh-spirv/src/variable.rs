use derive_new::new;
use rspirv::{dr::Operand, spirv::Word};

/// The result of an instruction, a constant or a variable, tagged with its interned type.
///
/// Values are plain handles: they can be copied freely and are only meaningful for the builder
/// that created them.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    pub id: Word,
    pub ty: Word,
}

/// Raw bits of a scalar constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstVal {
    Bit32(u32),
    Bit64(u64),
}

impl ConstVal {
    pub fn as_u64(&self) -> u64 {
        match self {
            ConstVal::Bit32(val) => *val as u64,
            ConstVal::Bit64(val) => *val,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            ConstVal::Bit64(val) => f64::from_bits(*val),
            ConstVal::Bit32(val) => f32::from_bits(*val) as f64,
        }
    }

    pub fn from_float(value: f64, width: u32) -> Self {
        match width {
            64 => ConstVal::Bit64(value.to_bits()),
            _ => ConstVal::Bit32((value as f32).to_bits()),
        }
    }

    pub fn from_uint(value: u64, width: u32) -> Self {
        match width {
            64 => ConstVal::Bit64(value),
            _ => ConstVal::Bit32(value as u32),
        }
    }

    pub fn operand(&self) -> Operand {
        match self {
            ConstVal::Bit32(val) => Operand::LiteralBit32(*val),
            ConstVal::Bit64(val) => Operand::LiteralBit64(*val),
        }
    }
}

impl From<u32> for ConstVal {
    fn from(value: u32) -> Self {
        ConstVal::Bit32(value)
    }
}

impl From<f32> for ConstVal {
    fn from(value: f32) -> Self {
        ConstVal::Bit32(value.to_bits())
    }
}

impl From<f64> for ConstVal {
    fn from(value: f64) -> Self {
        ConstVal::Bit64(value.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_bits_follow_width() {
        assert_eq!(ConstVal::from_float(0.5, 32), ConstVal::Bit32(0.5f32.to_bits()));
        assert_eq!(ConstVal::from_float(0.5, 64), ConstVal::Bit64(0.5f64.to_bits()));
        assert_eq!(ConstVal::from_float(-0.1875, 32).as_float(), -0.1875);
    }
}
