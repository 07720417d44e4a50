use rspirv::spirv::{Dim, ImageFormat, StorageClass};

use crate::error::BuildError;

/// Structural description of a SPIR-V type.
///
/// Two equal items always intern to the same type id, see [`ModuleBuilder::type_id`].
///
/// [`ModuleBuilder::type_id`]: crate::ModuleBuilder::type_id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Scalar(Elem),
    // Vector of scalars. Must be 2, 3, or 4
    Vector(Elem, u32),
    RuntimeArray(Box<Item>),
    Struct(Vec<Item>),
    Pointer(StorageClass, Box<Item>),
    Image(Image),
    Sampler,
    SampledImage(Box<Item>),
    Function(Box<Item>, Vec<Item>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elem {
    Void,
    Bool,
    Int(u32, bool),
    Float(u32),
}

/// Operands of `OpTypeImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Image {
    pub sampled_type: Elem,
    pub dim: Dim,
    pub depth: u32,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 1 when used with a sampler, 2 for storage images.
    pub sampled: u32,
    pub format: ImageFormat,
}

impl Image {
    /// A 2D image read through a sampler, with an unknown texel format.
    pub fn sampled_2d(sampled_type: Elem) -> Self {
        Self {
            sampled_type,
            dim: Dim::Dim2D,
            depth: 0,
            arrayed: false,
            multisampled: false,
            sampled: 1,
            format: ImageFormat::Unknown,
        }
    }

    /// Number of coordinate components needed to address the image.
    pub fn coordinate_width(&self) -> u32 {
        let base = match self.dim {
            Dim::Dim1D | Dim::DimBuffer => 1,
            Dim::Dim3D | Dim::DimCube => 3,
            _ => 2,
        };
        base + self.arrayed as u32
    }
}

impl Item {
    pub fn void() -> Self {
        Item::Scalar(Elem::Void)
    }

    pub fn bool() -> Self {
        Item::Scalar(Elem::Bool)
    }

    pub fn u32() -> Self {
        Item::Scalar(Elem::Int(32, false))
    }

    pub fn float(width: u32) -> Self {
        Item::Scalar(Elem::Float(width))
    }

    /// Create a vector item, rejecting widths SPIR-V shaders can't express.
    pub fn vector(elem: Elem, width: u32) -> Result<Self, BuildError> {
        check_vector_width(width)?;
        Ok(Item::Vector(elem, width))
    }

    pub fn pointer(storage_class: StorageClass, item: Item) -> Self {
        Item::Pointer(storage_class, Box::new(item))
    }

    pub fn function(ret: Item, params: Vec<Item>) -> Self {
        Item::Function(Box::new(ret), params)
    }

    /// Packed size in bytes, used for array strides.
    pub fn size(&self) -> u32 {
        match self {
            Item::Scalar(elem) => elem.size(),
            Item::Vector(elem, factor) => elem.size() * *factor,
            Item::RuntimeArray(item) => item.size(),
            Item::Struct(vec) => vec.iter().map(|it| it.size()).sum(),
            Item::Pointer(_, item) => item.size(),
            Item::Image(_) | Item::Sampler | Item::SampledImage(_) | Item::Function(..) => 0,
        }
    }

    pub fn elem(&self) -> Elem {
        match self {
            Item::Scalar(elem) => *elem,
            Item::Vector(elem, _) => *elem,
            Item::RuntimeArray(item) => item.elem(),
            Item::Pointer(_, item) => item.elem(),
            Item::Image(image) => image.sampled_type,
            Item::SampledImage(item) => item.elem(),
            Item::Struct(_) | Item::Sampler | Item::Function(..) => Elem::Void,
        }
    }

    /// Number of components for scalars and vectors.
    pub fn width(&self) -> Option<u32> {
        match self {
            Item::Scalar(Elem::Void) => None,
            Item::Scalar(_) => Some(1),
            Item::Vector(_, width) => Some(*width),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Item::Scalar(Elem::Float(_)) | Item::Vector(Elem::Float(_), _))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Item::Scalar(Elem::Bool) | Item::Vector(Elem::Bool, _))
    }

    /// Same component count with a different element, ex: vec4<f32> -> vec4<bool>
    pub fn same_vectorization(&self, elem: Elem) -> Item {
        match self {
            Item::Vector(_, factor) => Item::Vector(elem, *factor),
            _ => Item::Scalar(elem),
        }
    }
}

impl Elem {
    pub fn size(&self) -> u32 {
        match self {
            Elem::Void => 0,
            Elem::Bool => 1,
            Elem::Int(size, _) => *size / 8,
            Elem::Float(size) => *size / 8,
        }
    }
}

pub(crate) fn check_vector_width(width: u32) -> Result<(), BuildError> {
    match width {
        2..=4 => Ok(()),
        _ => Err(BuildError::InvalidVectorWidth(width)),
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Scalar(elem) => write!(f, "{elem}"),
            Item::Vector(elem, factor) => write!(f, "vec{factor}<{elem}>"),
            Item::RuntimeArray(item) => write!(f, "array<{item}>"),
            Item::Struct(members) => {
                write!(f, "struct<")?;
                for (i, item) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(">")
            }
            Item::Pointer(class, item) => write!(f, "ptr<{class:?}, {item}>"),
            Item::Image(image) => write!(f, "image{:?}<{}>", image.dim, image.sampled_type),
            Item::Sampler => f.write_str("sampler"),
            Item::SampledImage(item) => write!(f, "sampled<{item}>"),
            Item::Function(ret, params) => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

impl std::fmt::Display for Elem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Elem::Void => write!(f, "void"),
            Elem::Bool => write!(f, "bool"),
            Elem::Int(width, false) => write!(f, "u{width}"),
            Elem::Int(width, true) => write!(f, "i{width}"),
            Elem::Float(width) => write!(f, "f{width}"),
        }
    }
}
