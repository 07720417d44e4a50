//! Resource interface shared by every image loading kernel.
//!
//! All resources live in descriptor set 0 at fixed bindings, so the pipeline layout can be
//! created once and reused for every sensor format.

use serde::{Deserialize, Serialize};
use visualmesh_spirv::{
    spirv::BuiltIn,
    Access, BuildResult, Elem, Image, Item, ModuleBuilder, Value,
};

use crate::options::Precision;

pub const DESCRIPTOR_SET: u32 = 0;
pub const SAMPLER_BINDING: u32 = 0;
pub const IMAGE_BINDING: u32 = 1;
pub const COORDINATES_BINDING: u32 = 2;
pub const NETWORK_BINDING: u32 = 3;

/// What is bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Sampler,
    /// The raw sensor frame.
    Image,
    /// Read only buffer of 2 component sampling coordinates, one per invocation.
    Coordinates,
    /// Writable buffer of 4 component colours, one per invocation.
    Network,
}

/// A descriptor slot used by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub set: u32,
    pub binding: u32,
    pub resource: Resource,
    /// Byte stride of buffer elements.
    pub array_stride: Option<u32>,
}

impl Binding {
    /// The fixed layout for `precision`.
    pub fn layout(precision: Precision) -> Vec<Binding> {
        let scalar = precision.width() / 8;
        let binding = |binding, resource, array_stride| Binding {
            set: DESCRIPTOR_SET,
            binding,
            resource,
            array_stride,
        };
        vec![
            binding(SAMPLER_BINDING, Resource::Sampler, None),
            binding(IMAGE_BINDING, Resource::Image, None),
            binding(COORDINATES_BINDING, Resource::Coordinates, Some(2 * scalar)),
            binding(NETWORK_BINDING, Resource::Network, Some(4 * scalar)),
        ]
    }
}

/// Module scope variables of the shared interface.
#[derive(Debug, Clone, Copy)]
pub struct Interface {
    pub sampler: Value,
    pub image: Value,
    pub coordinates: Value,
    pub network: Value,
    /// `GlobalInvocationId`, component 0 indexes both buffers.
    pub global_id: Value,
}

impl Interface {
    pub fn declare(b: &mut ModuleBuilder, precision: Precision) -> BuildResult<Self> {
        let float = precision.elem();

        let sampler = b.uniform_constant(Item::Sampler)?;
        b.descriptor_binding(sampler, DESCRIPTOR_SET, SAMPLER_BINDING)?;
        b.name(sampler.id, "sampler")?;

        let image = b.uniform_constant(Item::Image(Image::sampled_2d(float)))?;
        b.descriptor_binding(image, DESCRIPTOR_SET, IMAGE_BINDING)?;
        b.name(image.id, "image")?;

        let coordinates = b.storage_buffer(Item::vector(float, 2)?, Access::ReadOnly)?;
        b.descriptor_binding(coordinates, DESCRIPTOR_SET, COORDINATES_BINDING)?;
        b.name(coordinates.id, "coordinates")?;

        let network = b.storage_buffer(Item::vector(float, 4)?, Access::ReadWrite)?;
        b.descriptor_binding(network, DESCRIPTOR_SET, NETWORK_BINDING)?;
        b.name(network.id, "network")?;

        let uvec3 = Item::vector(Elem::Int(32, false), 3)?;
        let global_id = b.builtin_input(BuiltIn::GlobalInvocationId, uvec3)?;
        b.name(global_id.id, "global_id")?;

        log::trace!("Declared image loading interface ({precision})");
        Ok(Self {
            sampler,
            image,
            coordinates,
            network,
            global_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_scale_with_precision() {
        let strides = |precision| {
            Binding::layout(precision)
                .into_iter()
                .filter_map(|it| it.array_stride)
                .collect::<Vec<_>>()
        };
        assert_eq!(strides(Precision::F32), vec![8, 16]);
        assert_eq!(strides(Precision::F64), vec![16, 32]);
    }
}
