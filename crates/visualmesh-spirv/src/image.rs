use rspirv::{
    dr::Operand,
    spirv::{ImageOperands, Op},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::{Elem, Item},
    variable::Value,
};

impl ModuleBuilder {
    /// Combine an image and a sampler into a sampled image.
    pub fn sampled_image(&mut self, image: Value, sampler: Value) -> BuildResult<Value> {
        let op = Op::SampledImage;
        let image_item = self.check(op, &image)?;
        let sampler_item = self.check(op, &sampler)?;
        match (&image_item, &sampler_item) {
            (Item::Image(desc), Item::Sampler) if desc.sampled != 2 => {}
            _ => {
                return Err(BuildError::TypeMismatch {
                    op,
                    expected: "sampled image and sampler".into(),
                    found: format!("{image_item} and {sampler_item}"),
                })
            }
        }
        let ty = self.type_id(&Item::SampledImage(Box::new(image_item)))?;
        self.emit_value(
            op,
            ty,
            vec![Operand::IdRef(image.id), Operand::IdRef(sampler.id)],
        )
    }

    /// Sample at an explicit level of detail, producing a 4 component texel.
    pub fn image_sample_explicit_lod(
        &mut self,
        sampled_image: Value,
        coordinate: Value,
        lod: Value,
    ) -> BuildResult<Value> {
        let op = Op::ImageSampleExplicitLod;
        let Item::SampledImage(inner) = self.check(op, &sampled_image)? else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "sampled image".into(),
                found: self.item(sampled_image.ty)?.to_string(),
            });
        };
        let Item::Image(image) = *inner else {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "image".into(),
                found: inner.to_string(),
            });
        };

        let coordinate_item = self.float_operand(op, &coordinate)?;
        let expected = image.coordinate_width();
        if coordinate_item.width() != Some(expected) {
            return Err(BuildError::TypeMismatch {
                op,
                expected: format!("{expected} coordinate components"),
                found: coordinate_item.to_string(),
            });
        }
        let lod_item = self.float_operand(op, &lod)?;
        if !matches!(lod_item, Item::Scalar(Elem::Float(_))) {
            return Err(BuildError::TypeMismatch {
                op,
                expected: "float scalar".into(),
                found: lod_item.to_string(),
            });
        }

        let ty = self.type_id(&Item::vector(image.sampled_type, 4)?)?;
        self.emit_value(
            op,
            ty,
            vec![
                Operand::IdRef(sampled_image.id),
                Operand::IdRef(coordinate.id),
                Operand::ImageOperands(ImageOperands::LOD),
                Operand::IdRef(lod.id),
            ],
        )
    }

    /// Sample the base level of `image` through `sampler`.
    pub fn sample_image(
        &mut self,
        image: Value,
        sampler: Value,
        coordinate: Value,
    ) -> BuildResult<Value> {
        let elem = self
            .float_operand(Op::ImageSampleExplicitLod, &coordinate)?
            .elem();
        let sampled = self.sampled_image(image, sampler)?;
        let lod = self.const_float(elem, 0.0)?;
        self.image_sample_explicit_lod(sampled, coordinate, lod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Image;
    use rspirv::spirv::{FunctionControl, StorageClass};

    #[test]
    fn sample_returns_texel_of_sampled_type() {
        let mut b = ModuleBuilder::default();
        let float = Elem::Float(32);
        let image_item = Item::Image(Image::sampled_2d(float));
        let coord_item = Item::Vector(float, 2);
        let def = b
            .begin_function(
                "fetch",
                &Item::void(),
                &[image_item, Item::Sampler, coord_item],
                FunctionControl::NONE,
            )
            .unwrap();
        let [image, sampler, coord] = def.parameters[..] else {
            panic!("expected three parameters");
        };

        let texel = b.sample_image(image, sampler, coord).unwrap();
        assert_eq!(b.item(texel.ty).unwrap(), &Item::Vector(float, 4));
        assert!(b.sample_image(image, sampler, image).is_err());
        assert!(b.sample_image(sampler, image, coord).is_err());
    }

    #[test]
    fn coordinate_width_follows_dimension() {
        let mut b = ModuleBuilder::default();
        let float = Elem::Float(32);
        let image_var = b
            .variable(StorageClass::UniformConstant, Item::Image(Image::sampled_2d(float)))
            .unwrap();
        let sampler_var = b
            .variable(StorageClass::UniformConstant, Item::Sampler)
            .unwrap();
        let coord = b.const_vector(float, &[0.5, 0.5, 0.5]).unwrap();
        b.begin_function("f", &Item::void(), &[], FunctionControl::NONE)
            .unwrap();
        let image = b.load(image_var).unwrap();
        let sampler = b.load(sampler_var).unwrap();
        assert!(matches!(
            b.sample_image(image, sampler, coord),
            Err(BuildError::TypeMismatch { op: Op::ImageSampleExplicitLod, .. })
        ));
    }
}
