//! Malvar-He-Cutler demosaicing expressed as a branch free SPIR-V function.
//!
//! The 5x5 filter is evaluated the way McGuire's GPU formulation does it: the nine texels on the
//! plus shaped taps and the four diagonals are reduced to six sums (`A`..`F`), those are weighted
//! into a `pattern` vector holding every interpolated channel, and the parity of the coordinate
//! within the 2x2 mosaic picks which of them land in red, green and blue.

use visualmesh_spirv::{
    spirv::{FunctionControl, Word},
    BuildResult, Elem, Image, Item, ModuleBuilder, Value,
};

use crate::options::Precision;

/// Texel offsets of the taps on each axis.
const OFFSETS: [f64; 4] = [-2.0, -1.0, 1.0, 2.0];

// Filter weights, already divided by 8.
const K_A: [f64; 4] = [-0.125, -0.1875, 0.0625, -0.125];
const K_B: [f64; 4] = [0.25, 0.0, 0.0, 0.5];
const K_C: [f64; 4] = [0.5, 0.75, 0.625, 0.625];
const K_D: [f64; 4] = [0.0, 0.25, -0.125, -0.125];
const K_E: [f64; 4] = [-0.125, -0.1875, -0.125, 0.0625];
const K_F: [f64; 4] = [0.25, 0.0, 0.5, 0.0];

/// The demosaic function shared by the Bayer kernels. Its `fetch` helper is only called from
/// inside it.
#[derive(Debug, Clone, Copy)]
pub struct Demosaic {
    pub bayer_to_rgb: Word,
}

impl Demosaic {
    pub fn define(b: &mut ModuleBuilder, precision: Precision) -> BuildResult<Self> {
        let fetch = define_fetch(b, precision)?;
        let bayer_to_rgb = define_bayer_to_rgb(b, precision, fetch)?;
        Ok(Self { bayer_to_rgb })
    }
}

fn image_item(float: Elem) -> Item {
    Item::Image(Image::sampled_2d(float))
}

/// `fetch(image, sampler, coord) -> float`, the first channel of the texel at `coord`.
fn define_fetch(b: &mut ModuleBuilder, precision: Precision) -> BuildResult<Word> {
    let float = precision.elem();
    let def = b.begin_function(
        "fetch",
        &Item::Scalar(float),
        &[image_item(float), Item::Sampler, Item::vector(float, 2)?],
        FunctionControl::PURE | FunctionControl::INLINE,
    )?;
    let (image, sampler, coord) = (def.parameters[0], def.parameters[1], def.parameters[2]);

    let texel = b.sample_image(image, sampler, coord)?;
    let value = b.composite_extract(texel, 0)?;
    b.return_function(Some(value))?;
    b.end_function()?;
    Ok(def.id)
}

/// Emission state of `bayer_to_rgb`.
struct Filter<'a> {
    b: &'a mut ModuleBuilder,
    fetch: Word,
    float: Elem,
    image: Value,
    sampler: Value,
}

impl Filter<'_> {
    /// Sample the mosaic at `(x, y)`.
    fn tap(&mut self, x: Value, y: Value) -> BuildResult<Value> {
        let vec2 = Item::vector(self.float, 2)?;
        let coord = self.b.composite_construct(&vec2, &[x, y])?;
        self.b
            .call_function(self.fetch, &[self.image, self.sampler, coord])
    }

    fn taps(&mut self, coords: [(Value, Value); 4]) -> BuildResult<Value> {
        let mut samples = Vec::with_capacity(4);
        for (x, y) in coords {
            samples.push(self.tap(x, y)?);
        }
        let vec4 = Item::vector(self.float, 4)?;
        self.b.composite_construct(&vec4, &samples)
    }

    /// `constant[source] * scalar`, rearranged by `layout`.
    fn weigh(
        &mut self,
        constant: [f64; 4],
        source: &[u32],
        scalar: Value,
        layout: &[u32],
    ) -> BuildResult<Value> {
        let constant = self.b.const_vector(self.float, &constant)?;
        let weights = self.b.swizzle(constant, source)?;
        let weighted = self.b.vector_times_scalar(weights, scalar)?;
        self.b.swizzle(weighted, layout)
    }

    /// `target.lanes += value`, every other lane of `target` is kept.
    fn accumulate(&mut self, target: Value, lanes: &[u32], value: Value) -> BuildResult<Value> {
        let current = self.b.swizzle(target, lanes)?;
        let sum = self.b.f_add(current, value)?;
        let mut shuffle = [0, 1, 2, 3];
        for (i, lane) in lanes.iter().enumerate() {
            shuffle[*lane as usize] = 4 + i as u32;
        }
        self.b.vector_shuffle(target, sum, &shuffle)
    }

    fn rgba(&mut self, channels: [Value; 3]) -> BuildResult<Value> {
        let one = self.b.const_float(self.float, 1.0)?;
        let vec4 = Item::vector(self.float, 4)?;
        let [red, green, blue] = channels;
        self.b.composite_construct(&vec4, &[red, green, blue, one])
    }

    /// `value == 0` replicated over 4 lanes, the shape `OpSelect` needs for vec4 operands.
    fn is_zero(&mut self, value: Value) -> BuildResult<Value> {
        let zero = self.b.const_float(self.float, 0.0)?;
        let cond = self.b.f_ord_equal(value, zero)?;
        self.b.splat(cond, 4)
    }
}

/// `bayer_to_rgb(image, sampler, coord, first_red) -> vec4`.
fn define_bayer_to_rgb(b: &mut ModuleBuilder, precision: Precision, fetch: Word) -> BuildResult<Word> {
    let float = precision.elem();
    let vec2 = Item::vector(float, 2)?;
    let def = b.begin_function(
        "bayer_to_rgb",
        &Item::vector(float, 4)?,
        &[image_item(float), Item::Sampler, vec2.clone(), vec2],
        FunctionControl::PURE,
    )?;
    let (image, sampler) = (def.parameters[0], def.parameters[1]);
    let (coord, first_red) = (def.parameters[2], def.parameters[3]);
    b.name(coord.id, "coord")?;
    b.name(first_red.id, "first_red")?;

    let mut f = Filter {
        b,
        fetch,
        float,
        image,
        sampler,
    };

    // Tap positions on both axes.
    let centre_x = f.b.composite_extract(coord, 0)?;
    let centre_y = f.b.composite_extract(coord, 1)?;
    let offsets = f.b.const_vector(float, &OFFSETS)?;
    let xs = f.b.splat(centre_x, 4)?;
    let x_coord = f.b.f_add(xs, offsets)?;
    let ys = f.b.splat(centre_y, 4)?;
    let y_coord = f.b.f_add(ys, offsets)?;
    let mut x = Vec::with_capacity(4);
    let mut y = Vec::with_capacity(4);
    for i in 0..4u32 {
        x.push(f.b.composite_extract(x_coord, i)?);
        y.push(f.b.composite_extract(y_coord, i)?);
    }

    // Position within the 2x2 mosaic, relative to the red texel.
    let mosaic = f.b.f_add(coord, first_red)?;
    let mosaic = f.b.floor(mosaic)?;
    let two = f.b.const_vector(float, &[2.0, 2.0])?;
    let alternate = f.b.f_mod(mosaic, two)?;
    f.b.name(alternate.id, "alternate")?;

    let c = f.tap(centre_x, centre_y)?;
    f.b.name(c.id, "C")?;

    let diagonals = f.taps([(x[1], y[1]), (x[1], y[2]), (x[2], y[1]), (x[2], y[2])])?;
    let ones = f.b.const_vector(float, &[1.0; 4])?;
    let d = f.b.dot(diagonals, ones)?;
    f.b.name(d.id, "D")?;

    // (A, B, E, F): vertical +-2, vertical +-1, horizontal +-2, horizontal +-1.
    let near = f.taps([
        (centre_x, y[0]),
        (centre_x, y[1]),
        (x[0], centre_y),
        (x[1], centre_y),
    ])?;
    let far = f.taps([
        (centre_x, y[3]),
        (centre_x, y[2]),
        (x[3], centre_y),
        (x[2], centre_y),
    ])?;
    let sums = f.b.f_add(near, far)?;
    let sum_a = f.b.composite_extract(sums, 0)?;
    let sum_b = f.b.composite_extract(sums, 1)?;
    let sum_e = f.b.composite_extract(sums, 2)?;
    let sum_f = f.b.composite_extract(sums, 3)?;
    f.b.name(sum_a.id, "A")?;
    f.b.name(sum_b.id, "B")?;
    f.b.name(sum_e.id, "E")?;
    f.b.name(sum_f.id, "F")?;

    // pattern = (kC.xyz * C).xyzz
    let pattern = f.weigh(K_C, &[0, 1, 2], c, &[0, 1, 2, 2])?;
    // pattern.yzw += (kD.yz * D).xyy
    let term = f.weigh(K_D, &[1, 2], d, &[0, 1, 1])?;
    let pattern = f.accumulate(pattern, &[1, 2, 3], term)?;
    // pattern += (kA.xyz * A).xyzx + (kE.xyw * E).xyxz
    let term_a = f.weigh(K_A, &[0, 1, 2], sum_a, &[0, 1, 2, 0])?;
    let term_e = f.weigh(K_E, &[0, 1, 3], sum_e, &[0, 1, 0, 2])?;
    let term = f.b.f_add(term_a, term_e)?;
    let pattern = f.b.f_add(pattern, term)?;
    // pattern.xw += kB.xw * B
    let term = f.weigh(K_B, &[0, 3], sum_b, &[0, 1])?;
    let pattern = f.accumulate(pattern, &[0, 3], term)?;
    // pattern.xz += kF.xz * F
    let term = f.weigh(K_F, &[0, 2], sum_f, &[0, 1])?;
    let pattern = f.accumulate(pattern, &[0, 2], term)?;
    f.b.name(pattern.id, "pattern")?;

    let p = [
        f.b.composite_extract(pattern, 0)?,
        f.b.composite_extract(pattern, 1)?,
        f.b.composite_extract(pattern, 2)?,
        f.b.composite_extract(pattern, 3)?,
    ];
    // Red, green on a red row, green on a blue row, blue.
    let red = f.rgba([c, p[0], p[1]])?;
    let green_red_row = f.rgba([p[2], c, p[3]])?;
    let green_blue_row = f.rgba([p[3], c, p[2]])?;
    let blue = f.rgba([p[1], p[0], c])?;

    let alternate_x = f.b.composite_extract(alternate, 0)?;
    let alternate_y = f.b.composite_extract(alternate, 1)?;
    let even_column = f.is_zero(alternate_x)?;
    let even_row = f.is_zero(alternate_y)?;

    let red_row = f.b.select(even_column, red, green_red_row)?;
    let blue_row = f.b.select(even_column, green_blue_row, blue)?;
    let colour = f.b.select(even_row, red_row, blue_row)?;

    f.b.return_function(Some(colour))?;
    f.b.end_function()?;
    Ok(def.id)
}
