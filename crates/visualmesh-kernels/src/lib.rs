//! Image loading kernels of the visual mesh.
//!
//! Every kernel reads one sampling coordinate per invocation, samples the raw camera frame there
//! and writes an RGBA colour into the network input buffer. Bayer frames are demosaiced with the
//! Malvar-He-Cutler filter using branch free selects.

/// Global configuration.
pub mod config;

mod demosaic;
mod format;
mod kernel;
mod load_image;
mod options;
mod resources;

pub use format::*;
pub use kernel::*;
pub use load_image::*;
pub use options::*;
pub use resources::*;

pub use visualmesh_spirv::BuildError;
