use visualmesh_spirv::{
    spirv::{Capability, SourceLanguage},
    BuildResult, ModuleBuilder, ModuleConfig,
};

use crate::{
    config::{compilation::CompilationLogLevel, Logger},
    demosaic::Demosaic,
    format::SensorFormat,
    kernel::SpirvKernel,
    options::KernelOptions,
    resources::{Binding, Interface},
};

/// Generate the kernel loading `format` frames into the network buffer.
///
/// Each invocation reads one coordinate, samples the frame there (demosaicing Bayer frames) and
/// writes the RGBA colour at the same index of the network buffer.
pub fn load_image(format: SensorFormat, options: &KernelOptions) -> BuildResult<SpirvKernel> {
    let precision = options.precision;
    let float = precision.elem();
    let mut b = ModuleBuilder::new(ModuleConfig {
        debug_symbols: options.debug_symbols,
        ..Default::default()
    });
    b.capability(Capability::Shader);
    b.source(SourceLanguage::Unknown, 0);

    let interface = Interface::declare(&mut b, precision)?;
    let demosaic = match format.first_red() {
        Some(_) => Some(Demosaic::define(&mut b, precision)?),
        None => None,
    };

    let entry = b.begin_entry_point(format.entry_point(), &[interface.global_id])?;
    b.local_size(entry.id, options.local_size)?;

    let zero = b.const_u32(0)?;
    let index = b.access_chain(interface.global_id, &[zero])?;
    let index = b.load(index)?;
    b.name(index.id, "index")?;

    let coord = b.access_chain(interface.coordinates, &[zero, index])?;
    let coord = b.load(coord)?;
    let image = b.load(interface.image)?;
    let sampler = b.load(interface.sampler)?;

    let colour = match (demosaic, format.first_red()) {
        (Some(demosaic), Some(first_red)) => {
            let first_red = b.const_vector(float, &first_red)?;
            b.call_function(demosaic.bayer_to_rgb, &[image, sampler, coord, first_red])?
        }
        _ => b.sample_image(image, sampler, coord)?,
    };

    let output = b.access_chain(interface.network, &[zero, index])?;
    b.store(output, colour)?;
    b.return_function(None)?;
    b.end_function()?;

    let kernel = SpirvKernel {
        entry_point: format.entry_point().to_string(),
        format,
        precision,
        assembled_module: b.build()?,
        bindings: Binding::layout(precision),
    };
    log::debug!(
        "Generated {} ({precision}) in {} words",
        kernel.entry_point,
        kernel.assembled_module.len()
    );

    let mut logger = Logger::new();
    if logger.log_level_compilation() == CompilationLogLevel::Full {
        logger.log_compilation(&kernel);
    }
    Ok(kernel)
}

/// Generate every image loading kernel, one module each.
pub fn load_image_kernels(options: &KernelOptions) -> BuildResult<Vec<SpirvKernel>> {
    SensorFormat::ALL
        .iter()
        .map(|format| load_image(*format, options))
        .collect()
}
