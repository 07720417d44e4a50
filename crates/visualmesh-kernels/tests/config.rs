use pretty_assertions::assert_eq;
use rspirv::{dr::load_words, dr::Operand, spirv::Capability};
use visualmesh_kernels::{
    config::{compilation::CompilationConfig, ConfigError, GlobalConfig},
    load_image, KernelOptions, Precision, SensorFormat,
};

#[test_log::test]
fn global_config_drives_kernel_options() {
    let config = GlobalConfig {
        compilation: CompilationConfig {
            precision: Precision::F64,
            local_size: [32, 2, 1],
            ..Default::default()
        },
    };
    GlobalConfig::set(config.clone()).unwrap();
    assert!(matches!(
        GlobalConfig::set(config.clone()),
        Err(ConfigError::AlreadySet)
    ));
    assert_eq!(*GlobalConfig::get(), config);

    let options = KernelOptions::from_config();
    assert_eq!(options.precision, Precision::F64);
    assert_eq!(options.local_size, [32, 2, 1]);
    assert!(!options.debug_symbols);

    let kernel = load_image(SensorFormat::BGGR, &options).unwrap();
    assert_eq!(kernel.precision, Precision::F64);
    let module = load_words(&kernel.assembled_module).unwrap();
    assert!(module
        .capabilities
        .iter()
        .any(|inst| inst.operands[0] == Operand::Capability(Capability::Float64)));
}
