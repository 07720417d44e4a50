use std::{path::Path, sync::Arc};

use super::{compilation::CompilationConfig, compilation::CompilationLogLevel, ConfigError};
use crate::options::Precision;

/// Static mutex holding the global configuration, initialized as `None`.
static GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Global configuration for kernel generation.
#[derive(Default, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for compilation settings.
    #[serde(default)]
    pub compilation: CompilationConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `visualmesh.toml` in the current
    /// directory or its parents, then applies the environment overrides. If no file is found, a
    /// default configuration is used.
    pub fn get() -> Arc<Self> {
        let mut state = GLOBAL_CONFIG.lock();
        state
            .get_or_insert_with(|| Arc::new(Self::from_current_dir().override_from_env()))
            .clone()
    }

    /// Sets the global configuration to the provided value.
    ///
    /// Must be called before the first [`GlobalConfig::get`], the configuration can't be replaced
    /// once it has been read.
    pub fn set(config: Self) -> Result<(), ConfigError> {
        let mut state = GLOBAL_CONFIG.lock();
        if state.is_some() {
            return Err(ConfigError::AlreadySet);
        }
        *state = Some(Arc::new(config));
        Ok(())
    }

    /// Save the active configuration to the provided file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("VISUALMESH_DEBUG_LOG") {
            self.compilation.logger.level = CompilationLogLevel::Full;

            match val.as_str() {
                "stdout" => self.compilation.logger.stdout = true,
                "stderr" => self.compilation.logger.stderr = true,
                "1" | "true" => self.compilation.logger.log = Some(Default::default()),
                "0" | "false" => self.compilation.logger.level = CompilationLogLevel::Disabled,
                file_path => self.compilation.logger.file = Some(file_path.into()),
            }
        }

        if let Ok(val) = std::env::var("VISUALMESH_PRECISION") {
            match val.as_str() {
                "f32" | "32" => self.compilation.precision = Precision::F32,
                "f64" | "64" => self.compilation.precision = Precision::F64,
                other => log::warn!("Ignoring unknown VISUALMESH_PRECISION value {other:?}"),
            }
        }

        self
    }

    /// Loads configuration from a specified file path.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    // Traverses up the directory tree until a configuration file is found or the root is reached.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            let path = dir.join("visualmesh.toml");
            if path.is_file() {
                match Self::from_file_path(&path) {
                    Ok(config) => return config,
                    Err(err) => {
                        log::warn!("Ignoring {}: {err}", path.display());
                        break;
                    }
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_partial_file() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [compilation]
            precision = "f64"
            local_size = [64, 1, 1]
            "#,
        )
        .unwrap();

        assert_eq!(config.compilation.precision, Precision::F64);
        assert_eq!(config.compilation.local_size, [64, 1, 1]);
        assert!(!config.compilation.debug_symbols);
        assert_eq!(config.compilation.logger.level, CompilationLogLevel::Disabled);
    }

    #[test]
    fn rejects_unknown_precision() {
        let config = toml::from_str::<GlobalConfig>(
            r#"
            [compilation]
            precision = "f16"
            "#,
        );
        assert!(config.is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("visualmesh-{}.toml", std::process::id()));
        let mut config = GlobalConfig::default();
        config.compilation.debug_symbols = true;
        config.compilation.logger.level = CompilationLogLevel::Full;

        config.save(&path).unwrap();
        let loaded = GlobalConfig::from_file_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        std::env::set_var("VISUALMESH_PRECISION", "f64");
        std::env::set_var("VISUALMESH_DEBUG_LOG", "stderr");
        let config = GlobalConfig::default().override_from_env();
        std::env::remove_var("VISUALMESH_PRECISION");
        std::env::remove_var("VISUALMESH_DEBUG_LOG");

        assert_eq!(config.compilation.precision, Precision::F64);
        assert_eq!(config.compilation.logger.level, CompilationLogLevel::Full);
        assert!(config.compilation.logger.stderr);
    }

    #[test]
    #[serial]
    fn debug_log_can_disable_logging() {
        std::env::set_var("VISUALMESH_DEBUG_LOG", "0");
        let config = GlobalConfig::default().override_from_env();
        std::env::remove_var("VISUALMESH_DEBUG_LOG");

        assert_eq!(config.compilation.logger.level, CompilationLogLevel::Disabled);
    }
}
