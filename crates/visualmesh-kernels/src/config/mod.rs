/// Compilation config module.
pub mod compilation;

mod base;
mod logger;

pub use base::*;
pub use logger::{BinaryLogLevel, LogCrateLevel, LogLevel, Logger, LoggerConfig};

/// Errors raised while loading or storing the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Can't access the configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("The file provided doesn't have the right format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Can't serialize the configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot set the global configuration multiple times")]
    AlreadySet,
}
