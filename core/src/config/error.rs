use std::path::PathBuf;

use thiserror::Error;

/// Errors from [`ConfigLoader`](super::ConfigLoader).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// A source could not be read or merged.
    #[error("could not load edict configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The built-in defaults could not be serialized as the base layer.
    #[error("could not encode default configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid edict configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
