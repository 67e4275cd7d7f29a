use edict_fuzzy::IndexError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum EdictError {
    #[error("command and parameter names must not be empty (in '{scope}')")]
    EmptyName { scope: String },

    #[error("name '{name}' in '{scope}' must not contain whitespace")]
    InvalidName { scope: String, name: String },

    #[error("name '{name}' is used more than once in '{scope}'")]
    DuplicateName { scope: String, name: String },

    #[error("category '{name}' has no commands")]
    EmptyCategory { name: String },

    #[error("no value parser for type {value_type} (parameter '{parameter}' of '{command}')")]
    MissingParser {
        command: String,
        parameter: String,
        value_type: &'static str,
    },

    #[error(
        "no context provider for type {value_type} (contextual parameter '{parameter}' of '{command}')"
    )]
    MissingContextProvider {
        command: String,
        parameter: String,
        value_type: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("name index: {0}")]
    Index(#[from] IndexError),

    #[error("internal invariant violated: {reason}")]
    Internal { reason: String },
}

impl EdictError {
    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Errors that indicate a bug in the engine rather than bad input or
    /// a bad command tree.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Index(_) | Self::Internal { .. })
    }
}

pub type Result<T> = std::result::Result<T, EdictError>;
