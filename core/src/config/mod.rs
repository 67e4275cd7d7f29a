//! Engine settings.
//!
//! Sources are layered, later ones winning:
//! 1. Defaults from [`EdictConfig::default`]
//! 2. A TOML file (`edict.toml`)
//! 3. Environment variables with the `EDICT_` prefix
//!
//! ```no_run
//! use edict_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default().expect("Failed to load config");
//!
//! let config = ConfigLoader::new()
//!     .with_file("./edict.toml")
//!     .load()
//!     .expect("Failed to load config");
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use error::Result;
pub use loader::ConfigLoader;
pub use loader::EdictConfig;
