use super::error::ConfigError;
use super::error::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine settings, passed by value into each [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdictConfig {
    /// Fraction (0.0-1.0) of typed input that must match a name
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Prompts shown before giving up on an ambiguous value
    #[serde(default = "default_option_pick_attempts")]
    pub option_pick_attempts: u32,

    /// Seconds to wait for each disambiguation reply
    #[serde(default = "default_option_pick_timeout_seconds")]
    pub option_pick_timeout_seconds: u64,

    /// Take the first candidate instead of prompting
    #[serde(default)]
    pub always_pick_first_option: bool,

    /// Run every dispatch on the caller's task
    #[serde(default)]
    pub force_sync: bool,
}

fn default_match_threshold() -> f64 {
    0.6
}
fn default_option_pick_attempts() -> u32 {
    3
}
fn default_option_pick_timeout_seconds() -> u64 {
    15
}

impl Default for EdictConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            option_pick_attempts: default_option_pick_attempts(),
            option_pick_timeout_seconds: default_option_pick_timeout_seconds(),
            always_pick_first_option: false,
            force_sync: false,
        }
    }
}

impl EdictConfig {
    pub fn option_pick_timeout(&self) -> Duration {
        Duration::from_secs(self.option_pick_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be within 0.0..=1.0, got {}",
                self.match_threshold
            )));
        }
        if self.option_pick_attempts == 0 {
            return Err(ConfigError::Invalid(
                "option_pick_attempts must be at least 1".to_string(),
            ));
        }
        if self.option_pick_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "option_pick_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (EDICT_ prefix)
    pub fn load(&self) -> Result<EdictConfig> {
        let mut builder = Config::builder();

        let defaults_json = serde_json::to_string(&EdictConfig::default())?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // Example: EDICT_MATCH_THRESHOLD=0.8
        builder = builder.add_source(
            Environment::with_prefix("EDICT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EdictConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./edict.toml
    /// 2. XDG config: ~/.config/edict/config.toml
    /// 3. Home directory: ~/.edict.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./edict.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("edict").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".edict.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    pub fn load_default() -> Result<EdictConfig> {
        let loader = match Self::find_config_file() {
            Some(config_path) => ConfigLoader::new().with_file(config_path),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = EdictConfig::default();
        assert_eq!(config.match_threshold, 0.6);
        assert_eq!(config.option_pick_attempts, 3);
        assert_eq!(config.option_pick_timeout(), Duration::from_secs(15));
        assert!(!config.always_pick_first_option);
        assert!(!config.force_sync);
    }

    #[test]
    #[serial]
    fn test_load_with_defaults_only() {
        let config = ConfigLoader::new().load().expect("Failed to load default config");
        assert_eq!(config, EdictConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_with_env_override() {
        unsafe {
            env::set_var("EDICT_MATCH_THRESHOLD", "0.8");
            env::set_var("EDICT_ALWAYS_PICK_FIRST_OPTION", "true");
        }

        let config = ConfigLoader::new().load();

        unsafe {
            env::remove_var("EDICT_MATCH_THRESHOLD");
            env::remove_var("EDICT_ALWAYS_PICK_FIRST_OPTION");
        }

        let config = config.expect("Failed to load config");
        assert_eq!(config.match_threshold, 0.8);
        assert!(config.always_pick_first_option);
    }

    #[test]
    #[serial]
    fn test_load_with_toml_file() {
        let toml_content = r#"
match_threshold = 0.75
option_pick_attempts = 5
option_pick_timeout_seconds = 30
"#;

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("edict.toml");
        std::fs::write(&config_path, toml_content).expect("Failed to write temp file");

        let config = ConfigLoader::new()
            .with_file(&config_path)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.match_threshold, 0.75);
        assert_eq!(config.option_pick_attempts, 5);
        assert_eq!(config.option_pick_timeout_seconds, 30);
        assert!(!config.always_pick_first_option);
    }

    #[test]
    #[serial]
    fn test_env_wins_over_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("edict.toml");
        std::fs::write(&config_path, "option_pick_attempts = 5\nmatch_threshold = 0.7\n")
            .expect("Failed to write temp file");

        unsafe {
            env::set_var("EDICT_OPTION_PICK_ATTEMPTS", "2");
        }
        let config = ConfigLoader::new().with_file(&config_path).load();
        unsafe {
            env::remove_var("EDICT_OPTION_PICK_ATTEMPTS");
        }

        let config = config.expect("Failed to load config");
        assert_eq!(config.option_pick_attempts, 2);
        assert_eq!(config.match_threshold, 0.7);
    }

    #[test]
    fn test_missing_file_error() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/edict.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_out_of_range_threshold_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("edict.toml");
        std::fs::write(&config_path, "match_threshold = 1.5\n").expect("Failed to write temp file");

        let result = ConfigLoader::new().with_file(&config_path).load();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let config = EdictConfig {
            option_pick_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
