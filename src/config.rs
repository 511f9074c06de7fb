//! Configuration for the record engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (records.toml)
//! - Environment variables (RECORDS__*)
//!
//! ## Example config file (records.toml):
//! ```toml
//! [validation]
//! allow_null_by_default = false
//!
//! [examples]
//! seed = 42
//! max_depth = 4
//! max_collection_size = 3
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for descriptor loading and example generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Defaults applied to record types built from descriptors
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Example generation settings
    #[serde(default)]
    pub examples: ExampleConfig,

    /// Rendering of JSON output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fields without an explicit `null` option accept null
    #[serde(default)]
    pub allow_null_by_default: bool,
}

/// Example generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleConfig {
    /// Fixed RNG seed; random when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Nested records deeper than this are left out
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound on generated collection sizes
    #[serde(default = "default_max_collection_size")]
    pub max_collection_size: usize,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_max_depth() -> usize {
    4
}

fn default_max_collection_size() -> usize {
    3
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_depth: default_max_depth(),
            max_collection_size: default_max_collection_size(),
        }
    }
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["records.toml", ".records.toml", "config/records.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "records") {
            let xdg_config = config_dir.config_dir().join("records.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RECORDS__EXAMPLES__SEED=7 and friends
        builder = builder.add_source(
            Environment::with_prefix("RECORDS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.validation.allow_null_by_default);
        assert_eq!(config.examples.max_depth, 4);
        assert_eq!(config.examples.seed, None);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[examples]"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[examples]\nseed = 42\nmax_depth = 2\n\n[output]\nformat = \"compact\"").unwrap();

        let config = EngineConfig::load_from(file.path().to_str()).unwrap();
        assert_eq!(config.examples.seed, Some(42));
        assert_eq!(config.examples.max_depth, 2);
        assert_eq!(config.examples.max_collection_size, 3);
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.toml");
        let mut config = EngineConfig::default();
        config.validation.allow_null_by_default = true;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = EngineConfig::load_from(path.to_str()).unwrap();
        assert!(loaded.validation.allow_null_by_default);
    }
}
