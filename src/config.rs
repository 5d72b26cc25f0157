//! Configuration management for the validator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-conform.toml)
//! - Environment variables (SCHEMA_CONFORM__*)
//!
//! ## Example config file (schema-conform.toml):
//! ```toml
//! [validation]
//! closest_match_context = true
//! max_depth = 256
//!
//! [output]
//! format = "text"
//! valid_message = "VALID SCHEMA!"
//! strict = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::validator::ValidationOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Attach the closest alternative's violations to failed oneOf/anyOf
    #[serde(default = "default_true")]
    pub closest_match_context: bool,

    /// Deepest data nesting that is still validated
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Printed when a document has no violations
    #[serde(default = "default_valid_message")]
    pub valid_message: String,

    /// Exit non-zero when violations are found
    #[serde(default)]
    pub strict: bool,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    ValidationOptions::default().max_depth
}

fn default_valid_message() -> String {
    "VALID SCHEMA!".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            closest_match_context: true,
            max_depth: default_max_depth(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            valid_message: default_valid_message(),
            strict: false,
        }
    }
}

/// SCHEMA_CONFORM__OUTPUT__STRICT=true etc.
fn environment() -> Environment {
    Environment::with_prefix("SCHEMA_CONFORM")
        .separator("__")
        .try_parsing(true)
}

impl ValidationConfig {
    pub fn to_options(&self) -> ValidationOptions {
        ValidationOptions {
            closest_match_context: self.closest_match_context,
            max_depth: self.max_depth,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_layered(config_path, environment())
    }

    fn load_layered(config_path: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-conform.toml",
            ".schema-conform.toml",
            "config/schema-conform.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-conform", "schema-conform") {
            let xdg_config = config_dir.config_dir().join("schema-conform.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(env);

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

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();
        assert!(config.validation.closest_match_context);
        assert_eq!(config.output.valid_message, "VALID SCHEMA!");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(!config.output.strict);
        assert_eq!(config.validation.to_options(), ValidationOptions::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = ValidatorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conform.toml");
        std::fs::write(
            &path,
            "[output]\nformat = \"json\"\nstrict = true\n\n[validation]\nmax_depth = 8\n",
        )
        .unwrap();

        let config = ValidatorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.strict);
        assert_eq!(config.output.valid_message, "VALID SCHEMA!");
        assert_eq!(config.validation.max_depth, 8);
        assert!(config.validation.closest_match_context);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conform.toml");
        std::fs::write(&path, "[output]\nformat = \"json\"\n\n[validation]\nmax_depth = 8\n").unwrap();

        let mut vars = config_crate::Map::new();
        vars.insert("SCHEMA_CONFORM__OUTPUT__STRICT".to_string(), "true".to_string());
        vars.insert("SCHEMA_CONFORM__OUTPUT__VALID_MESSAGE".to_string(), "conforms".to_string());
        vars.insert("SCHEMA_CONFORM__VALIDATION__MAX_DEPTH".to_string(), "12".to_string());
        vars.insert("OTHER_APP__OUTPUT__STRICT".to_string(), "false".to_string());

        let env = environment().source(Some(vars));
        let config = ValidatorConfig::load_layered(Some(path.to_str().unwrap()), env).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.strict);
        assert_eq!(config.output.valid_message, "conforms");
        assert_eq!(config.validation.max_depth, 12);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(ValidatorConfig::load_from(Some(path.to_str().unwrap())).is_err());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ValidatorConfig::default();
        config.output.valid_message = "ok".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ValidatorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.output.valid_message, "ok");
    }
}
