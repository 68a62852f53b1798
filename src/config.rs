//! Configuration for contract collections and checkers
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (contracts.toml)
//! - Environment variables (CONTRACTS__*)
//!
//! ## Example config file (contracts.toml):
//! ```toml
//! [compatibility]
//! strict = false
//!
//! [providers]
//! order = ["nullable", "enum", "primitive", "empty", "list", "dictionary", "union", "complex"]
//!
//! [descriptor]
//! output_format = "pretty"
//! include_root = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::provider::{Provider, DEFAULT_PROVIDERS};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Compatibility checking settings
    #[serde(default)]
    pub compatibility: CompatibilityConfig,

    /// Provider chain settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Descriptor output settings
    #[serde(default)]
    pub descriptor: DescriptorConfig,
}

/// Compatibility configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Check in strict mode unless told otherwise
    #[serde(default)]
    pub strict: bool,
}

/// Provider chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Providers in priority order; the first one that accepts a type builds it
    #[serde(default = "default_provider_order")]
    pub order: Vec<Provider>,
}

/// Descriptor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Write the `Root` attribute on exported documents
    #[serde(default = "default_true")]
    pub include_root: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_provider_order() -> Vec<Provider> {
    DEFAULT_PROVIDERS.to_vec()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
        }
    }
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            include_root: true,
        }
    }
}

impl ContractsConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["contracts.toml", ".contracts.toml", "config/contracts.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-contracts", "contracts") {
            let xdg_config = config_dir.config_dir().join("contracts.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // CONTRACTS__COMPATIBILITY__STRICT=true, CONTRACTS__PROVIDERS__ORDER=enum,complex
        builder = builder.add_source(
            Environment::with_prefix("CONTRACTS")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("providers.order")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
