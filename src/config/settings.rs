//! # Configuration Settings
//!
//! Defines the configuration structure for the deltaplane translation engine.

use crate::errors::{DeltaplaneError, Result};
use crate::xds::cache::DEFAULT_CHANNEL_CAPACITY;
use crate::xds::factory::DEFAULT_RUNTIME_LAYER_NAME;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Prefix of environment overrides, e.g. `DELTAPLANE__TRANSLATION__REJECT_UNKNOWN_TABLES`
pub const ENV_PREFIX: &str = "DELTAPLANE";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Translation engine configuration
    #[validate(nested)]
    pub translation: TranslationConfig,
}

impl AppConfig {
    /// Load from an optional file, then environment variables, then validate.
    ///
    /// The file format follows its extension (YAML, TOML or JSON).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(DeltaplaneError::config(format!(
                    "Configuration file '{}' does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(DeltaplaneError::from)?;

        self.validate_custom()?;

        Ok(())
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if EnvFilter::try_new(&self.observability.log_level).is_err() {
            return Err(DeltaplaneError::validation_field(
                format!("Invalid log level '{}'", self.observability.log_level),
                "observability.log_level",
            ));
        }

        if self.translation.runtime_layer_name.chars().any(char::is_whitespace) {
            return Err(DeltaplaneError::validation_field(
                "Runtime layer name cannot contain whitespace",
                "translation.runtime_layer_name",
            ));
        }

        Ok(())
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name reported in logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Default log level or filter directives; `RUST_LOG` wins when set
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON lines
    pub json_logging: bool,

    /// Register translation metrics with the installed recorder
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "deltaplane".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: true,
        }
    }
}

/// Translation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TranslationConfig {
    /// Name of the single runtime layer resource of every node group
    #[validate(length(min = 1, max = 253, message = "Runtime layer name must be 1-253 characters"))]
    pub runtime_layer_name: String,

    /// Capacity of the snapshot update broadcast channel
    #[validate(range(
        min = 1,
        max = 65536,
        message = "Snapshot channel capacity must be between 1 and 65536"
    ))]
    pub snapshot_channel_capacity: usize,

    /// Fail translation on tables without a resolver instead of skipping them
    pub reject_unknown_tables: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            runtime_layer_name: DEFAULT_RUNTIME_LAYER_NAME.to_string(),
            snapshot_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            reject_unknown_tables: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.translation.runtime_layer_name, "rtds_layer0");
        assert_eq!(config.translation.snapshot_channel_capacity, 128);
        assert!(!config.translation.reject_unknown_tables);
    }

    #[test]
    fn test_invalid_channel_capacity() {
        let mut config = AppConfig::default();
        config.translation.snapshot_channel_capacity = 0;
        assert!(matches!(config.validate(), Err(DeltaplaneError::Validation { .. })));
    }

    #[test]
    fn test_invalid_runtime_layer_name() {
        let mut config = AppConfig::default();
        config.translation.runtime_layer_name = "rtds layer".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn test_load_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "observability:\n  log_level: debug\ntranslation:\n  runtime_layer_name: custom_layer\n  reject_unknown_tables: true"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.service_name, "deltaplane");
        assert_eq!(config.translation.runtime_layer_name, "custom_layer");
        assert!(config.translation.reject_unknown_tables);
    }

    #[test]
    fn test_load_missing_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let err = AppConfig::load(Some(Path::new("/nonexistent/deltaplane.yaml"))).unwrap_err();
        assert!(matches!(err, DeltaplaneError::Config { .. }));
    }

    #[test]
    fn test_environment_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("DELTAPLANE__TRANSLATION__SNAPSHOT_CHANNEL_CAPACITY", "512");

        let config = AppConfig::load(None);
        std::env::remove_var("DELTAPLANE__TRANSLATION__SNAPSHOT_CHANNEL_CAPACITY");

        assert_eq!(config.unwrap().translation.snapshot_channel_capacity, 512);
    }
}
