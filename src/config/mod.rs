//! # Configuration Management
//!
//! Settings are read from an optional configuration file and `DELTAPLANE__*`
//! environment variables, then validated.

pub mod settings;

pub use settings::{AppConfig, ObservabilityConfig, TranslationConfig, ENV_PREFIX};
