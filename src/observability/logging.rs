//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! `RUST_LOG` takes precedence over the configured level. In JSON mode every event
//! is emitted as one JSON object per line, including the fields of the enclosing
//! `translation_operation` span.

use crate::config::ObservabilityConfig;
use crate::errors::{DeltaplaneError, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Create a tracing span for a translation call.
///
/// ```rust,ignore
/// let span = translation_span!("node_group_event", "ng1");
/// let span = translation_span!("reload", "*", entries = 3);
/// ```
#[macro_export]
macro_rules! translation_span {
    ($operation:expr, $node_group:expr) => {
        tracing::info_span!(
            "translation_operation",
            operation = %$operation,
            node_group = %$node_group,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $node_group:expr, $($field:tt)*) => {
        tracing::info_span!(
            "translation_operation",
            operation = %$operation,
            node_group = %$node_group,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| {
            DeltaplaneError::config(format!("Invalid log level '{}': {}", level, e))
        }),
    }
}

/// Install the global subscriber. A subscriber installed earlier (for example by a
/// test harness) is kept.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = env_filter(&config.log_level)?;

    // A subscriber set elsewhere stays in place
    let _ = if config.json_logging {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).finish(),
        )
    };

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        log_level = %config.observability.log_level,
        json_logging = config.observability.json_logging,
        metrics_enabled = config.observability.enable_metrics,
        runtime_layer = %config.translation.runtime_layer_name,
        reject_unknown_tables = config.translation.reject_unknown_tables,
        "Deltaplane translation engine configuration"
    );
}
