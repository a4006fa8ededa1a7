//! # Observability
//!
//! Structured logging and translation metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::TranslationMetrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging and, when enabled, register metric descriptions
pub fn init_observability(config: &ObservabilityConfig) -> Result<TranslationMetrics> {
    init_logging(config)?;

    let metrics = TranslationMetrics::new();
    if config.enable_metrics {
        metrics.register();
    }

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = config.enable_metrics,
        "Observability initialized successfully"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_observability() {
        let config = ObservabilityConfig { enable_metrics: true, ..Default::default() };
        assert!(init_observability(&config).is_ok());
    }
}
