//! # Metrics Collection
//!
//! Translation metrics recorded through the `metrics` facade. The library installs
//! no exporter; embedding applications choose one.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics recorder for translation activity
#[derive(Debug, Clone, Default)]
pub struct TranslationMetrics;

impl TranslationMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record one translation call and its outcome
    pub fn record_translation(&self, mode: &str, success: bool, duration: f64) {
        let outcome = if success { "success" } else { "error" };
        let labels = [("mode", mode.to_string()), ("outcome", outcome.to_string())];
        counter!("deltaplane_translations_total", &labels).increment(1);

        let duration_labels = [("mode", mode.to_string())];
        histogram!("deltaplane_translation_duration_seconds", &duration_labels).record(duration);
    }

    pub fn record_deltas(&self, resource_kind: &str, count: usize) {
        let labels = [("resource_kind", resource_kind.to_string())];
        counter!("deltaplane_deltas_emitted_total", &labels).increment(count as u64);
    }

    /// Record a change batch table that has no resolver
    pub fn record_unsupported_table(&self, table: &str) {
        let labels = [("table", table.to_string())];
        counter!("deltaplane_unsupported_tables_total", &labels).increment(1);
    }

    /// Register descriptions so exporters list the metrics before the first event
    pub fn register(&self) {
        describe_counter!(
            "deltaplane_translations_total",
            Unit::Count,
            "Translation calls by mode and outcome"
        );
        describe_counter!(
            "deltaplane_deltas_emitted_total",
            Unit::Count,
            "Granular deltas produced per resource kind"
        );
        describe_counter!(
            "deltaplane_unsupported_tables_total",
            Unit::Count,
            "Change batch tables skipped for lack of a resolver"
        );
        describe_histogram!(
            "deltaplane_translation_duration_seconds",
            Unit::Seconds,
            "Time spent translating one change batch"
        );
    }
}
