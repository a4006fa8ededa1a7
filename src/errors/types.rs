//! # Error Types
//!
//! Error types for the Deltaplane translation engine using `thiserror`.

/// Custom result type for Deltaplane operations
pub type Result<T> = std::result::Result<T, DeltaplaneError>;

/// Main error type for the Deltaplane control plane
#[derive(thiserror::Error, Debug)]
pub enum DeltaplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Configuration store errors (lookup or transaction failure)
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An assumption the translation relies on does not hold
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// YAML deserialization errors
    #[error("YAML error: {context}")]
    Yaml {
        #[source]
        source: serde_yaml::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DeltaplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(context: S) -> Self {
        Self::Storage { context: context.into(), source: None }
    }

    /// Create a storage error with source
    pub fn storage_with_source<S: Into<String>>(
        context: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Storage { context: context.into(), source: Some(source) }
    }

    /// Create an invariant violation
    pub fn invariant<S: Into<String>>(message: S) -> Self {
        Self::InvariantViolation { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether the error aborts a translation call.
    ///
    /// Callers must not publish anything for a batch that failed with a fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeltaplaneError::Storage { .. }
                | DeltaplaneError::InvariantViolation { .. }
                | DeltaplaneError::Config { .. }
        )
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DeltaplaneError::Config { .. } => "config",
            DeltaplaneError::Validation { .. } => "validation",
            DeltaplaneError::Storage { .. } => "storage",
            DeltaplaneError::InvariantViolation { .. } => "invariant_violation",
            DeltaplaneError::NotFound { .. } => "not_found",
            DeltaplaneError::Serialization { .. } => "serialization",
            DeltaplaneError::Yaml { .. } => "yaml",
            DeltaplaneError::Io { .. } => "io",
            DeltaplaneError::Internal { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for DeltaplaneError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for DeltaplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<serde_yaml::Error> for DeltaplaneError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Yaml { source: error, context: "YAML deserialization failed".to_string() }
    }
}

impl From<config::ConfigError> for DeltaplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for DeltaplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        // nested struct errors are not listed by field_errors()
        let message = if message.is_empty() { errors.to_string() } else { message };
        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = DeltaplaneError::config("Test configuration error");
        assert!(matches!(error, DeltaplaneError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error() {
        let error = DeltaplaneError::validation_field("Unknown resource kind", "resource_kind");
        if let DeltaplaneError::Validation { field, .. } = error {
            assert_eq!(field, Some("resource_kind".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DeltaplaneError::invariant("payload mismatch").is_fatal());
        assert!(DeltaplaneError::storage("lookup failed").is_fatal());
        assert!(!DeltaplaneError::validation("bad input").is_fatal());
        assert!(!DeltaplaneError::not_found("Route", "7").is_fatal());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(DeltaplaneError::invariant("x").kind(), "invariant_violation");
        assert_eq!(DeltaplaneError::storage("x").kind(), "storage");
        assert_eq!(DeltaplaneError::internal("x").kind(), "internal");
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: DeltaplaneError = io_error.into();
        assert!(matches!(error, DeltaplaneError::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: DeltaplaneError = json_error.into();
        assert!(matches!(error, DeltaplaneError::Serialization { .. }));
    }
}
