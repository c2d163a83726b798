//! Error types for race state processing.
//!
//! The derived-state core never fails on incomplete data: a roster entry that
//! is not there yet, a result table that has not been posted, or a number that
//! does not parse are all reported as `None` and retried on the next snapshot.
//! Errors only exist at the edges of the crate:
//!
//! - **Parse Errors**: session document text that cannot be turned into a tree
//! - **Configuration Errors**: invalid engine settings or update frequencies
//! - **Connection Errors**: failures reported by a snapshot source
//! - **Timeouts**: waiting on a source that never answers
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use pitwall_timing::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("simulator not running");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for race state operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for race state operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Snapshot source failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Field '{field}' not found in session document")]
    FieldNotFound { field: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Timeout { .. } => true,
            TelemetryError::Parse { .. } => false,
            TelemetryError::FieldNotFound { .. } => false,
            TelemetryError::TypeConversion { .. } => false,
            TelemetryError::InvalidConfig { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Ensure the simulator is running",
                "Check that the acquisition layer is still delivering snapshots",
                "Restart the director with a fresh source",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check session document format",
                "Verify the YAML was preprocessed before parsing",
                "Capture the raw document for inspection",
            ],
            TelemetryError::FieldNotFound { .. } => vec![
                "Check field path spelling",
                "Verify the field exists in the current simulator version",
                "Use optional query access patterns",
            ],
            TelemetryError::TypeConversion { .. } => vec![
                "Check data type compatibility",
                "Verify expected vs actual value formats",
            ],
            TelemetryError::InvalidConfig { .. } => vec![
                "Check configuration values are positive and finite",
                "Fall back to EngineConfig::default()",
            ],
            TelemetryError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Verify the snapshot source is responding",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TelemetryError::InvalidConfig { field: field.into(), reason: reason.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Parse { context: "YAML deserialization".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_format_correctly_with_arbitrary_context(
            reason in ".*",
            field_name in "\\w+",
            details in ".*"
          ) {
            let connection_error = TelemetryError::connection_failed(reason.clone());
            let field_error = TelemetryError::FieldNotFound { field: field_name.clone() };
            let config_error = TelemetryError::invalid_config(field_name.clone(), details.clone());
            let conversion_error = TelemetryError::TypeConversion { details: details.clone() };

            prop_assert!(connection_error.to_string().contains(&reason));
            prop_assert!(field_error.to_string().contains(&field_name));
            prop_assert!(config_error.to_string().contains(&field_name));
            prop_assert!(config_error.to_string().contains(&details));
            prop_assert!(conversion_error.to_string().contains(&details));
          }

          #[test]
          fn error_source_chaining_preserves_base_message(base_message in ".*") {
            let base: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let top = TelemetryError::connection_failed_with_source("source gave up", base);

            let source = std::error::Error::source(&top);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let connection_error = TelemetryError::connection_failed("test");
        let config_error = TelemetryError::invalid_config("max_cars", "must be positive");
        let timeout_error = TelemetryError::Timeout { duration: Duration::from_secs(5) };

        assert!(connection_error.is_retryable());
        assert!(timeout_error.is_retryable());
        assert!(!config_error.is_retryable());

        for error in [&connection_error, &config_error, &timeout_error] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }

    #[test]
    fn yaml_errors_convert_to_parse_errors() {
        let err = serde_yaml_ng::from_str::<serde_yaml_ng::Value>("key: [unclosed").unwrap_err();
        let converted: TelemetryError = err.into();
        assert!(matches!(converted, TelemetryError::Parse { .. }));
    }
}
