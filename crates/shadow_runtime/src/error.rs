// =============================================================================
// Classical Shadows Runtime - Unified Error Types
// =============================================================================
// Table of Contents:
//   1. ShadowRuntimeError - Main error enum
//   2. BackendError - Sampling backend failures
//   3. ConfigurationError - Options loading failures
//   4. Result alias
// =============================================================================
// Purpose: Typed failure conditions for every stage of the shadow pipeline.
//          Each failure aborts the current operation; nothing is retried.
// =============================================================================

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// 1. ShadowRuntimeError - Main error enum
// =============================================================================

#[derive(Debug, Error)]
pub enum ShadowRuntimeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No measurement data: operation requires at least one snapshot")]
    EmptyData,

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Backend failure: {0}")]
    BackendFailure(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl ShadowRuntimeError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn shape_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }
}

// =============================================================================
// 2. BackendError - Sampling backend failures
// =============================================================================

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Sampling call failed at repetition {repetition}: {reason}")]
    SamplingFailed { repetition: usize, reason: String },

    #[error("Sampling call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed outcome: {0}")]
    MalformedOutcome(String),

    #[error("Unbound circuit parameter: {0}")]
    UnboundParameter(String),

    #[error("State preparation failed: {0}")]
    StatePreparation(String),

    #[error("Backend not available: {0}")]
    NotAvailable(String),

    #[error("Worker task failed: {0}")]
    WorkerFailed(String),
}

// =============================================================================
// 3. ConfigurationError - Options loading failures
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("TOML options could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON options could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Options file {path} could not be read: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported options file extension: {0}")]
    UnsupportedFormat(String),
}

// =============================================================================
// 4. Result alias
// =============================================================================

pub type ShadowResult<T> = Result<T, ShadowRuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = ShadowRuntimeError::shape_mismatch("observable qubits", 3, 2);
        let message = err.to_string();
        assert!(message.contains("observable qubits"));
        assert!(message.contains('3'));
        assert!(message.contains('2'));
    }

    #[test]
    fn test_backend_error_conversion() {
        let backend_err = BackendError::SamplingFailed {
            repetition: 4,
            reason: "device offline".to_string(),
        };
        let runtime_err: ShadowRuntimeError = backend_err.into();
        assert!(matches!(runtime_err, ShadowRuntimeError::BackendFailure(_)));
        assert!(runtime_err.to_string().contains("repetition 4"));
    }

    #[test]
    fn test_io_failure_is_configuration_error() {
        let err: ShadowRuntimeError = ConfigurationError::Io {
            path: "options.toml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(matches!(
            err,
            ShadowRuntimeError::Configuration(ConfigurationError::Io { .. })
        ));
        assert!(err.to_string().contains("options.toml"));
    }
}
