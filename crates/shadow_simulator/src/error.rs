// =============================================================================
// Classical Shadows Runtime - Simulator Errors
// =============================================================================
// Table of Contents:
//   1. CircuitError - State preparation failures
//   2. Conversion into BackendError
// =============================================================================

use shadow_runtime::error::BackendError;
use thiserror::Error;

// =============================================================================
// 1. CircuitError - State preparation failures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CircuitError {
    #[error("Qubit {qubit} out of range for a {number_of_quantum_bits}-qubit register")]
    QubitOutOfRange {
        qubit: usize,
        number_of_quantum_bits: usize,
    },

    #[error("Control and target coincide on qubit {0}")]
    ControlEqualsTarget(usize),

    #[error("Unbound circuit parameter: {0}")]
    UnboundParameter(String),

    #[error("State vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid state vector: {0}")]
    InvalidStateVector(String),
}

pub type CircuitResult<T> = Result<T, CircuitError>;

// =============================================================================
// 2. Conversion into BackendError
// =============================================================================

impl From<CircuitError> for BackendError {
    fn from(error: CircuitError) -> Self {
        match error {
            CircuitError::UnboundParameter(name) => BackendError::UnboundParameter(name),
            other => BackendError::StatePreparation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_conversion() {
        let unbound: BackendError = CircuitError::UnboundParameter("theta".into()).into();
        assert!(matches!(unbound, BackendError::UnboundParameter(name) if name == "theta"));

        let range: BackendError = CircuitError::QubitOutOfRange {
            qubit: 4,
            number_of_quantum_bits: 2,
        }
        .into();
        assert!(matches!(range, BackendError::StatePreparation(message) if message.contains("Qubit 4")));
    }
}
