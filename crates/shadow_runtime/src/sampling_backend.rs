// =============================================================================
// Classical Shadows Runtime - Sampling Backend Interface
// =============================================================================
// Table of Contents:
//   1. StatePreparation - What the backend prepares before each measurement
//   2. ShadowSamplingBackend - Core backend trait
// =============================================================================
// Purpose: The seam between the shadow protocol and whatever prepares and
//          measures the quantum state: a simulator, a device or a test stub.
// =============================================================================

use crate::error::BackendError;
use crate::measurement_data::{MeasurementOutcome, PauliBasis};
use ndarray::Array1;
use num_complex::Complex64;
use std::collections::BTreeMap;

// =============================================================================
// 1. StatePreparation - What the backend prepares before each measurement
// =============================================================================

/// Forwarded to the backend unchanged on every sampling call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePreparation {
    pub parameter_values: BTreeMap<String, f64>,
    pub initial_state: Option<Array1<Complex64>>,
}

impl StatePreparation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameter_values.insert(name.into(), value);
        self
    }

    pub fn with_parameter_values(mut self, values: BTreeMap<String, f64>) -> Self {
        self.parameter_values.extend(values);
        self
    }

    pub fn with_initial_state(mut self, amplitudes: Array1<Complex64>) -> Self {
        self.initial_state = Some(amplitudes);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameter_values.get(name).copied()
    }
}

// =============================================================================
// 2. ShadowSamplingBackend - Core backend trait
// =============================================================================

pub trait ShadowSamplingBackend: Send + Sync {
    fn backend_name(&self) -> &str;

    fn number_of_quantum_bits(&self) -> usize;

    /// Prepares the state, rotates qubit `i` into `bases[i]` and measures
    /// `shots` times in the computational basis.
    ///
    /// One shot returns [`MeasurementOutcome::Bitstring`]; more return the
    /// empirical [`MeasurementOutcome::ProbabilityVector`] over all `2^n`
    /// outcomes.
    fn sample(
        &self,
        preparation: &StatePreparation,
        bases: &[PauliBasis],
        shots: usize,
    ) -> Result<MeasurementOutcome, BackendError>;
}
