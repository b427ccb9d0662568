// =============================================================================
// Classical Shadows Runtime - State Vector Sampling Backend
// =============================================================================
// Table of Contents:
//   1. SimulatorConfiguration - Serializable backend settings
//   2. StateVectorSamplingBackend - ShadowSamplingBackend implementation
// =============================================================================
// Purpose: Reference backend for the shadow protocol. Prepares a dense state
//          from a circuit (or a supplied input state), rotates each qubit
//          into its requested Pauli basis and samples computational-basis
//          outcomes.
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::error::CircuitError;
use crate::state_backend::QuantumStateVector;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shadow_runtime::error::BackendError;
use shadow_runtime::measurement_data::{MeasurementOutcome, PauliBasis};
use shadow_runtime::sampling_backend::{ShadowSamplingBackend, StatePreparation};
use shadow_runtime::snapshot::basis_rotation_matrix;
use tracing::trace;

// =============================================================================
// 1. SimulatorConfiguration - Serializable backend settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfiguration {
    pub backend_name: String,
    /// Seeds the shot sampler; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfiguration {
    fn default() -> Self {
        Self {
            backend_name: "state_vector_simulator".to_string(),
            seed: None,
        }
    }
}

// =============================================================================
// 2. StateVectorSamplingBackend - ShadowSamplingBackend implementation
// =============================================================================

#[derive(Debug)]
pub struct StateVectorSamplingBackend {
    circuit: QuantumCircuitStructure,
    configuration: SimulatorConfiguration,
    rng: Mutex<StdRng>,
}

impl StateVectorSamplingBackend {
    pub fn new(circuit: QuantumCircuitStructure) -> Self {
        Self::with_configuration(circuit, SimulatorConfiguration::default())
    }

    pub fn with_configuration(
        circuit: QuantumCircuitStructure,
        configuration: SimulatorConfiguration,
    ) -> Self {
        let rng = match configuration.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            circuit,
            configuration,
            rng: Mutex::new(rng),
        }
    }

    /// Identity circuit: the prepared state is `|0…0⟩` or the supplied
    /// input state.
    pub fn identity(number_of_quantum_bits: usize) -> Self {
        Self::new(QuantumCircuitStructure::new(number_of_quantum_bits))
    }

    pub fn with_seed(self, seed: u64) -> Self {
        let configuration = SimulatorConfiguration {
            seed: Some(seed),
            ..self.configuration
        };
        Self::with_configuration(self.circuit, configuration)
    }

    pub fn circuit(&self) -> &QuantumCircuitStructure {
        &self.circuit
    }

    pub fn configuration(&self) -> &SimulatorConfiguration {
        &self.configuration
    }

    /// Input state (or `|0…0⟩`) followed by the circuit.
    pub fn prepare_state(&self, preparation: &StatePreparation) -> Result<QuantumStateVector, CircuitError> {
        let number_of_quantum_bits = self.circuit.number_of_quantum_bits();
        let mut state = match &preparation.initial_state {
            Some(amplitudes) => {
                let expected = 1usize << number_of_quantum_bits;
                if amplitudes.len() != expected {
                    return Err(CircuitError::DimensionMismatch {
                        expected,
                        actual: amplitudes.len(),
                    });
                }
                QuantumStateVector::from_amplitudes(amplitudes.to_vec())?
            }
            None => QuantumStateVector::zero_state(number_of_quantum_bits),
        };
        self.circuit
            .execute_on(&mut state, &preparation.parameter_values)?;
        Ok(state)
    }

    fn rotate_into_bases(
        state: &mut QuantumStateVector,
        bases: &[PauliBasis],
    ) -> Result<(), CircuitError> {
        for (qubit, &basis) in bases.iter().enumerate() {
            if basis != PauliBasis::Z {
                state.apply_single_qubit_matrix(qubit, &basis_rotation_matrix(basis))?;
            }
        }
        Ok(())
    }
}

impl ShadowSamplingBackend for StateVectorSamplingBackend {
    fn backend_name(&self) -> &str {
        &self.configuration.backend_name
    }

    fn number_of_quantum_bits(&self) -> usize {
        self.circuit.number_of_quantum_bits()
    }

    fn sample(
        &self,
        preparation: &StatePreparation,
        bases: &[PauliBasis],
        shots: usize,
    ) -> Result<MeasurementOutcome, BackendError> {
        let number_of_quantum_bits = self.number_of_quantum_bits();
        if bases.len() != number_of_quantum_bits {
            return Err(BackendError::StatePreparation(format!(
                "{} measurement bases for a {number_of_quantum_bits}-qubit backend",
                bases.len()
            )));
        }
        if shots == 0 {
            return Err(BackendError::StatePreparation(
                "at least one shot is required".to_string(),
            ));
        }

        let mut state = self.prepare_state(preparation)?;
        Self::rotate_into_bases(&mut state, bases)?;

        let draws: Vec<Vec<u8>> = {
            let mut rng = self.rng.lock();
            (0..shots)
                .map(|_| state.sample_bitstring(rng.random::<f64>()))
                .collect()
        };
        trace!(shots, ?bases, "sampled rotated state");

        if shots == 1 {
            let bits = draws.into_iter().next().unwrap_or_default();
            return Ok(MeasurementOutcome::Bitstring(bits));
        }
        MeasurementOutcome::from_shots(number_of_quantum_bits, &draws)
            .map_err(|e| BackendError::MalformedOutcome(e.to_string()))
    }
}
