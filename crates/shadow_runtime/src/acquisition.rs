// =============================================================================
// Classical Shadows Runtime - Snapshot Acquisition
// =============================================================================
// Table of Contents:
//   1. Basis drawing
//   2. SnapshotAcquirer - Sequential and parallel acquisition
//   3. Outcome checks shared by every acquisition driver
// =============================================================================
// Purpose: The only side-effecting step of the protocol. Draws a random
//          Pauli basis per qubit per repetition, asks the backend for one
//          outcome per repetition and records the pairs. Acquisition is
//          all-or-nothing: the first failing call aborts the run.
// =============================================================================

use crate::error::{BackendError, ShadowResult, ShadowRuntimeError};
use crate::measurement_data::{MeasurementData, MeasurementOutcome, OutcomeKind, PauliBasis};
use crate::sampling_backend::{ShadowSamplingBackend, StatePreparation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

// =============================================================================
// 1. Basis drawing
// =============================================================================

/// `shadow_size` rows of `number_of_quantum_bits` i.i.d. uniform bases.
pub fn random_bases<R: Rng>(
    rng: &mut R,
    shadow_size: usize,
    number_of_quantum_bits: usize,
) -> Vec<Vec<PauliBasis>> {
    (0..shadow_size)
        .map(|_| {
            (0..number_of_quantum_bits)
                .map(|_| rng.random::<PauliBasis>())
                .collect()
        })
        .collect()
}

pub(crate) fn basis_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

// =============================================================================
// 2. SnapshotAcquirer - Sequential and parallel acquisition
// =============================================================================

#[derive(Clone)]
pub struct SnapshotAcquirer {
    backend: Arc<dyn ShadowSamplingBackend>,
    seed: Option<u64>,
}

impl std::fmt::Debug for SnapshotAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotAcquirer")
            .field("backend", &self.backend.backend_name())
            .field("seed", &self.seed)
            .finish()
    }
}

impl SnapshotAcquirer {
    pub fn new(backend: Arc<dyn ShadowSamplingBackend>) -> Self {
        Self { backend, seed: None }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ShadowSamplingBackend> {
        &self.backend
    }

    /// Draws every basis up front so a seed fixes them independently of
    /// the order in which repetitions are dispatched.
    pub fn draw_bases(&self, shadow_size: usize) -> Vec<Vec<PauliBasis>> {
        let mut rng = basis_rng(self.seed);
        random_bases(&mut rng, shadow_size, self.backend.number_of_quantum_bits())
    }

    pub fn acquire(
        &self,
        preparation: &StatePreparation,
        shadow_size: usize,
        n_shots: usize,
    ) -> ShadowResult<MeasurementData> {
        validate_request(shadow_size, n_shots, self.backend.number_of_quantum_bits())?;
        let started = Instant::now();
        let bases = self.draw_bases(shadow_size);

        let samples = bases
            .iter()
            .enumerate()
            .map(|(repetition, repetition_bases)| {
                sample_repetition(
                    self.backend.as_ref(),
                    preparation,
                    repetition,
                    repetition_bases,
                    n_shots,
                )
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        let data = MeasurementData::new(bases, samples)?;
        info!(
            acquisition_id = %data.acquisition_id(),
            backend = self.backend.backend_name(),
            shadow_size,
            n_shots,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "acquired classical shadow"
        );
        Ok(data)
    }

    /// Same contract as [`SnapshotAcquirer::acquire`], with repetitions
    /// dispatched on the rayon pool. Outcomes keep repetition order.
    #[cfg(feature = "parallel_acquisition")]
    pub fn acquire_parallel(
        &self,
        preparation: &StatePreparation,
        shadow_size: usize,
        n_shots: usize,
    ) -> ShadowResult<MeasurementData> {
        use rayon::prelude::*;

        validate_request(shadow_size, n_shots, self.backend.number_of_quantum_bits())?;
        let started = Instant::now();
        let bases = self.draw_bases(shadow_size);

        let samples = bases
            .par_iter()
            .enumerate()
            .map(|(repetition, repetition_bases)| {
                sample_repetition(
                    self.backend.as_ref(),
                    preparation,
                    repetition,
                    repetition_bases,
                    n_shots,
                )
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        let data = MeasurementData::new(bases, samples)?;
        info!(
            acquisition_id = %data.acquisition_id(),
            backend = self.backend.backend_name(),
            shadow_size,
            n_shots,
            threads = rayon::current_num_threads(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "acquired classical shadow in parallel"
        );
        Ok(data)
    }
}

// =============================================================================
// 3. Outcome checks shared by every acquisition driver
// =============================================================================

pub(crate) fn validate_request(
    shadow_size: usize,
    n_shots: usize,
    number_of_quantum_bits: usize,
) -> ShadowResult<()> {
    if shadow_size == 0 {
        return Err(ShadowRuntimeError::invalid_argument(
            "shadow size must be at least 1",
        ));
    }
    if n_shots == 0 {
        return Err(ShadowRuntimeError::invalid_argument(
            "number of shots must be at least 1",
        ));
    }
    if number_of_quantum_bits == 0 {
        return Err(ShadowRuntimeError::invalid_argument(
            "backend reports zero qubits",
        ));
    }
    Ok(())
}

pub(crate) fn sample_repetition(
    backend: &dyn ShadowSamplingBackend,
    preparation: &StatePreparation,
    repetition: usize,
    bases: &[PauliBasis],
    n_shots: usize,
) -> Result<MeasurementOutcome, BackendError> {
    let outcome = backend
        .sample(preparation, bases, n_shots)
        .inspect_err(|error| {
            warn!(repetition, backend = backend.backend_name(), %error, "sampling call failed");
        })?;
    check_outcome(outcome, repetition, bases.len(), n_shots)
}

/// Rejects outcomes whose kind or dimension disagrees with the request.
pub(crate) fn check_outcome(
    outcome: MeasurementOutcome,
    repetition: usize,
    number_of_quantum_bits: usize,
    n_shots: usize,
) -> Result<MeasurementOutcome, BackendError> {
    let expected_kind = if n_shots == 1 {
        OutcomeKind::SingleShot
    } else {
        OutcomeKind::MultiShot
    };
    if outcome.kind() != expected_kind {
        return Err(BackendError::MalformedOutcome(format!(
            "repetition {repetition}: expected {expected_kind:?} outcome for {n_shots} shot(s), got {:?}",
            outcome.kind()
        )));
    }
    outcome
        .validate(number_of_quantum_bits)
        .map_err(|e| BackendError::MalformedOutcome(format!("repetition {repetition}: {e}")))?;
    Ok(outcome)
}
