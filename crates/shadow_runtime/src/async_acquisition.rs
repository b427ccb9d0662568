// =============================================================================
// Classical Shadows Runtime - Async Snapshot Acquisition
// =============================================================================
// Table of Contents:
//   1. AsyncSnapshotAcquirer - Tokio-driven acquisition
// =============================================================================
// Purpose: Dispatches sampling calls as blocking tasks on the tokio runtime,
//          bounded by a semaphore, with an optional per-call timeout. Same
//          all-or-nothing contract as the sequential acquirer.
// =============================================================================

use crate::acquisition::{basis_rng, random_bases, sample_repetition, validate_request};
use crate::error::{BackendError, ShadowResult};
use crate::measurement_data::{MeasurementData, MeasurementOutcome};
use crate::sampling_backend::{ShadowSamplingBackend, StatePreparation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{info, warn};

// =============================================================================
// 1. AsyncSnapshotAcquirer - Tokio-driven acquisition
// =============================================================================

pub struct AsyncSnapshotAcquirer {
    backend: Arc<dyn ShadowSamplingBackend>,
    seed: Option<u64>,
    max_concurrent_calls: usize,
    call_semaphore: Arc<Semaphore>,
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for AsyncSnapshotAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSnapshotAcquirer")
            .field("backend", &self.backend.backend_name())
            .field("seed", &self.seed)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl AsyncSnapshotAcquirer {
    /// One concurrent sampling call per CPU.
    pub fn new(backend: Arc<dyn ShadowSamplingBackend>) -> Self {
        let max_concurrent_calls = num_cpus::get().max(1);
        Self {
            backend,
            seed: None,
            max_concurrent_calls,
            call_semaphore: Arc::new(Semaphore::new(max_concurrent_calls)),
            call_timeout: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_concurrent_calls(mut self, max_concurrent_calls: usize) -> Self {
        self.max_concurrent_calls = max_concurrent_calls.max(1);
        self.call_semaphore = Arc::new(Semaphore::new(self.max_concurrent_calls));
        self
    }

    /// Bounds how long `acquire` waits for each sampling call. A call that
    /// times out is not interrupted: its blocking task runs to completion in
    /// the background and its outcome is discarded.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = Some(call_timeout);
        self
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    pub async fn acquire(
        &self,
        preparation: &StatePreparation,
        shadow_size: usize,
        n_shots: usize,
    ) -> ShadowResult<MeasurementData> {
        let number_of_quantum_bits = self.backend.number_of_quantum_bits();
        validate_request(shadow_size, n_shots, number_of_quantum_bits)?;
        let started = Instant::now();

        let bases = {
            let mut rng = basis_rng(self.seed);
            random_bases(&mut rng, shadow_size, number_of_quantum_bits)
        };
        let preparation = Arc::new(preparation.clone());

        let mut tasks = JoinSet::new();
        for (repetition, repetition_bases) in bases.iter().cloned().enumerate() {
            let backend = Arc::clone(&self.backend);
            let preparation = Arc::clone(&preparation);
            let semaphore = Arc::clone(&self.call_semaphore);
            let call_timeout = self.call_timeout;

            tasks.spawn(async move {
                let permit = semaphore.acquire_owned().await.map_err(|_| {
                    BackendError::NotAvailable("sampling semaphore closed".to_string())
                })?;
                let call = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    sample_repetition(
                        backend.as_ref(),
                        &preparation,
                        repetition,
                        &repetition_bases,
                        n_shots,
                    )
                });
                let joined = match call_timeout {
                    Some(limit) => timeout(limit, call)
                        .await
                        .map_err(|_| BackendError::Timeout(limit))?,
                    None => call.await,
                };
                let outcome = joined.map_err(|e| BackendError::WorkerFailed(e.to_string()))??;
                Ok::<_, BackendError>((repetition, outcome))
            });
        }

        let mut samples: Vec<Option<MeasurementOutcome>> = vec![None; shadow_size];
        while let Some(joined) = tasks.join_next().await {
            let finished = joined
                .map_err(|e| BackendError::WorkerFailed(e.to_string()))
                .and_then(|result| result);
            match finished {
                Ok((repetition, outcome)) => samples[repetition] = Some(outcome),
                Err(error) => {
                    warn!(%error, "aborting asynchronous acquisition");
                    // Calls already inside `spawn_blocking` still finish; their results are dropped.
                    tasks.abort_all();
                    return Err(error.into());
                }
            }
        }

        let samples = samples
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                BackendError::WorkerFailed("acquisition finished with missing repetitions".into())
            })?;

        let data = MeasurementData::new(bases, samples)?;
        info!(
            acquisition_id = %data.acquisition_id(),
            backend = self.backend.backend_name(),
            shadow_size,
            n_shots,
            max_concurrent_calls = self.max_concurrent_calls,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "acquired classical shadow asynchronously"
        );
        Ok(data)
    }
}
