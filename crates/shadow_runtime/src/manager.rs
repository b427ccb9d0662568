// =============================================================================
// Classical Shadows Runtime - Measurement Managers
// =============================================================================
// Table of Contents:
//   1. MeasurementManager - Protocol lifecycle trait
//   2. ShadowMeasurementManager - Classical shadow protocol
//   3. ShadowManagerBuilder - Construction and validation
// =============================================================================
// Purpose: Ties options, backend, observables and recorded data together:
//          validate inputs, acquire samples, then answer expectation and
//          state queries from the stored data.
// =============================================================================

use crate::acquisition::SnapshotAcquirer;
use crate::error::{ShadowResult, ShadowRuntimeError};
use crate::estimation::{ReconstructedState, ShadowEstimator};
use crate::measurement_data::{MeasurementData, OutcomeKind};
use crate::observable::ObservableHandle;
use crate::options::{ProtocolOptions, ShadowOptions};
use crate::sample_size::{groups_for_confidence, shadow_size_for_accuracy};
use crate::sampling_backend::{ShadowSamplingBackend, StatePreparation};
use ndarray::Array1;
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// 1. MeasurementManager - Protocol lifecycle trait
// =============================================================================

/// Lifecycle shared by measurement protocols. Reads never trigger
/// acquisition; a failing call leaves the manager unchanged.
pub trait MeasurementManager {
    type Options;

    fn validate_options(options: &ProtocolOptions) -> ShadowResult<Self::Options>
    where
        Self: Sized;

    /// Returns the data unchanged when it fits the configuration.
    fn validate_data(&self, data: MeasurementData) -> ShadowResult<MeasurementData>;

    fn measure(&mut self) -> ShadowResult<Arc<MeasurementData>>;

    /// `None` estimates the observables the manager was built with.
    fn expectation(&self, observables: Option<&[ObservableHandle]>) -> ShadowResult<Vec<f64>>;

    fn reconstruct_state(&self) -> ShadowResult<ReconstructedState> {
        Err(ShadowRuntimeError::NotSupported(
            "state reconstruction is not offered by this protocol".to_string(),
        ))
    }
}

// =============================================================================
// 2. ShadowMeasurementManager - Classical shadow protocol
// =============================================================================

pub struct ShadowMeasurementManager {
    options: ShadowOptions,
    backend: Option<Arc<dyn ShadowSamplingBackend>>,
    observables: Vec<ObservableHandle>,
    preparation: StatePreparation,
    estimator: ShadowEstimator,
    data: Arc<MeasurementData>,
}

impl std::fmt::Debug for ShadowMeasurementManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowMeasurementManager")
            .field("options", &self.options)
            .field(
                "backend",
                &self.backend.as_ref().map(|backend| backend.backend_name().to_string()),
            )
            .field("observables", &self.observables.len())
            .field("shadow_size", &self.data.shadow_size())
            .finish()
    }
}

impl ShadowMeasurementManager {
    pub fn builder() -> ShadowManagerBuilder {
        ShadowManagerBuilder::default()
    }

    pub fn options(&self) -> &ShadowOptions {
        &self.options
    }

    pub fn observables(&self) -> &[ObservableHandle] {
        &self.observables
    }

    pub fn state_preparation(&self) -> &StatePreparation {
        &self.preparation
    }

    /// Currently stored data; empty until measured or supplied.
    pub fn measurement_data(&self) -> Arc<MeasurementData> {
        Arc::clone(&self.data)
    }

    /// Validates `data` and stores it; the previous data stays on failure.
    pub fn replace_data(&mut self, data: MeasurementData) -> ShadowResult<Arc<MeasurementData>> {
        let data = Arc::new(self.validate_data(data)?);
        self.data = Arc::clone(&data);
        Ok(data)
    }

    /// Configured `shadow_size`, else the accuracy-derived size for the
    /// configured observables.
    pub fn target_shadow_size(&self) -> ShadowResult<usize> {
        match (self.options.shadow_size(), self.options.accuracy()) {
            (Some(shadow_size), _) => Ok(shadow_size),
            (None, Some(accuracy)) => shadow_size_for_accuracy(&self.observables, accuracy),
            (None, None) => Err(ShadowRuntimeError::invalid_argument(
                "no `shadow_size` or `accuracy` configured",
            )),
        }
    }

    /// Configured `shadow_medians`, else the confidence-derived group count.
    pub fn median_of_means_groups(&self, number_of_observables: usize) -> ShadowResult<usize> {
        match (self.options.shadow_medians(), self.options.confidence()) {
            (Some(shadow_medians), _) => Ok(shadow_medians),
            (None, Some(confidence)) => groups_for_confidence(number_of_observables, confidence),
            (None, None) => Err(ShadowRuntimeError::invalid_argument(
                "no `shadow_medians` or `confidence` configured",
            )),
        }
    }

    fn check_qubit_count(&self, context: &'static str, actual: usize) -> ShadowResult<()> {
        if let Some(backend) = &self.backend {
            if backend.number_of_quantum_bits() != actual {
                return Err(ShadowRuntimeError::shape_mismatch(
                    context,
                    backend.number_of_quantum_bits(),
                    actual,
                ));
            }
        }
        Ok(())
    }
}

impl MeasurementManager for ShadowMeasurementManager {
    type Options = ShadowOptions;

    fn validate_options(options: &ProtocolOptions) -> ShadowResult<ShadowOptions> {
        ShadowOptions::from_protocol_options(options)
    }

    fn validate_data(&self, data: MeasurementData) -> ShadowResult<MeasurementData> {
        if data.is_empty() {
            return Ok(data);
        }
        if let Some(shadow_size) = self.options.shadow_size() {
            if data.shadow_size() != shadow_size {
                return Err(ShadowRuntimeError::shape_mismatch(
                    "shadow size",
                    shadow_size,
                    data.shadow_size(),
                ));
            }
        }

        let expected_kind = if self.options.n_shots() == 1 {
            OutcomeKind::SingleShot
        } else {
            OutcomeKind::MultiShot
        };
        if data.outcome_kind() != Some(expected_kind) {
            return Err(ShadowRuntimeError::invalid_argument(format!(
                "data holds {:?} outcomes but the protocol is configured for {} shot(s)",
                data.outcome_kind(),
                self.options.n_shots()
            )));
        }

        let number_of_quantum_bits = data.number_of_quantum_bits();
        self.check_qubit_count("data qubit count", number_of_quantum_bits)?;
        if let Some(calibration) = self.options.calibration() {
            if calibration.len() != number_of_quantum_bits {
                return Err(ShadowRuntimeError::shape_mismatch(
                    "calibration coefficients",
                    number_of_quantum_bits,
                    calibration.len(),
                ));
            }
        }
        Ok(data)
    }

    fn measure(&mut self) -> ShadowResult<Arc<MeasurementData>> {
        let backend = self.backend.clone().ok_or_else(|| {
            ShadowRuntimeError::invalid_argument("measuring requires a sampling backend")
        })?;
        let shadow_size = self.target_shadow_size()?;

        let acquirer = SnapshotAcquirer::new(backend).with_seed(self.options.seed());
        let data = acquirer.acquire(&self.preparation, shadow_size, self.options.n_shots())?;
        let data = self.replace_data(data)?;
        info!(
            acquisition_id = %data.acquisition_id(),
            shadow_size = data.shadow_size(),
            number_of_quantum_bits = data.number_of_quantum_bits(),
            "stored classical shadow measurement data"
        );
        Ok(data)
    }

    fn expectation(&self, observables: Option<&[ObservableHandle]>) -> ShadowResult<Vec<f64>> {
        let observables = observables.unwrap_or(self.observables.as_slice());
        if observables.is_empty() {
            return Err(ShadowRuntimeError::invalid_argument(
                "no observables to estimate",
            ));
        }
        if self.data.is_empty() {
            return Err(ShadowRuntimeError::EmptyData);
        }
        let groups = self.median_of_means_groups(observables.len())?;
        self.estimator
            .expectation_values(&self.data, observables, groups)
    }

    fn reconstruct_state(&self) -> ShadowResult<ReconstructedState> {
        self.estimator.reconstruct_state(&self.data)
    }
}

// =============================================================================
// 3. ShadowManagerBuilder - Construction and validation
// =============================================================================

#[derive(Default)]
pub struct ShadowManagerBuilder {
    options: ProtocolOptions,
    backend: Option<Arc<dyn ShadowSamplingBackend>>,
    observables: Vec<ObservableHandle>,
    parameter_values: BTreeMap<String, f64>,
    initial_state: Option<Array1<Complex64>>,
    data: Option<MeasurementData>,
}

impl ShadowManagerBuilder {
    pub fn with_options(mut self, options: ProtocolOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ShadowSamplingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_observable(mut self, observable: ObservableHandle) -> Self {
        self.observables.push(observable);
        self
    }

    pub fn with_observables(mut self, observables: impl IntoIterator<Item = ObservableHandle>) -> Self {
        self.observables.extend(observables);
        self
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

    pub fn with_measurement_data(mut self, data: MeasurementData) -> Self {
        self.data = Some(data);
        self
    }

    /// Validates options first, then observables against the backend, then
    /// any supplied data.
    pub fn build(self) -> ShadowResult<ShadowMeasurementManager> {
        let options = ShadowMeasurementManager::validate_options(&self.options)?;
        let estimator = ShadowEstimator::new().with_inverse_channel(options.inverse_channel());
        let mut preparation = StatePreparation::new().with_parameter_values(self.parameter_values);
        preparation.initial_state = self.initial_state;

        let mut manager = ShadowMeasurementManager {
            options,
            backend: self.backend,
            observables: self.observables,
            preparation,
            estimator,
            data: Arc::new(MeasurementData::empty()),
        };
        for observable in &manager.observables {
            manager.check_qubit_count("observable qubit count", observable.number_of_quantum_bits())?;
        }
        if let Some(calibration) = manager.options.calibration() {
            manager.check_qubit_count("calibration coefficients", calibration.len())?;
        }
        if let Some(data) = self.data {
            manager.replace_data(data)?;
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::measurement_data::{MeasurementOutcome, PauliBasis};
    use crate::observable::PauliSumObservable;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Every qubit always reads 0; `failing` switches it to an error.
    struct ZeroStateBackend {
        number_of_quantum_bits: usize,
        failing: AtomicBool,
    }

    impl ZeroStateBackend {
        fn new(number_of_quantum_bits: usize) -> Arc<Self> {
            Arc::new(Self {
                number_of_quantum_bits,
                failing: AtomicBool::new(false),
            })
        }
    }

    impl ShadowSamplingBackend for ZeroStateBackend {
        fn backend_name(&self) -> &str {
            "zero_state"
        }

        fn number_of_quantum_bits(&self) -> usize {
            self.number_of_quantum_bits
        }

        fn sample(
            &self,
            _preparation: &StatePreparation,
            bases: &[PauliBasis],
            _shots: usize,
        ) -> Result<MeasurementOutcome, BackendError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BackendError::NotAvailable("switched off".to_string()));
            }
            Ok(MeasurementOutcome::Bitstring(vec![0; bases.len()]))
        }
    }

    /// Protocol that only records data, to exercise the trait defaults.
    struct RecordOnlyProtocol {
        data: Arc<MeasurementData>,
    }

    impl MeasurementManager for RecordOnlyProtocol {
        type Options = ();

        fn validate_options(_options: &ProtocolOptions) -> ShadowResult<()> {
            Ok(())
        }

        fn validate_data(&self, data: MeasurementData) -> ShadowResult<MeasurementData> {
            Ok(data)
        }

        fn measure(&mut self) -> ShadowResult<Arc<MeasurementData>> {
            Ok(Arc::clone(&self.data))
        }

        fn expectation(&self, _observables: Option<&[ObservableHandle]>) -> ShadowResult<Vec<f64>> {
            Err(ShadowRuntimeError::EmptyData)
        }
    }

    fn z_observable() -> ObservableHandle {
        PauliSumObservable::pauli_z(1, 0).unwrap().into_handle()
    }

    fn balanced_zero_state_data() -> MeasurementData {
        let mut unitaries = Vec::new();
        let mut samples = Vec::new();
        for (basis, bit) in [
            (PauliBasis::Z, 0u8),
            (PauliBasis::X, 0),
            (PauliBasis::X, 1),
            (PauliBasis::Y, 0),
            (PauliBasis::Y, 1),
            (PauliBasis::Z, 0),
        ] {
            unitaries.push(vec![basis]);
            samples.push(MeasurementOutcome::Bitstring(vec![bit]));
        }
        MeasurementData::new(unitaries, samples).unwrap()
    }

    #[test]
    fn test_default_reconstruction_is_not_supported() {
        let protocol = RecordOnlyProtocol {
            data: Arc::new(MeasurementData::empty()),
        };
        assert!(matches!(
            protocol.reconstruct_state(),
            Err(ShadowRuntimeError::NotSupported(_))
        ));
    }

    #[test]
    fn test_invalid_options_produce_no_manager() {
        let result = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_accuracy(0.1))
            .build();
        assert!(matches!(result, Err(ShadowRuntimeError::InvalidArgument(_))));
    }

    #[test]
    fn test_supplied_data_is_validated() {
        let options = ProtocolOptions::new().with_shadow_size(6).with_shadow_medians(1);
        let manager = ShadowMeasurementManager::builder()
            .with_options(options.clone())
            .with_observable(z_observable())
            .with_measurement_data(balanced_zero_state_data())
            .build()
            .unwrap();
        assert_eq!(manager.measurement_data().shadow_size(), 6);
        let estimates = manager.expectation(None).unwrap();
        assert!((estimates[0] - 1.0).abs() < 1e-10);

        let wrong_size = ShadowMeasurementManager::builder()
            .with_options(options.with_shadow_size(10))
            .with_measurement_data(balanced_zero_state_data())
            .build();
        assert!(matches!(
            wrong_size,
            Err(ShadowRuntimeError::ShapeMismatch { expected: 10, actual: 6, .. })
        ));
    }

    #[test]
    fn test_outcome_kind_must_match_shots() {
        let manager = ShadowMeasurementManager::builder()
            .with_options(
                ProtocolOptions::new()
                    .with_shadow_size(6)
                    .with_shadow_medians(1)
                    .with_shots(10),
            )
            .build()
            .unwrap();
        assert!(matches!(
            manager.validate_data(balanced_zero_state_data()),
            Err(ShadowRuntimeError::InvalidArgument(_))
        ));
        assert!(manager.validate_data(MeasurementData::empty()).is_ok());
    }

    #[test]
    fn test_calibration_length_checked() {
        let manager = ShadowMeasurementManager::builder()
            .with_options(
                ProtocolOptions::new()
                    .with_shadow_size(6)
                    .with_shadow_medians(1)
                    .with_calibration(vec![0.3, 0.3]),
            )
            .build()
            .unwrap();
        assert!(matches!(
            manager.validate_data(balanced_zero_state_data()),
            Err(ShadowRuntimeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_calibration_checked_against_backend_at_build() {
        let result = ShadowMeasurementManager::builder()
            .with_options(
                ProtocolOptions::new()
                    .with_shadow_size(6)
                    .with_shadow_medians(1)
                    .with_calibration(vec![0.3; 3]),
            )
            .with_backend(ZeroStateBackend::new(2))
            .build();
        assert!(matches!(
            result,
            Err(ShadowRuntimeError::ShapeMismatch { expected: 2, actual: 3, .. })
        ));

        let matching = ShadowMeasurementManager::builder()
            .with_options(
                ProtocolOptions::new()
                    .with_shadow_size(6)
                    .with_shadow_medians(1)
                    .with_calibration(vec![0.3; 2]),
            )
            .with_backend(ZeroStateBackend::new(2))
            .build();
        assert!(matching.is_ok());
    }

    #[test]
    fn test_reads_before_measuring() {
        let manager = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_accuracy(0.1).with_confidence(0.1))
            .with_observable(z_observable())
            .build()
            .unwrap();
        assert!(matches!(manager.expectation(None), Err(ShadowRuntimeError::EmptyData)));
        assert!(matches!(manager.reconstruct_state(), Err(ShadowRuntimeError::EmptyData)));
        assert!(matches!(
            manager.expectation(Some(&[] as &[ObservableHandle])),
            Err(ShadowRuntimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_measure_requires_backend() {
        let mut manager = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_shadow_size(5).with_shadow_medians(1))
            .build()
            .unwrap();
        assert!(matches!(manager.measure(), Err(ShadowRuntimeError::InvalidArgument(_))));
    }

    #[test]
    fn test_measure_then_estimate_zero_state() {
        let mut manager = ShadowMeasurementManager::builder()
            .with_options(
                ProtocolOptions::new()
                    .with_shadow_size(3000)
                    .with_confidence(0.1)
                    .with_seed(8),
            )
            .with_backend(ZeroStateBackend::new(1))
            .with_observable(z_observable())
            .build()
            .unwrap();
        let data = manager.measure().unwrap();
        assert_eq!(data.shadow_size(), 3000);

        let estimates = manager.expectation(None).unwrap();
        assert!((estimates[0] - 1.0).abs() < 0.15, "{}", estimates[0]);

        let state = manager.reconstruct_state().unwrap();
        assert!((state.trace().re - 1.0).abs() < 1e-9);
        assert!((state.density_matrix()[[0, 0]].re - 1.0).abs() < 0.15);
    }

    #[test]
    fn test_failed_measure_keeps_previous_data() {
        let backend = ZeroStateBackend::new(1);
        let mut manager = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_shadow_size(6).with_shadow_medians(1))
            .with_backend(backend.clone())
            .with_observable(z_observable())
            .build()
            .unwrap();
        let first = manager.measure().unwrap();

        backend.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.measure(),
            Err(ShadowRuntimeError::BackendFailure(BackendError::NotAvailable(_)))
        ));
        assert_eq!(manager.measurement_data().acquisition_id(), first.acquisition_id());

        let mismatched = MeasurementData::new(
            vec![vec![PauliBasis::Z, PauliBasis::Z]; 6],
            vec![MeasurementOutcome::Bitstring(vec![0, 0]); 6],
        )
        .unwrap();
        assert!(manager.replace_data(mismatched).is_err());
        assert_eq!(manager.measurement_data().acquisition_id(), first.acquisition_id());
    }

    #[test]
    fn test_observable_qubits_checked_against_backend() {
        let result = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_shadow_size(6).with_shadow_medians(1))
            .with_backend(ZeroStateBackend::new(2))
            .with_observable(z_observable())
            .build();
        assert!(matches!(result, Err(ShadowRuntimeError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_accuracy_derived_shadow_size() {
        let manager = ShadowMeasurementManager::builder()
            .with_options(ProtocolOptions::new().with_accuracy(0.1).with_shadow_medians(4))
            .with_observable(z_observable())
            .build()
            .unwrap();
        assert_eq!(manager.target_shadow_size().unwrap(), 10200);
        assert_eq!(manager.median_of_means_groups(1).unwrap(), 4);
    }
}
