// =============================================================================
// Classical Shadows Runtime - Shadow Estimation
// =============================================================================
// Table of Contents:
//   1. median_of_means - Robust aggregation
//   2. ShadowEstimator - Expectation values from snapshots
//   3. ReconstructedState - Averaged density operator
// =============================================================================
// Purpose: Pure reductions over recorded measurement data. Expectation
//          values use median-of-means over contiguous groups; state
//          reconstruction uses the plain mean of all snapshots.
// =============================================================================

use crate::error::{ShadowResult, ShadowRuntimeError};
use crate::measurement_data::{MeasurementData, outcome_space_dimension};
use crate::observable::{ObservableHandle, ShadowObservableInterface, trace_of_product};
use crate::sample_size::group_boundaries;
use crate::snapshot::{InverseChannel, ShadowSnapshot};
use ndarray::Array2;
use num_complex::Complex64;
use std::cmp::Ordering;

// =============================================================================
// 1. median_of_means - Robust aggregation
// =============================================================================

/// Median of the means of `groups` contiguous near-equal slices of `values`.
///
/// `groups` is clamped to `values.len()`. The median of an even number of
/// group means is the average of the two central means.
pub fn median_of_means(values: &[f64], groups: usize) -> ShadowResult<f64> {
    if values.is_empty() {
        return Err(ShadowRuntimeError::EmptyData);
    }
    if groups == 0 {
        return Err(ShadowRuntimeError::invalid_argument(
            "median-of-means needs at least one group",
        ));
    }
    let groups = groups.min(values.len());

    let mut means: Vec<f64> = group_boundaries(values.len(), groups)
        .into_iter()
        .map(|range| {
            let size = range.len() as f64;
            values[range].iter().sum::<f64>() / size
        })
        .collect();
    means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let middle = means.len() / 2;
    if means.len() % 2 == 1 {
        Ok(means[middle])
    } else {
        Ok(0.5 * (means[middle - 1] + means[middle]))
    }
}

// =============================================================================
// 2. ShadowEstimator - Expectation values from snapshots
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ShadowEstimator {
    inverse_channel: InverseChannel,
}

impl ShadowEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inverse_channel(mut self, inverse_channel: InverseChannel) -> Self {
        self.inverse_channel = inverse_channel;
        self
    }

    pub fn inverse_channel(&self) -> &InverseChannel {
        &self.inverse_channel
    }

    /// Inverts every recorded repetition, in recording order.
    pub fn snapshots(&self, data: &MeasurementData) -> ShadowResult<Vec<ShadowSnapshot>> {
        if data.is_empty() {
            return Err(ShadowRuntimeError::EmptyData);
        }
        data.repetitions()
            .map(|(bases, outcome)| self.inverse_channel.snapshot(bases, outcome))
            .collect()
    }

    /// Per-snapshot contractions `⟨O, ρ̂_r⟩`.
    pub fn snapshot_contractions(
        &self,
        snapshots: &[ShadowSnapshot],
        observable: &dyn ShadowObservableInterface,
    ) -> Vec<f64> {
        snapshots
            .iter()
            .map(|snapshot| observable.contract_snapshot(snapshot))
            .collect()
    }

    pub fn expectation(
        &self,
        data: &MeasurementData,
        observable: &dyn ShadowObservableInterface,
        groups: usize,
    ) -> ShadowResult<f64> {
        check_observable_shape(data, observable)?;
        let snapshots = self.snapshots(data)?;
        median_of_means(&self.snapshot_contractions(&snapshots, observable), groups)
    }

    /// Estimates several observables from one pass of snapshot inversion.
    pub fn expectation_values(
        &self,
        data: &MeasurementData,
        observables: &[ObservableHandle],
        groups: usize,
    ) -> ShadowResult<Vec<f64>> {
        for observable in observables {
            check_observable_shape(data, observable.as_ref())?;
        }
        let snapshots = self.snapshots(data)?;
        tracing::debug!(
            shadow_size = snapshots.len(),
            observables = observables.len(),
            groups,
            "estimating expectation values by median of means"
        );
        observables
            .iter()
            .map(|observable| {
                median_of_means(
                    &self.snapshot_contractions(&snapshots, observable.as_ref()),
                    groups,
                )
            })
            .collect()
    }

    /// Plain mean of all dense snapshots.
    pub fn reconstruct_state(&self, data: &MeasurementData) -> ShadowResult<ReconstructedState> {
        let snapshots = self.snapshots(data)?;
        let dimension = outcome_space_dimension(data.number_of_quantum_bits())?;
        let mut accumulated = Array2::from_elem((dimension, dimension), Complex64::new(0.0, 0.0));
        for snapshot in &snapshots {
            accumulated += &snapshot.to_dense();
        }
        let count = snapshots.len() as f64;
        accumulated.mapv_inplace(|entry| entry / count);
        Ok(ReconstructedState {
            number_of_quantum_bits: data.number_of_quantum_bits(),
            density_matrix: accumulated,
        })
    }
}

fn check_observable_shape(
    data: &MeasurementData,
    observable: &dyn ShadowObservableInterface,
) -> ShadowResult<()> {
    if data.is_empty() {
        return Err(ShadowRuntimeError::EmptyData);
    }
    if observable.number_of_quantum_bits() != data.number_of_quantum_bits() {
        return Err(ShadowRuntimeError::shape_mismatch(
            "observable qubit count",
            data.number_of_quantum_bits(),
            observable.number_of_quantum_bits(),
        ));
    }
    Ok(())
}

// =============================================================================
// 3. ReconstructedState - Averaged density operator
// =============================================================================

/// Shadow estimate of the density operator. Unbiased, but not guaranteed
/// to be positive semidefinite for finite shadow sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedState {
    number_of_quantum_bits: usize,
    density_matrix: Array2<Complex64>,
}

impl ReconstructedState {
    pub fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    pub fn density_matrix(&self) -> &Array2<Complex64> {
        &self.density_matrix
    }

    pub fn into_density_matrix(self) -> Array2<Complex64> {
        self.density_matrix
    }

    pub fn trace(&self) -> Complex64 {
        self.density_matrix.diag().sum()
    }

    /// `tr(ρ²)`
    pub fn purity(&self) -> f64 {
        trace_of_product(&self.density_matrix, &self.density_matrix).re
    }

    pub fn expectation_value(&self, observable: &dyn ShadowObservableInterface) -> ShadowResult<f64> {
        if observable.number_of_quantum_bits() != self.number_of_quantum_bits {
            return Err(ShadowRuntimeError::shape_mismatch(
                "observable qubit count",
                self.number_of_quantum_bits,
                observable.number_of_quantum_bits(),
            ));
        }
        Ok(observable.expectation_on_density(&self.density_matrix))
    }

    /// `⟨ψ|ρ|ψ⟩` for a pure reference state.
    pub fn fidelity_with_state_vector(&self, amplitudes: &[Complex64]) -> ShadowResult<f64> {
        let dimension = self.density_matrix.nrows();
        if amplitudes.len() != dimension {
            return Err(ShadowRuntimeError::shape_mismatch(
                "state vector length",
                dimension,
                amplitudes.len(),
            ));
        }
        let mut overlap = Complex64::new(0.0, 0.0);
        for ((row, column), &entry) in self.density_matrix.indexed_iter() {
            overlap += amplitudes[row].conj() * entry * amplitudes[column];
        }
        Ok(overlap.re)
    }
}
