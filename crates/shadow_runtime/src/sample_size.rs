// =============================================================================
// Classical Shadows Runtime - Sample Size Estimation
// =============================================================================
// Table of Contents:
//   1. ShadowSizeEstimate - (N, K) pair
//   2. number_of_samples - Accuracy/confidence to (N, K)
//   3. group_boundaries - Near-equal contiguous groups
// =============================================================================
// Purpose: Chooses the shadow size N and the median-of-means group count K
//          so that every supplied observable is estimated within `accuracy`
//          with probability at least 1 - `confidence`.
// =============================================================================

use crate::error::{ShadowResult, ShadowRuntimeError};
use crate::observable::ObservableHandle;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Constant of the local-Clifford shadow norm bound `N ≥ 34 · 3^k / ε²`.
const SHADOW_NORM_CONSTANT: f64 = 34.0;

// =============================================================================
// 1. ShadowSizeEstimate - (N, K) pair
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowSizeEstimate {
    pub shadow_size: usize,
    pub median_of_means_groups: usize,
}

impl ShadowSizeEstimate {
    pub fn as_tuple(self) -> (usize, usize) {
        (self.shadow_size, self.median_of_means_groups)
    }
}

// =============================================================================
// 2. number_of_samples - Accuracy/confidence to (N, K)
// =============================================================================

pub fn validate_accuracy(accuracy: f64) -> ShadowResult<()> {
    if !accuracy.is_finite() || accuracy <= 0.0 {
        return Err(ShadowRuntimeError::invalid_argument(format!(
            "accuracy must be a positive finite number, got {accuracy}"
        )));
    }
    Ok(())
}

pub fn validate_confidence(confidence: f64) -> ShadowResult<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(ShadowRuntimeError::invalid_argument(format!(
            "confidence must lie strictly between 0 and 1, got {confidence}"
        )));
    }
    Ok(())
}

/// `N = round(3^k · 34 / ε²)` with `k` the largest locality weight among
/// the observables, clamped to `N ≥ 1`.
pub fn shadow_size_for_accuracy(
    observables: &[ObservableHandle],
    accuracy: f64,
) -> ShadowResult<usize> {
    validate_accuracy(accuracy)?;
    if observables.is_empty() {
        return Err(ShadowRuntimeError::invalid_argument(
            "sample size needs at least one observable",
        ));
    }

    let maximum_weight = observables
        .iter()
        .map(|observable| observable.locality_weight())
        .max()
        .unwrap_or(0);
    let weight_factor = 3f64.powi(i32::try_from(maximum_weight).unwrap_or(i32::MAX));
    let raw_size = (weight_factor * SHADOW_NORM_CONSTANT / (accuracy * accuracy)).round();
    if !raw_size.is_finite() || raw_size > usize::MAX as f64 {
        return Err(ShadowRuntimeError::invalid_argument(format!(
            "shadow size for weight {maximum_weight} at accuracy {accuracy} is not representable"
        )));
    }
    Ok((raw_size as usize).max(1))
}

/// `K = round(2 · ln(2M / δ))` for `M` observables, at least 1.
pub fn groups_for_confidence(number_of_observables: usize, confidence: f64) -> ShadowResult<usize> {
    validate_confidence(confidence)?;
    if number_of_observables == 0 {
        return Err(ShadowRuntimeError::invalid_argument(
            "median-of-means grouping needs at least one observable",
        ));
    }
    let raw_groups = (2.0 * (2.0 * number_of_observables as f64 / confidence).ln()).round();
    Ok((raw_groups as usize).max(1))
}

/// Shadow size and group count for estimating every observable within
/// `accuracy` with failure probability at most `confidence`.
///
/// Both are clamped so that `N ≥ 1` and `1 ≤ K ≤ N`.
pub fn number_of_samples(
    observables: &[ObservableHandle],
    accuracy: f64,
    confidence: f64,
) -> ShadowResult<ShadowSizeEstimate> {
    let shadow_size = shadow_size_for_accuracy(observables, accuracy)?;
    let median_of_means_groups =
        groups_for_confidence(observables.len(), confidence)?.min(shadow_size);

    tracing::debug!(
        observables = observables.len(),
        shadow_size,
        median_of_means_groups,
        "computed classical shadow sample size"
    );

    Ok(ShadowSizeEstimate {
        shadow_size,
        median_of_means_groups,
    })
}

// =============================================================================
// 3. group_boundaries - Near-equal contiguous groups
// =============================================================================

/// Splits `0..length` into `groups` contiguous ranges whose sizes differ by
/// at most one; the first `length % groups` ranges are the longer ones.
pub fn group_boundaries(length: usize, groups: usize) -> Vec<Range<usize>> {
    if groups == 0 {
        return Vec::new();
    }
    let base = length / groups;
    let remainder = length % groups;
    let mut start = 0;
    (0..groups)
        .map(|group| {
            let size = base + usize::from(group < remainder);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::PauliSumObservable;
    use proptest::prelude::*;

    fn magnetization(n: usize) -> ObservableHandle {
        PauliSumObservable::total_magnetization(n).unwrap().into_handle()
    }

    #[test]
    fn test_reference_sample_size() {
        let estimate = number_of_samples(&[magnetization(2)], 0.1, 0.1).unwrap();
        assert_eq!(estimate.as_tuple(), (10200, 6));
    }

    #[test]
    fn test_weight_drives_shadow_size() {
        let zz = PauliSumObservable::ising_zz(3, 1.0).unwrap().into_handle();
        let estimate = number_of_samples(&[magnetization(3), zz], 0.1, 0.1).unwrap();
        assert_eq!(estimate.shadow_size, 30600);
        // K = round(2 ln 40) = 7
        assert_eq!(estimate.median_of_means_groups, 7);
    }

    #[test]
    fn test_invalid_arguments() {
        let observables = [magnetization(1)];
        assert!(matches!(
            number_of_samples(&observables, 0.0, 0.1),
            Err(ShadowRuntimeError::InvalidArgument(_))
        ));
        assert!(number_of_samples(&observables, -0.5, 0.1).is_err());
        assert!(number_of_samples(&observables, f64::NAN, 0.1).is_err());
        assert!(number_of_samples(&observables, 0.1, 0.0).is_err());
        assert!(number_of_samples(&observables, 0.1, 1.0).is_err());
        assert!(matches!(
            number_of_samples(&[], 0.1, 0.1),
            Err(ShadowRuntimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_components_compose() {
        let observables = [magnetization(2)];
        assert_eq!(shadow_size_for_accuracy(&observables, 0.1).unwrap(), 10200);
        assert_eq!(groups_for_confidence(1, 0.1).unwrap(), 6);
        assert!(groups_for_confidence(0, 0.1).is_err());
    }

    #[test]
    fn test_coarse_accuracy_clamps_groups() {
        let estimate = number_of_samples(&[magnetization(1)], 1000.0, 1e-6).unwrap();
        assert_eq!(estimate.shadow_size, 1);
        assert_eq!(estimate.median_of_means_groups, 1);
    }

    #[test]
    fn test_group_boundaries_split() {
        let groups = group_boundaries(10, 3);
        assert_eq!(groups, vec![0..4, 4..7, 7..10]);
        assert!(group_boundaries(5, 0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_sample_size_bounds(
            accuracy in 0.01f64..5.0,
            confidence in 0.001f64..0.999,
            count in 1usize..6,
        ) {
            let observables: Vec<ObservableHandle> = (0..count).map(|_| magnetization(2)).collect();
            let estimate = number_of_samples(&observables, accuracy, confidence).unwrap();
            prop_assert!(estimate.shadow_size >= 1);
            prop_assert!(estimate.median_of_means_groups >= 1);
            prop_assert!(estimate.median_of_means_groups <= estimate.shadow_size);

            let groups = group_boundaries(estimate.shadow_size, estimate.median_of_means_groups);
            let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
            let smallest = *sizes.iter().min().unwrap();
            let largest = *sizes.iter().max().unwrap();
            prop_assert!(largest - smallest <= 1);
            prop_assert_eq!(sizes.iter().sum::<usize>(), estimate.shadow_size);
        }
    }
}
