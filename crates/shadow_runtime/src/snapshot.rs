// =============================================================================
// Classical Shadows Runtime - Snapshot Inversion
// =============================================================================
// Table of Contents:
//   1. Basis rotations and eigenprojectors
//   2. LocalSnapshot - Product-form single-shot snapshot
//   3. Multi-shot (Hamming-weighted) snapshot
//   4. ShadowSnapshot - Local or dense snapshot
//   5. InverseChannel - Standard or calibrated inversion
// =============================================================================
// Purpose: Reconstructs the classical snapshot of one randomized measurement
//          by applying the closed-form inverse of the measurement channel.
//          Snapshots are unbiased but not positive; they exist only for the
//          duration of an estimation call.
// =============================================================================

use crate::error::{ShadowResult, ShadowRuntimeError};
use crate::measurement_data::{MeasurementOutcome, PauliBasis, outcome_space_dimension};
use ndarray::{Array2, arr2, linalg::kron};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// Inverse factor of the noise-free single-qubit Clifford measurement channel.
pub const STANDARD_INVERSE_FACTOR: f64 = 3.0;

// =============================================================================
// 1. Basis rotations and eigenprojectors
// =============================================================================

/// Unitary that rotates the eigenbasis of `basis` onto the computational basis.
///
/// X uses H, Y uses H·S†, Z needs no rotation.
pub fn basis_rotation_matrix(basis: PauliBasis) -> Array2<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let h_imag = Complex64::new(0.0, FRAC_1_SQRT_2);
    match basis {
        PauliBasis::X => arr2(&[[h, h], [h, -h]]),
        PauliBasis::Y => arr2(&[[h, -h_imag], [h, h_imag]]),
        PauliBasis::Z => arr2(&[[one, zero], [zero, one]]),
    }
}

/// `U†|b⟩⟨b|U` for the rotation `U` of `basis` and observed bit `b`.
pub fn eigenprojector(basis: PauliBasis, bit: u8) -> Array2<Complex64> {
    let rotation = basis_rotation_matrix(basis);
    let row = rotation.row(usize::from(bit & 1));
    Array2::from_shape_fn((2, 2), |(i, j)| row[i].conj() * row[j])
}

pub fn identity_matrix(dimension: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((dimension, dimension), |(i, j)| {
        if i == j {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

/// `k·U†|b⟩⟨b|U + ½(1 − k)·I` for inverse factor `k`.
///
/// With `k = 3` this is the standard `3·U†|b⟩⟨b|U − I`. The result has unit
/// trace for every `k`.
pub fn single_qubit_snapshot(basis: PauliBasis, bit: u8, inverse_factor: f64) -> Array2<Complex64> {
    let projector = eigenprojector(basis, bit);
    let shift = Complex64::new(0.5 * (1.0 - inverse_factor), 0.0);
    let mut snapshot = projector.mapv(|entry| entry * inverse_factor);
    snapshot[[0, 0]] += shift;
    snapshot[[1, 1]] += shift;
    snapshot
}

// =============================================================================
// 2. LocalSnapshot - Product-form single-shot snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSnapshot {
    factors: Vec<Array2<Complex64>>,
}

impl LocalSnapshot {
    pub fn from_bitstring(
        bases: &[PauliBasis],
        bits: &[u8],
        inverse_factors: &[f64],
    ) -> ShadowResult<Self> {
        if bases.len() != bits.len() {
            return Err(ShadowRuntimeError::shape_mismatch(
                "bitstring length",
                bases.len(),
                bits.len(),
            ));
        }
        if inverse_factors.len() != bases.len() {
            return Err(ShadowRuntimeError::shape_mismatch(
                "inverse factors",
                bases.len(),
                inverse_factors.len(),
            ));
        }
        let factors = bases
            .iter()
            .zip(bits)
            .zip(inverse_factors)
            .map(|((&basis, &bit), &factor)| single_qubit_snapshot(basis, bit, factor))
            .collect();
        Ok(Self { factors })
    }

    pub fn number_of_quantum_bits(&self) -> usize {
        self.factors.len()
    }

    /// Per-qubit 2×2 factors, qubit 0 first.
    pub fn factors(&self) -> &[Array2<Complex64>] {
        &self.factors
    }

    pub fn to_dense(&self) -> Array2<Complex64> {
        self.factors
            .iter()
            .fold(identity_matrix(1), |accumulated, factor| kron(&accumulated, factor))
    }

    pub fn trace(&self) -> Complex64 {
        self.factors
            .iter()
            .map(|factor| factor[[0, 0]] + factor[[1, 1]])
            .product()
    }
}

// =============================================================================
// 3. Multi-shot (Hamming-weighted) snapshot
// =============================================================================

/// Shot-noise aware snapshot from an empirical outcome distribution:
///
/// `ρ̂ = 2^n Σ_b p(b) Σ_b' (−2)^(−D[b, b']) U†|b'⟩⟨b'|U`
///
/// where `D` is the Hamming distance. Equals the single-shot snapshot when
/// `p` is a point mass.
pub fn hamming_snapshot(
    bases: &[PauliBasis],
    probabilities: &[f64],
) -> ShadowResult<Array2<Complex64>> {
    let factors = vec![STANDARD_INVERSE_FACTOR; bases.len()];
    weighted_multi_shot_snapshot(bases, probabilities, &factors)
}

/// Hamming weights `2^n Σ_b p(b) (−2)^(−D[b, b'])` for every outcome `b'`.
pub fn hamming_weights(
    number_of_quantum_bits: usize,
    probabilities: &[f64],
) -> ShadowResult<Vec<f64>> {
    let dimension = outcome_space_dimension(number_of_quantum_bits)?;
    let scale = dimension as f64;
    let mut weights = vec![0.0; dimension];
    for (observed, &probability) in probabilities.iter().enumerate() {
        if probability == 0.0 {
            continue;
        }
        for (candidate, weight) in weights.iter_mut().enumerate() {
            let distance = (observed ^ candidate).count_ones() as i32;
            *weight += scale * probability * (-0.5f64).powi(distance);
        }
    }
    Ok(weights)
}

/// Multi-shot snapshot with per-qubit inverse factors `k_i`.
///
/// Each qubit contributes `½(1 + k_i)` when the candidate bit agrees with
/// the observed one and `½(1 − k_i)` otherwise; for `k_i = 3` that is
/// `2·(−2)^(−D)` per qubit, i.e. the Hamming form.
pub fn weighted_multi_shot_snapshot(
    bases: &[PauliBasis],
    probabilities: &[f64],
    inverse_factors: &[f64],
) -> ShadowResult<Array2<Complex64>> {
    let number_of_quantum_bits = bases.len();
    let dimension = outcome_space_dimension(number_of_quantum_bits)?;
    if probabilities.len() != dimension {
        return Err(ShadowRuntimeError::shape_mismatch(
            "probability vector length",
            dimension,
            probabilities.len(),
        ));
    }
    if inverse_factors.len() != number_of_quantum_bits {
        return Err(ShadowRuntimeError::shape_mismatch(
            "inverse factors",
            number_of_quantum_bits,
            inverse_factors.len(),
        ));
    }

    let weights = if inverse_factors
        .iter()
        .all(|&factor| factor == STANDARD_INVERSE_FACTOR)
    {
        hamming_weights(number_of_quantum_bits, probabilities)?
    } else {
        calibrated_weights(probabilities, inverse_factors)
    };

    let rotation = bases
        .iter()
        .fold(identity_matrix(1), |accumulated, &basis| {
            kron(&accumulated, &basis_rotation_matrix(basis))
        });
    let weighted_rotation =
        Array2::from_shape_fn((dimension, dimension), |(k, j)| rotation[[k, j]] * weights[k]);
    let adjoint = rotation.t().mapv(|entry| entry.conj());
    Ok(adjoint.dot(&weighted_rotation))
}

fn calibrated_weights(probabilities: &[f64], inverse_factors: &[f64]) -> Vec<f64> {
    let number_of_quantum_bits = inverse_factors.len();
    let dimension = probabilities.len();
    let mut weights = vec![0.0; dimension];
    for (observed, &probability) in probabilities.iter().enumerate() {
        if probability == 0.0 {
            continue;
        }
        for (candidate, weight) in weights.iter_mut().enumerate() {
            let product: f64 = inverse_factors
                .iter()
                .enumerate()
                .map(|(qubit, &factor)| {
                    let bit = number_of_quantum_bits - 1 - qubit;
                    if (observed >> bit) & 1 == (candidate >> bit) & 1 {
                        0.5 * (1.0 + factor)
                    } else {
                        0.5 * (1.0 - factor)
                    }
                })
                .product();
            *weight += probability * product;
        }
    }
    weights
}

// =============================================================================
// 4. ShadowSnapshot - Local or dense snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ShadowSnapshot {
    /// Tensor product of single-qubit factors (single-shot repetitions).
    Local(LocalSnapshot),
    /// Full 2^n × 2^n operator (multi-shot repetitions).
    Dense(Array2<Complex64>),
}

impl ShadowSnapshot {
    pub fn number_of_quantum_bits(&self) -> usize {
        match self {
            ShadowSnapshot::Local(local) => local.number_of_quantum_bits(),
            ShadowSnapshot::Dense(matrix) => matrix.nrows().trailing_zeros() as usize,
        }
    }

    pub fn to_dense(&self) -> Array2<Complex64> {
        match self {
            ShadowSnapshot::Local(local) => local.to_dense(),
            ShadowSnapshot::Dense(matrix) => matrix.clone(),
        }
    }

    pub fn trace(&self) -> Complex64 {
        match self {
            ShadowSnapshot::Local(local) => local.trace(),
            ShadowSnapshot::Dense(matrix) => matrix.diag().sum(),
        }
    }
}

// =============================================================================
// 5. InverseChannel - Standard or calibrated inversion
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InverseChannel {
    /// Noise-free local Clifford channel, inverse factor 3 on every qubit.
    #[default]
    Standard,
    /// Robust shadows: calibrated channel eigenvalue `f_i` per qubit,
    /// inverse factor `1 / f_i`.
    Calibrated(Vec<f64>),
}

impl InverseChannel {
    pub fn inverse_factors(&self, number_of_quantum_bits: usize) -> ShadowResult<Vec<f64>> {
        match self {
            InverseChannel::Standard => Ok(vec![STANDARD_INVERSE_FACTOR; number_of_quantum_bits]),
            InverseChannel::Calibrated(calibration) => {
                if calibration.len() != number_of_quantum_bits {
                    return Err(ShadowRuntimeError::shape_mismatch(
                        "calibration coefficients",
                        number_of_quantum_bits,
                        calibration.len(),
                    ));
                }
                Ok(calibration.iter().map(|f| 1.0 / f).collect())
            }
        }
    }

    /// Inverts one recorded repetition.
    pub fn snapshot(
        &self,
        bases: &[PauliBasis],
        outcome: &MeasurementOutcome,
    ) -> ShadowResult<ShadowSnapshot> {
        let inverse_factors = self.inverse_factors(bases.len())?;
        match outcome {
            MeasurementOutcome::Bitstring(bits) => Ok(ShadowSnapshot::Local(
                LocalSnapshot::from_bitstring(bases, bits, &inverse_factors)?,
            )),
            MeasurementOutcome::ProbabilityVector(probabilities) => Ok(ShadowSnapshot::Dense(
                weighted_multi_shot_snapshot(bases, probabilities, &inverse_factors)?,
            )),
        }
    }
}
