// =============================================================================
// Classical Shadows Runtime - Dense State Vector
// =============================================================================
// Table of Contents:
//   1. QuantumStateVector - Dense amplitude representation
//   2. Local gate application
//   3. Computational-basis sampling
// =============================================================================
// Purpose: The state representation behind the reference sampling backend.
//          Qubit 0 is the most significant bit of an amplitude index.
// =============================================================================

use crate::error::{CircuitError, CircuitResult};
use ndarray::Array2;
use num_complex::Complex64;

const NORMALIZATION_TOLERANCE: f64 = 1e-12;

// =============================================================================
// 1. QuantumStateVector - Dense amplitude representation
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QuantumStateVector {
    amplitudes: Vec<Complex64>,
    number_of_quantum_bits: usize,
}

impl QuantumStateVector {
    pub fn zero_state(number_of_quantum_bits: usize) -> Self {
        let dimension = 1usize << number_of_quantum_bits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); dimension];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            number_of_quantum_bits,
        }
    }

    /// Accepts any non-zero power-of-two length vector and normalizes it.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> CircuitResult<Self> {
        let dimension = amplitudes.len();
        if dimension < 2 || !dimension.is_power_of_two() {
            return Err(CircuitError::InvalidStateVector(format!(
                "length {dimension} is not a power of two of at least 2"
            )));
        }
        let mut state = Self {
            number_of_quantum_bits: dimension.trailing_zeros() as usize,
            amplitudes,
        };
        if state.norm() <= NORMALIZATION_TOLERANCE {
            return Err(CircuitError::InvalidStateVector(
                "amplitudes have zero norm".to_string(),
            ));
        }
        state.normalize();
        Ok(state)
    }

    pub fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn norm(&self) -> f64 {
        self.amplitudes
            .iter()
            .map(|a| a.norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > NORMALIZATION_TOLERANCE {
            for amplitude in &mut self.amplitudes {
                *amplitude /= norm;
            }
        }
    }

    pub fn probability_distribution(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    pub fn inner_product(&self, other: &Self) -> CircuitResult<Complex64> {
        if self.dimension() != other.dimension() {
            return Err(CircuitError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        Ok(self
            .amplitudes
            .iter()
            .zip(other.amplitudes.iter())
            .map(|(a, b)| a.conj() * b)
            .sum())
    }

    /// `|ψ⟩⟨ψ|`
    pub fn density_matrix(&self) -> Array2<Complex64> {
        let dimension = self.dimension();
        Array2::from_shape_fn((dimension, dimension), |(row, column)| {
            self.amplitudes[row] * self.amplitudes[column].conj()
        })
    }

    pub fn expectation_value_pauli_z(&self, qubit: usize) -> CircuitResult<f64> {
        let mask = self.qubit_mask(qubit)?;
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .map(|(index, amplitude)| {
                let probability = amplitude.norm_sqr();
                if index & mask == 0 { probability } else { -probability }
            })
            .sum())
    }

    // =========================================================================
    // 2. Local gate application
    // =========================================================================

    pub(crate) fn qubit_mask(&self, qubit: usize) -> CircuitResult<usize> {
        if qubit >= self.number_of_quantum_bits {
            return Err(CircuitError::QubitOutOfRange {
                qubit,
                number_of_quantum_bits: self.number_of_quantum_bits,
            });
        }
        Ok(1usize << (self.number_of_quantum_bits - 1 - qubit))
    }

    /// Applies a 2×2 unitary to one qubit.
    pub fn apply_single_qubit_matrix(
        &mut self,
        qubit: usize,
        matrix: &Array2<Complex64>,
    ) -> CircuitResult<()> {
        if matrix.dim() != (2, 2) {
            return Err(CircuitError::DimensionMismatch {
                expected: 4,
                actual: matrix.len(),
            });
        }
        let mask = self.qubit_mask(qubit)?;
        for low in 0..self.dimension() {
            if low & mask != 0 {
                continue;
            }
            let high = low | mask;
            let a = self.amplitudes[low];
            let b = self.amplitudes[high];
            self.amplitudes[low] = matrix[[0, 0]] * a + matrix[[0, 1]] * b;
            self.amplitudes[high] = matrix[[1, 0]] * a + matrix[[1, 1]] * b;
        }
        Ok(())
    }

    pub fn apply_controlled_not(&mut self, control: usize, target: usize) -> CircuitResult<()> {
        if control == target {
            return Err(CircuitError::ControlEqualsTarget(control));
        }
        let control_mask = self.qubit_mask(control)?;
        let target_mask = self.qubit_mask(target)?;
        for index in 0..self.dimension() {
            if index & control_mask != 0 && index & target_mask == 0 {
                self.amplitudes.swap(index, index | target_mask);
            }
        }
        Ok(())
    }

    // =========================================================================
    // 3. Computational-basis sampling
    // =========================================================================

    /// Inverse-CDF draw from the outcome distribution for `random_value` in `[0, 1)`.
    pub fn sample_bitstring(&self, random_value: f64) -> Vec<u8> {
        let mut cumulative = 0.0;
        for (index, amplitude) in self.amplitudes.iter().enumerate() {
            cumulative += amplitude.norm_sqr();
            if random_value < cumulative {
                return self.index_to_bitstring(index);
            }
        }
        self.index_to_bitstring(self.dimension() - 1)
    }

    pub fn index_to_bitstring(&self, index: usize) -> Vec<u8> {
        (0..self.number_of_quantum_bits)
            .rev()
            .map(|bit| ((index >> bit) & 1) as u8)
            .collect()
    }
}
