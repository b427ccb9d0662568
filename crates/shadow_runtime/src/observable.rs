// =============================================================================
// Classical Shadows Runtime - Observables
// =============================================================================
// Table of Contents:
//   1. ShadowObservableInterface - Trait for estimable observables
//   2. PauliOperator - Single-qubit Pauli factors
//   3. PauliTerm - Weighted Pauli string
//   4. PauliSumObservable - Sum of Pauli strings
//   5. Dense contraction helpers
// =============================================================================
// Purpose: The estimation engine only needs three capabilities from an
//          observable: its qubit count, its locality weight (for sample-size
//          bounds) and a real contraction against a snapshot.
// =============================================================================

use crate::error::{ShadowResult, ShadowRuntimeError};
use crate::snapshot::{LocalSnapshot, ShadowSnapshot, identity_matrix};
use ndarray::{Array2, arr2, linalg::kron};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// 1. ShadowObservableInterface - Trait for estimable observables
// =============================================================================

pub trait ShadowObservableInterface: Send + Sync + std::fmt::Debug {
    fn observable_name(&self) -> &str;

    fn number_of_quantum_bits(&self) -> usize;

    /// Largest number of qubits any single term acts on non-trivially.
    fn locality_weight(&self) -> usize;

    /// `Re tr(O · ρ̂)` for one snapshot `ρ̂`.
    fn contract_snapshot(&self, snapshot: &ShadowSnapshot) -> f64;

    fn dense_matrix(&self) -> Array2<Complex64>;

    /// `Re tr(O · ρ)` for an explicit density operator.
    fn expectation_on_density(&self, density: &Array2<Complex64>) -> f64 {
        trace_of_product(&self.dense_matrix(), density).re
    }
}

pub type ObservableHandle = Arc<dyn ShadowObservableInterface>;

// =============================================================================
// 2. PauliOperator - Single-qubit Pauli factors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauliOperator {
    Identity,
    PauliX,
    PauliY,
    PauliZ,
}

impl PauliOperator {
    pub fn from_label(label: char) -> Option<Self> {
        match label.to_ascii_uppercase() {
            'I' => Some(PauliOperator::Identity),
            'X' => Some(PauliOperator::PauliX),
            'Y' => Some(PauliOperator::PauliY),
            'Z' => Some(PauliOperator::PauliZ),
            _ => None,
        }
    }

    pub fn matrix(self) -> Array2<Complex64> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        match self {
            PauliOperator::Identity => arr2(&[[one, zero], [zero, one]]),
            PauliOperator::PauliX => arr2(&[[zero, one], [one, zero]]),
            PauliOperator::PauliY => arr2(&[[zero, -i], [i, zero]]),
            PauliOperator::PauliZ => arr2(&[[one, zero], [zero, -one]]),
        }
    }

    /// `tr(P · M)` for a 2×2 matrix `M`.
    fn trace_against(self, m: &Array2<Complex64>) -> Complex64 {
        match self {
            PauliOperator::Identity => m[[0, 0]] + m[[1, 1]],
            PauliOperator::PauliX => m[[0, 1]] + m[[1, 0]],
            PauliOperator::PauliY => Complex64::new(0.0, 1.0) * (m[[0, 1]] - m[[1, 0]]),
            PauliOperator::PauliZ => m[[0, 0]] - m[[1, 1]],
        }
    }
}

// =============================================================================
// 3. PauliTerm - Weighted Pauli string
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliTerm {
    pub coefficient: f64,
    /// Non-identity factors, sorted by qubit.
    pub operators: Vec<(usize, PauliOperator)>,
}

impl PauliTerm {
    pub fn weight(&self) -> usize {
        self.operators.len()
    }

    fn contract_local(&self, snapshot: &LocalSnapshot) -> Complex64 {
        // Untouched qubits contribute tr(ρ̂_q) = 1.
        let product: Complex64 = self
            .operators
            .iter()
            .map(|&(qubit, operator)| operator.trace_against(&snapshot.factors()[qubit]))
            .product();
        product * self.coefficient
    }

    fn contract_dense(&self, number_of_quantum_bits: usize, density: &Array2<Complex64>) -> Complex64 {
        let mut flip_mask = 0usize;
        for &(qubit, operator) in &self.operators {
            if matches!(operator, PauliOperator::PauliX | PauliOperator::PauliY) {
                flip_mask |= 1 << (number_of_quantum_bits - 1 - qubit);
            }
        }

        // P has a single non-zero entry per row: P[row, row ^ flip_mask].
        let mut trace = Complex64::new(0.0, 0.0);
        for row in 0..density.nrows() {
            let mut phase = Complex64::new(1.0, 0.0);
            for &(qubit, operator) in &self.operators {
                let bit = (row >> (number_of_quantum_bits - 1 - qubit)) & 1;
                match operator {
                    PauliOperator::PauliZ if bit == 1 => phase = -phase,
                    PauliOperator::PauliY if bit == 0 => phase *= Complex64::new(0.0, -1.0),
                    PauliOperator::PauliY => phase *= Complex64::new(0.0, 1.0),
                    _ => {}
                }
            }
            trace += phase * density[[row ^ flip_mask, row]];
        }
        trace * self.coefficient
    }

    fn dense_matrix(&self, number_of_quantum_bits: usize) -> Array2<Complex64> {
        let matrix = (0..number_of_quantum_bits)
            .map(|qubit| {
                self.operators
                    .iter()
                    .find(|(target, _)| *target == qubit)
                    .map_or(PauliOperator::Identity, |&(_, operator)| operator)
                    .matrix()
            })
            .fold(identity_matrix(1), |accumulated, factor| kron(&accumulated, &factor));
        matrix.mapv(|entry| entry * self.coefficient)
    }
}

// =============================================================================
// 4. PauliSumObservable - Sum of Pauli strings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliSumObservable {
    name: String,
    number_of_quantum_bits: usize,
    terms: Vec<PauliTerm>,
}

impl PauliSumObservable {
    pub fn new(name: impl Into<String>, number_of_quantum_bits: usize) -> Self {
        Self {
            name: name.into(),
            number_of_quantum_bits,
            terms: Vec::new(),
        }
    }

    pub fn add_term(
        &mut self,
        coefficient: f64,
        operators: Vec<(usize, PauliOperator)>,
    ) -> ShadowResult<&mut Self> {
        let mut seen = BTreeSet::new();
        let mut factors = Vec::with_capacity(operators.len());
        for (qubit, operator) in operators {
            if qubit >= self.number_of_quantum_bits {
                return Err(ShadowRuntimeError::invalid_argument(format!(
                    "qubit {qubit} out of range for a {}-qubit observable",
                    self.number_of_quantum_bits
                )));
            }
            if !seen.insert(qubit) {
                return Err(ShadowRuntimeError::invalid_argument(format!(
                    "qubit {qubit} appears twice in one Pauli term"
                )));
            }
            if operator != PauliOperator::Identity {
                factors.push((qubit, operator));
            }
        }
        factors.sort_by_key(|&(qubit, _)| qubit);
        self.terms.push(PauliTerm {
            coefficient,
            operators: factors,
        });
        Ok(self)
    }

    pub fn with_term(
        mut self,
        coefficient: f64,
        operators: Vec<(usize, PauliOperator)>,
    ) -> ShadowResult<Self> {
        self.add_term(coefficient, operators)?;
        Ok(self)
    }

    pub fn single_qubit(
        number_of_quantum_bits: usize,
        qubit: usize,
        operator: PauliOperator,
    ) -> ShadowResult<Self> {
        let name = format!("{operator:?}({qubit})");
        Self::new(name, number_of_quantum_bits).with_term(1.0, vec![(qubit, operator)])
    }

    pub fn pauli_x(number_of_quantum_bits: usize, qubit: usize) -> ShadowResult<Self> {
        Self::single_qubit(number_of_quantum_bits, qubit, PauliOperator::PauliX)
    }

    pub fn pauli_y(number_of_quantum_bits: usize, qubit: usize) -> ShadowResult<Self> {
        Self::single_qubit(number_of_quantum_bits, qubit, PauliOperator::PauliY)
    }

    pub fn pauli_z(number_of_quantum_bits: usize, qubit: usize) -> ShadowResult<Self> {
        Self::single_qubit(number_of_quantum_bits, qubit, PauliOperator::PauliZ)
    }

    /// Parses a string such as `"XIZ"`; character `i` acts on qubit `i`.
    pub fn from_pauli_string(pauli_string: &str, coefficient: f64) -> ShadowResult<Self> {
        let operators = pauli_string
            .chars()
            .enumerate()
            .map(|(qubit, label)| {
                PauliOperator::from_label(label)
                    .map(|operator| (qubit, operator))
                    .ok_or_else(|| {
                        ShadowRuntimeError::invalid_argument(format!(
                            "unknown Pauli label '{label}' in \"{pauli_string}\""
                        ))
                    })
            })
            .collect::<ShadowResult<Vec<_>>>()?;
        Self::new(pauli_string.to_uppercase(), operators.len()).with_term(coefficient, operators)
    }

    /// `Σ_i Z_i`
    pub fn total_magnetization(number_of_quantum_bits: usize) -> ShadowResult<Self> {
        let mut observable = Self::new("total_magnetization", number_of_quantum_bits);
        for qubit in 0..number_of_quantum_bits {
            observable.add_term(1.0, vec![(qubit, PauliOperator::PauliZ)])?;
        }
        Ok(observable)
    }

    /// `J Σ_i Z_i Z_{i+1}` on an open chain.
    pub fn ising_zz(number_of_quantum_bits: usize, coupling: f64) -> ShadowResult<Self> {
        let mut observable = Self::new("ising_zz_hamiltonian", number_of_quantum_bits);
        for qubit in 0..number_of_quantum_bits.saturating_sub(1) {
            observable.add_term(
                coupling,
                vec![(qubit, PauliOperator::PauliZ), (qubit + 1, PauliOperator::PauliZ)],
            )?;
        }
        Ok(observable)
    }

    pub fn terms(&self) -> &[PauliTerm] {
        &self.terms
    }

    pub fn into_handle(self) -> ObservableHandle {
        Arc::new(self)
    }
}

impl ShadowObservableInterface for PauliSumObservable {
    fn observable_name(&self) -> &str {
        &self.name
    }

    fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    fn locality_weight(&self) -> usize {
        self.terms.iter().map(PauliTerm::weight).max().unwrap_or(0)
    }

    fn contract_snapshot(&self, snapshot: &ShadowSnapshot) -> f64 {
        let total: Complex64 = match snapshot {
            ShadowSnapshot::Local(local) => {
                self.terms.iter().map(|term| term.contract_local(local)).sum()
            }
            ShadowSnapshot::Dense(density) => self
                .terms
                .iter()
                .map(|term| term.contract_dense(self.number_of_quantum_bits, density))
                .sum(),
        };
        total.re
    }

    fn dense_matrix(&self) -> Array2<Complex64> {
        let dimension = 1usize << self.number_of_quantum_bits;
        self.terms.iter().fold(
            Array2::from_elem((dimension, dimension), Complex64::new(0.0, 0.0)),
            |accumulated, term| accumulated + term.dense_matrix(self.number_of_quantum_bits),
        )
    }

    fn expectation_on_density(&self, density: &Array2<Complex64>) -> f64 {
        self.terms
            .iter()
            .map(|term| term.contract_dense(self.number_of_quantum_bits, density))
            .sum::<Complex64>()
            .re
    }
}

// =============================================================================
// 5. Dense contraction helpers
// =============================================================================

/// `tr(A · B)` without forming the product.
pub fn trace_of_product(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Complex64 {
    let mut trace = Complex64::new(0.0, 0.0);
    for ((i, j), &entry) in a.indexed_iter() {
        trace += entry * b[[j, i]];
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement_data::PauliBasis;

    const TOLERANCE: f64 = 1e-10;

    fn local(bases: &[PauliBasis], bits: &[u8]) -> ShadowSnapshot {
        ShadowSnapshot::Local(
            LocalSnapshot::from_bitstring(bases, bits, &vec![3.0; bases.len()]).unwrap(),
        )
    }

    #[test]
    fn test_locality_weights() {
        let x0 = PauliSumObservable::pauli_x(1, 0).unwrap();
        assert_eq!(x0.locality_weight(), 1);

        let xyz = PauliSumObservable::from_pauli_string("XYZ", 1.0).unwrap();
        assert_eq!(xyz.locality_weight(), 3);

        let sum = PauliSumObservable::new("x+y+z", 1)
            .with_term(1.0, vec![(0, PauliOperator::PauliX)])
            .unwrap()
            .with_term(1.0, vec![(0, PauliOperator::PauliY)])
            .unwrap()
            .with_term(1.0, vec![(0, PauliOperator::PauliZ)])
            .unwrap();
        assert_eq!(sum.locality_weight(), 1);

        let with_identity = PauliSumObservable::from_pauli_string("XIIZ", 1.0).unwrap();
        assert_eq!(with_identity.locality_weight(), 2);

        assert_eq!(PauliSumObservable::total_magnetization(5).unwrap().locality_weight(), 1);
        assert_eq!(PauliSumObservable::ising_zz(4, 1.0).unwrap().locality_weight(), 2);
    }

    #[test]
    fn test_invalid_terms_rejected() {
        assert!(PauliSumObservable::pauli_z(2, 2).is_err());
        assert!(PauliSumObservable::from_pauli_string("XQ", 1.0).is_err());
        let duplicate = PauliSumObservable::new("dup", 2)
            .with_term(1.0, vec![(0, PauliOperator::PauliX), (0, PauliOperator::PauliZ)]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_local_contraction_matches_dense() {
        let observable = PauliSumObservable::new("mixed", 2)
            .with_term(0.5, vec![(0, PauliOperator::PauliX), (1, PauliOperator::PauliY)])
            .unwrap()
            .with_term(-1.5, vec![(1, PauliOperator::PauliZ)])
            .unwrap()
            .with_term(0.25, vec![])
            .unwrap();
        for bases in [
            [PauliBasis::X, PauliBasis::Y],
            [PauliBasis::Z, PauliBasis::Z],
            [PauliBasis::Y, PauliBasis::X],
        ] {
            for bits in [[0u8, 0], [0, 1], [1, 0], [1, 1]] {
                let snapshot = local(&bases, &bits);
                let dense = ShadowSnapshot::Dense(snapshot.to_dense());
                let via_local = observable.contract_snapshot(&snapshot);
                let via_dense = observable.contract_snapshot(&dense);
                let via_matrix =
                    trace_of_product(&observable.dense_matrix(), &snapshot.to_dense()).re;
                assert!((via_local - via_dense).abs() < TOLERANCE);
                assert!((via_local - via_matrix).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_matching_basis_contraction() {
        // Measuring Z and seeing 0: tr(Z (3|0⟩⟨0| − I)) = 3.
        let z = PauliSumObservable::pauli_z(1, 0).unwrap();
        assert!((z.contract_snapshot(&local(&[PauliBasis::Z], &[0])) - 3.0).abs() < TOLERANCE);
        assert!((z.contract_snapshot(&local(&[PauliBasis::Z], &[1])) + 3.0).abs() < TOLERANCE);
        // Mismatched basis carries no information about Z.
        assert!(z.contract_snapshot(&local(&[PauliBasis::X], &[0])).abs() < TOLERANCE);
    }

    #[test]
    fn test_identity_contraction_is_trace() {
        let identity = PauliSumObservable::new("identity", 2)
            .with_term(1.0, vec![])
            .unwrap();
        let snapshot = local(&[PauliBasis::Y, PauliBasis::X], &[1, 0]);
        assert!((identity.contract_snapshot(&snapshot) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_expectation_on_density() {
        let mut density = Array2::from_elem((2, 2), Complex64::new(0.0, 0.0));
        density[[0, 0]] = Complex64::new(1.0, 0.0);
        let z = PauliSumObservable::pauli_z(1, 0).unwrap();
        let x = PauliSumObservable::pauli_x(1, 0).unwrap();
        assert!((z.expectation_on_density(&density) - 1.0).abs() < TOLERANCE);
        assert!(x.expectation_on_density(&density).abs() < TOLERANCE);
    }
}
