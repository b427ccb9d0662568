// =============================================================================
// Classical Shadows Runtime - Gate Operations
// =============================================================================
// Table of Contents:
//   1. QuantumGateInterface - Core trait for all gates
//   2. SingleQubitGate - Fixed and rotation gates on one qubit
//   3. ControlledNotGate - Two-qubit entangler
// =============================================================================
// Purpose: The gate set used to prepare states for the reference backend:
//          H, X, Y, Z, S, S†, RX, RY, RZ and CNOT.
// =============================================================================

use crate::error::CircuitResult;
use crate::state_backend::QuantumStateVector;
use ndarray::{Array2, arr2};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

// =============================================================================
// 1. QuantumGateInterface - Core trait for all gates
// =============================================================================

pub trait QuantumGateInterface: Send + Sync + std::fmt::Debug {
    fn apply_to_full_state_vector(&self, state: &mut QuantumStateVector) -> CircuitResult<()>;
    fn gate_name(&self) -> &str;
    fn target_quantum_bits(&self) -> Vec<usize>;
    fn gate_matrix(&self) -> Array2<Complex64>;
}

// =============================================================================
// 2. SingleQubitGate - Fixed and rotation gates on one qubit
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingleQubitGateKind {
    Hadamard,
    PauliX,
    PauliY,
    PauliZ,
    Phase,
    PhaseDagger,
    RotationX(f64),
    RotationY(f64),
    RotationZ(f64),
}

impl SingleQubitGateKind {
    pub fn gate_name(self) -> &'static str {
        match self {
            SingleQubitGateKind::Hadamard => "hadamard_gate",
            SingleQubitGateKind::PauliX => "pauli_x_gate",
            SingleQubitGateKind::PauliY => "pauli_y_gate",
            SingleQubitGateKind::PauliZ => "pauli_z_gate",
            SingleQubitGateKind::Phase => "phase_gate",
            SingleQubitGateKind::PhaseDagger => "phase_dagger_gate",
            SingleQubitGateKind::RotationX(_) => "rotation_x_gate",
            SingleQubitGateKind::RotationY(_) => "rotation_y_gate",
            SingleQubitGateKind::RotationZ(_) => "rotation_z_gate",
        }
    }

    pub fn matrix(self) -> Array2<Complex64> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        match self {
            SingleQubitGateKind::Hadamard => {
                let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
                arr2(&[[h, h], [h, -h]])
            }
            SingleQubitGateKind::PauliX => arr2(&[[zero, one], [one, zero]]),
            SingleQubitGateKind::PauliY => arr2(&[[zero, -i], [i, zero]]),
            SingleQubitGateKind::PauliZ => arr2(&[[one, zero], [zero, -one]]),
            SingleQubitGateKind::Phase => arr2(&[[one, zero], [zero, i]]),
            SingleQubitGateKind::PhaseDagger => arr2(&[[one, zero], [zero, -i]]),
            SingleQubitGateKind::RotationX(theta) => {
                let (sin_half, cos_half) = (theta / 2.0).sin_cos();
                let c = Complex64::new(cos_half, 0.0);
                let s = Complex64::new(0.0, -sin_half);
                arr2(&[[c, s], [s, c]])
            }
            SingleQubitGateKind::RotationY(theta) => {
                let (sin_half, cos_half) = (theta / 2.0).sin_cos();
                arr2(&[
                    [Complex64::new(cos_half, 0.0), Complex64::new(-sin_half, 0.0)],
                    [Complex64::new(sin_half, 0.0), Complex64::new(cos_half, 0.0)],
                ])
            }
            SingleQubitGateKind::RotationZ(theta) => arr2(&[
                [Complex64::from_polar(1.0, -theta / 2.0), zero],
                [zero, Complex64::from_polar(1.0, theta / 2.0)],
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleQubitGate {
    kind: SingleQubitGateKind,
    target_qubit: usize,
}

impl SingleQubitGate {
    pub fn new(kind: SingleQubitGateKind, target_qubit: usize) -> Self {
        Self { kind, target_qubit }
    }

    pub fn kind(&self) -> SingleQubitGateKind {
        self.kind
    }
}

impl QuantumGateInterface for SingleQubitGate {
    fn apply_to_full_state_vector(&self, state: &mut QuantumStateVector) -> CircuitResult<()> {
        state.apply_single_qubit_matrix(self.target_qubit, &self.kind.matrix())
    }

    fn gate_name(&self) -> &str {
        self.kind.gate_name()
    }

    fn target_quantum_bits(&self) -> Vec<usize> {
        vec![self.target_qubit]
    }

    fn gate_matrix(&self) -> Array2<Complex64> {
        self.kind.matrix()
    }
}

// =============================================================================
// 3. ControlledNotGate - Two-qubit entangler
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ControlledNotGate {
    control_qubit: usize,
    target_qubit: usize,
}

impl ControlledNotGate {
    pub fn new(control_qubit: usize, target_qubit: usize) -> Self {
        Self {
            control_qubit,
            target_qubit,
        }
    }
}

impl QuantumGateInterface for ControlledNotGate {
    fn apply_to_full_state_vector(&self, state: &mut QuantumStateVector) -> CircuitResult<()> {
        state.apply_controlled_not(self.control_qubit, self.target_qubit)
    }

    fn gate_name(&self) -> &str {
        "controlled_not_gate"
    }

    fn target_quantum_bits(&self) -> Vec<usize> {
        vec![self.control_qubit, self.target_qubit]
    }

    /// Ordered as (control, target), control most significant.
    fn gate_matrix(&self) -> Array2<Complex64> {
        let mut matrix = Array2::from_elem((4, 4), Complex64::new(0.0, 0.0));
        for (row, column) in [(0, 0), (1, 1), (2, 3), (3, 2)] {
            matrix[[row, column]] = Complex64::new(1.0, 0.0);
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn is_unitary(matrix: &Array2<Complex64>) -> bool {
        let adjoint = matrix.t().mapv(|entry| entry.conj());
        let product = adjoint.dot(matrix);
        product.indexed_iter().all(|((row, column), &entry)| {
            let expected = if row == column { 1.0 } else { 0.0 };
            (entry - Complex64::new(expected, 0.0)).norm() < 1e-12
        })
    }

    #[test]
    fn test_every_gate_is_unitary() {
        for kind in [
            SingleQubitGateKind::Hadamard,
            SingleQubitGateKind::PauliX,
            SingleQubitGateKind::PauliY,
            SingleQubitGateKind::PauliZ,
            SingleQubitGateKind::Phase,
            SingleQubitGateKind::PhaseDagger,
            SingleQubitGateKind::RotationX(0.7),
            SingleQubitGateKind::RotationY(-1.3),
            SingleQubitGateKind::RotationZ(2.1),
        ] {
            assert!(is_unitary(&kind.matrix()), "{}", kind.gate_name());
        }
        assert!(is_unitary(&ControlledNotGate::new(0, 1).gate_matrix()));
    }

    #[test]
    fn test_hadamard_creates_superposition() {
        let mut state = QuantumStateVector::zero_state(1);
        SingleQubitGate::new(SingleQubitGateKind::Hadamard, 0)
            .apply_to_full_state_vector(&mut state)
            .unwrap();
        let probabilities = state.probability_distribution();
        assert!((probabilities[0] - 0.5).abs() < 1e-10);
        assert!((probabilities[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_rotation_y_pi_flips() {
        let mut state = QuantumStateVector::zero_state(1);
        SingleQubitGate::new(SingleQubitGateKind::RotationY(PI), 0)
            .apply_to_full_state_vector(&mut state)
            .unwrap();
        assert!((state.probability_distribution()[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cnot_entanglement() {
        let mut state = QuantumStateVector::zero_state(2);
        SingleQubitGate::new(SingleQubitGateKind::Hadamard, 0)
            .apply_to_full_state_vector(&mut state)
            .unwrap();
        ControlledNotGate::new(0, 1)
            .apply_to_full_state_vector(&mut state)
            .unwrap();
        let probabilities = state.probability_distribution();
        assert!((probabilities[0] - 0.5).abs() < 1e-10);
        assert!((probabilities[3] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_phase_gates_cancel() {
        let phase = SingleQubitGateKind::Phase.matrix();
        let phase_dagger = SingleQubitGateKind::PhaseDagger.matrix();
        let product = phase.dot(&phase_dagger);
        assert!((product[[1, 1]] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }
}
