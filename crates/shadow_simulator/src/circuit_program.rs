// =============================================================================
// Classical Shadows Runtime - Circuit Program
// =============================================================================
// Table of Contents:
//   1. RotationAngle - Fixed or named-parameter angle
//   2. CircuitOperation - One gate application
//   3. QuantumCircuitStructure - Parameterized state-preparation circuit
// =============================================================================
// Purpose: Describes how the reference backend prepares its state. Rotation
//          angles may name a parameter that is bound from the parameter
//          values forwarded with every sampling call.
// =============================================================================

use crate::error::{CircuitError, CircuitResult};
use crate::gate_operations::{
    ControlledNotGate, QuantumGateInterface, SingleQubitGate, SingleQubitGateKind,
};
use crate::state_backend::QuantumStateVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// 1. RotationAngle - Fixed or named-parameter angle
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationAngle {
    Fixed(f64),
    Symbol(String),
}

impl RotationAngle {
    pub fn symbol(name: impl Into<String>) -> Self {
        RotationAngle::Symbol(name.into())
    }

    pub fn resolve(&self, parameter_values: &BTreeMap<String, f64>) -> CircuitResult<f64> {
        match self {
            RotationAngle::Fixed(theta) => Ok(*theta),
            RotationAngle::Symbol(name) => parameter_values
                .get(name)
                .copied()
                .ok_or_else(|| CircuitError::UnboundParameter(name.clone())),
        }
    }
}

impl From<f64> for RotationAngle {
    fn from(theta: f64) -> Self {
        RotationAngle::Fixed(theta)
    }
}

impl From<&str> for RotationAngle {
    fn from(name: &str) -> Self {
        RotationAngle::Symbol(name.to_string())
    }
}

// =============================================================================
// 2. CircuitOperation - One gate application
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum CircuitOperation {
    Hadamard { qubit: usize },
    PauliX { qubit: usize },
    PauliY { qubit: usize },
    PauliZ { qubit: usize },
    Phase { qubit: usize },
    PhaseDagger { qubit: usize },
    RotationX { qubit: usize, angle: RotationAngle },
    RotationY { qubit: usize, angle: RotationAngle },
    RotationZ { qubit: usize, angle: RotationAngle },
    ControlledNot { control: usize, target: usize },
}

impl CircuitOperation {
    pub fn target_quantum_bits(&self) -> Vec<usize> {
        match self {
            CircuitOperation::Hadamard { qubit }
            | CircuitOperation::PauliX { qubit }
            | CircuitOperation::PauliY { qubit }
            | CircuitOperation::PauliZ { qubit }
            | CircuitOperation::Phase { qubit }
            | CircuitOperation::PhaseDagger { qubit }
            | CircuitOperation::RotationX { qubit, .. }
            | CircuitOperation::RotationY { qubit, .. }
            | CircuitOperation::RotationZ { qubit, .. } => vec![*qubit],
            CircuitOperation::ControlledNot { control, target } => vec![*control, *target],
        }
    }

    fn angle(&self) -> Option<&RotationAngle> {
        match self {
            CircuitOperation::RotationX { angle, .. }
            | CircuitOperation::RotationY { angle, .. }
            | CircuitOperation::RotationZ { angle, .. } => Some(angle),
            _ => None,
        }
    }

    /// Resolves symbolic angles into a concrete gate.
    pub fn bind(
        &self,
        parameter_values: &BTreeMap<String, f64>,
    ) -> CircuitResult<Box<dyn QuantumGateInterface>> {
        let single = |kind: SingleQubitGateKind, qubit: usize| -> Box<dyn QuantumGateInterface> {
            Box::new(SingleQubitGate::new(kind, qubit))
        };
        Ok(match self {
            CircuitOperation::Hadamard { qubit } => single(SingleQubitGateKind::Hadamard, *qubit),
            CircuitOperation::PauliX { qubit } => single(SingleQubitGateKind::PauliX, *qubit),
            CircuitOperation::PauliY { qubit } => single(SingleQubitGateKind::PauliY, *qubit),
            CircuitOperation::PauliZ { qubit } => single(SingleQubitGateKind::PauliZ, *qubit),
            CircuitOperation::Phase { qubit } => single(SingleQubitGateKind::Phase, *qubit),
            CircuitOperation::PhaseDagger { qubit } => {
                single(SingleQubitGateKind::PhaseDagger, *qubit)
            }
            CircuitOperation::RotationX { qubit, angle } => single(
                SingleQubitGateKind::RotationX(angle.resolve(parameter_values)?),
                *qubit,
            ),
            CircuitOperation::RotationY { qubit, angle } => single(
                SingleQubitGateKind::RotationY(angle.resolve(parameter_values)?),
                *qubit,
            ),
            CircuitOperation::RotationZ { qubit, angle } => single(
                SingleQubitGateKind::RotationZ(angle.resolve(parameter_values)?),
                *qubit,
            ),
            CircuitOperation::ControlledNot { control, target } => {
                Box::new(ControlledNotGate::new(*control, *target))
            }
        })
    }
}

// =============================================================================
// 3. QuantumCircuitStructure - Parameterized state-preparation circuit
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumCircuitStructure {
    number_of_quantum_bits: usize,
    operations: Vec<CircuitOperation>,
}

impl QuantumCircuitStructure {
    pub fn new(number_of_quantum_bits: usize) -> Self {
        Self {
            number_of_quantum_bits,
            operations: Vec::new(),
        }
    }

    pub fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    pub fn gate_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[CircuitOperation] {
        &self.operations
    }

    /// Names of every symbolic angle in the circuit.
    pub fn parameter_names(&self) -> BTreeSet<String> {
        self.operations
            .iter()
            .filter_map(CircuitOperation::angle)
            .filter_map(|angle| match angle {
                RotationAngle::Symbol(name) => Some(name.clone()),
                RotationAngle::Fixed(_) => None,
            })
            .collect()
    }

    pub fn add_operation(&mut self, operation: CircuitOperation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    pub fn apply_hadamard_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::Hadamard { qubit })
    }

    pub fn apply_pauli_x_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::PauliX { qubit })
    }

    pub fn apply_pauli_y_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::PauliY { qubit })
    }

    pub fn apply_pauli_z_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::PauliZ { qubit })
    }

    pub fn apply_phase_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::Phase { qubit })
    }

    pub fn apply_phase_dagger_gate(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(CircuitOperation::PhaseDagger { qubit })
    }

    pub fn apply_rotation_x_gate(&mut self, qubit: usize, angle: impl Into<RotationAngle>) -> &mut Self {
        self.add_operation(CircuitOperation::RotationX {
            qubit,
            angle: angle.into(),
        })
    }

    pub fn apply_rotation_y_gate(&mut self, qubit: usize, angle: impl Into<RotationAngle>) -> &mut Self {
        self.add_operation(CircuitOperation::RotationY {
            qubit,
            angle: angle.into(),
        })
    }

    pub fn apply_rotation_z_gate(&mut self, qubit: usize, angle: impl Into<RotationAngle>) -> &mut Self {
        self.add_operation(CircuitOperation::RotationZ {
            qubit,
            angle: angle.into(),
        })
    }

    pub fn apply_controlled_not_gate(&mut self, control: usize, target: usize) -> &mut Self {
        self.add_operation(CircuitOperation::ControlledNot { control, target })
    }

    /// Applies every operation to `state` in order.
    pub fn execute_on(
        &self,
        state: &mut QuantumStateVector,
        parameter_values: &BTreeMap<String, f64>,
    ) -> CircuitResult<()> {
        if state.number_of_quantum_bits() != self.number_of_quantum_bits {
            return Err(CircuitError::DimensionMismatch {
                expected: 1 << self.number_of_quantum_bits,
                actual: state.dimension(),
            });
        }
        for operation in &self.operations {
            operation
                .bind(parameter_values)?
                .apply_to_full_state_vector(state)?;
        }
        Ok(())
    }

    /// Runs the circuit from `|0…0⟩`.
    pub fn prepare_state(
        &self,
        parameter_values: &BTreeMap<String, f64>,
    ) -> CircuitResult<QuantumStateVector> {
        let mut state = QuantumStateVector::zero_state(self.number_of_quantum_bits);
        self.execute_on(&mut state, parameter_values)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_circuit_creation() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(0).apply_controlled_not_gate(0, 1);
        assert_eq!(circuit.number_of_quantum_bits(), 2);
        assert_eq!(circuit.gate_count(), 2);
        assert!(circuit.parameter_names().is_empty());
    }

    #[test]
    fn test_symbolic_rotation_binding() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_rotation_y_gate(0, "theta");
        assert_eq!(
            circuit.parameter_names().into_iter().collect::<Vec<_>>(),
            vec!["theta".to_string()]
        );

        let mut values = BTreeMap::new();
        values.insert("theta".to_string(), PI);
        let state = circuit.prepare_state(&values).unwrap();
        assert!((state.expectation_value_pauli_z(0).unwrap() + 1.0).abs() < 1e-10);

        assert_eq!(
            circuit.prepare_state(&BTreeMap::new()),
            Err(CircuitError::UnboundParameter("theta".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_gate_fails_preparation() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_pauli_x_gate(3);
        assert!(matches!(
            circuit.prepare_state(&BTreeMap::new()),
            Err(CircuitError::QubitOutOfRange { qubit: 3, .. })
        ));
    }

    #[test]
    fn test_circuit_serde_round_trip() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit
            .apply_rotation_x_gate(0, 0.25)
            .apply_rotation_z_gate(1, "phi")
            .apply_controlled_not_gate(1, 0);
        let json = serde_json::to_string(&circuit).unwrap();
        assert!(json.contains("\"gate\":\"rotation_z\""));
        let parsed: QuantumCircuitStructure = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, circuit);
    }
}
