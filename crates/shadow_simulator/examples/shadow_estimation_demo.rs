//! Estimates Ising observables of a parameterized two-qubit state with
//! classical shadows and prints them next to the exact values.
//!
//! Options may be supplied as a TOML or JSON file path argument; otherwise
//! accuracy 0.2 and confidence 0.05 are used.

use anyhow::{Context, Result};
use shadow_runtime::manager::{MeasurementManager, ShadowMeasurementManager};
use shadow_runtime::observable::{PauliSumObservable, ShadowObservableInterface};
use shadow_runtime::options::ProtocolOptions;
use shadow_simulator::circuit_program::QuantumCircuitStructure;
use shadow_simulator::sampling::{SimulatorConfiguration, StateVectorSamplingBackend};
use std::sync::Arc;
use tracing::Level;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let options = match std::env::args().nth(1) {
        Some(path) => ProtocolOptions::from_file(&path)
            .with_context(|| format!("loading protocol options from {path}"))?,
        None => ProtocolOptions::new()
            .with_accuracy(0.2)
            .with_confidence(0.05)
            .with_seed(2024),
    };

    let theta = 0.6;
    let mut circuit = QuantumCircuitStructure::new(2);
    circuit
        .apply_rotation_y_gate(0, "theta")
        .apply_controlled_not_gate(0, 1)
        .apply_hadamard_gate(1);

    let backend = StateVectorSamplingBackend::with_configuration(
        circuit.clone(),
        SimulatorConfiguration {
            backend_name: "demo_state_vector".to_string(),
            seed: Some(7),
        },
    );

    let observables = vec![
        PauliSumObservable::total_magnetization(2)?.into_handle(),
        PauliSumObservable::ising_zz(2, 1.0)?.into_handle(),
        PauliSumObservable::from_pauli_string("ZX", 1.0)?.into_handle(),
    ];

    let mut manager = ShadowMeasurementManager::builder()
        .with_options(options)
        .with_backend(Arc::new(backend))
        .with_observables(observables.clone())
        .with_parameter("theta", theta)
        .build()?;

    let data = manager.measure()?;
    let estimates = manager.expectation(None)?;

    let exact_state = circuit.prepare_state(&manager.state_preparation().parameter_values)?;
    let exact_density = exact_state.density_matrix();

    println!("shadow size: {}", data.shadow_size());
    for (observable, estimate) in observables.iter().zip(&estimates) {
        let exact = observable.expectation_on_density(&exact_density);
        println!(
            "{:<22} estimate {:+.4}  exact {:+.4}",
            observable.observable_name(),
            estimate,
            exact
        );
    }

    let reconstructed = manager.reconstruct_state()?;
    let amplitudes = exact_state.amplitudes().to_vec();
    println!(
        "reconstruction: purity {:.4}, fidelity {:.4}",
        reconstructed.purity(),
        reconstructed.fidelity_with_state_vector(&amplitudes)?
    );
    Ok(())
}
