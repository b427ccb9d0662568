//! Benchmarks for snapshot inversion and median-of-means estimation

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shadow_runtime::prelude::*;
use std::hint::black_box;

/// Random single-shot data with uniformly random bits
fn single_shot_data(shadow_size: usize, number_of_quantum_bits: usize) -> MeasurementData {
    let mut rng = StdRng::seed_from_u64(42);
    let unitaries = random_bases(&mut rng, shadow_size, number_of_quantum_bits);
    let samples = (0..shadow_size)
        .map(|_| {
            MeasurementOutcome::Bitstring(
                (0..number_of_quantum_bits)
                    .map(|_| rng.random_range(0..2u8))
                    .collect(),
            )
        })
        .collect();
    MeasurementData::new(unitaries, samples).unwrap()
}

/// Expectation values of Ising observables for growing shadow sizes
fn bench_expectation(c: &mut Criterion) {
    let mut group = c.benchmark_group("shadow_expectation");
    let estimator = ShadowEstimator::new();
    let observables = vec![
        PauliSumObservable::total_magnetization(4).unwrap().into_handle(),
        PauliSumObservable::ising_zz(4, 1.0).unwrap().into_handle(),
    ];

    for shadow_size in [1_000, 10_000] {
        let data = single_shot_data(shadow_size, 4);
        group.throughput(Throughput::Elements(shadow_size as u64));
        group.bench_with_input(
            BenchmarkId::new("pauli_sum", shadow_size),
            &data,
            |bencher, data| {
                bencher.iter(|| {
                    estimator
                        .expectation_values(black_box(data), &observables, 6)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

/// Dense reconstruction for growing qubit counts
fn bench_reconstruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("shadow_reconstruction");
    let estimator = ShadowEstimator::new();

    for number_of_quantum_bits in [1, 3, 5] {
        let data = single_shot_data(500, number_of_quantum_bits);
        group.bench_with_input(
            BenchmarkId::new("dense_mean", number_of_quantum_bits),
            &data,
            |bencher, data| {
                bencher.iter(|| estimator.reconstruct_state(black_box(data)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_median_of_means(c: &mut Criterion) {
    let values: Vec<f64> = (0..100_000).map(|i| ((i * 37) % 101) as f64).collect();
    c.bench_function("median_of_means_100k", |bencher| {
        bencher.iter(|| median_of_means(black_box(&values), 12).unwrap());
    });
}

criterion_group!(
    benches,
    bench_expectation,
    bench_reconstruction,
    bench_median_of_means
);
criterion_main!(benches);
