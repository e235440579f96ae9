//! Graph construction benchmarks.
//!
//! Measures parallel batch insertion across dataset sizes, edge bounds, and
//! worker counts.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

use grove_benches::{
    error::BenchSetupError,
    fixture::IndexFixture,
    params::BuildBenchParams,
    source::{SyntheticConfig, generate},
};

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Vector dimensionality for all benchmark datasets.
const DIMENSIONS: usize = 16;

/// Dataset sizes to benchmark.
const POINT_COUNTS: &[usize] = &[500, 2_000, 5_000];

/// Creation-time edge bounds to benchmark.
const EDGE_SIZES: &[usize] = &[10, 20];

/// Worker counts to benchmark.
const THREADS: &[usize] = &[1, 4];

#[expect(
    clippy::excessive_nesting,
    reason = "Criterion bench_with_input + iter_batched requires deep nesting"
)]
fn graph_build_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("graph_build");
    group.sample_size(10);

    for &point_count in POINT_COUNTS {
        let points = generate(&SyntheticConfig {
            point_count,
            dimensions: DIMENSIONS,
            seed: SEED,
        })?;
        for &edge_size in EDGE_SIZES {
            for &threads in THREADS {
                let params = BuildBenchParams {
                    point_count,
                    edge_size,
                    threads,
                };
                group.bench_with_input(
                    BenchmarkId::from_parameter(params),
                    &params,
                    |b, input| {
                        b.iter_batched(
                            || (),
                            |()| {
                                if let Err(err) = IndexFixture::build(&points, input) {
                                    panic!("graph build failed for {input}: {err}");
                                }
                            },
                            BatchSize::PerIteration,
                        );
                    },
                );
            }
        }
    }

    group.finish();
    Ok(())
}

fn graph_build(c: &mut Criterion) {
    if let Err(err) = graph_build_impl(c) {
        panic!("graph_build benchmark setup failed: {err}");
    }
}

criterion_group!(benches, graph_build);
criterion_main!(benches);
