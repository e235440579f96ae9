//! Deterministic synthetic vectors for tests and benchmarks.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// `count` vectors drawn uniformly from `[-1, 1)^dimension`.
///
/// # Examples
/// ```
/// use grove_test_support::datasets::uniform;
///
/// let points = uniform(8, 3, 7);
/// assert_eq!(points.len(), 8);
/// assert_eq!(points, uniform(8, 3, 7));
/// ```
#[must_use]
pub fn uniform(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

/// `count` vectors scattered around `clusters` centres in `[-10, 10)^dimension`
/// with unit-box noise. Members are assigned to centres round-robin.
#[must_use]
pub fn clustered(count: usize, dimension: usize, clusters: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let centres: Vec<Vec<f32>> = (0..clusters.max(1))
        .map(|_| (0..dimension).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect();
    (0..count)
        .map(|index| {
            centres[index % centres.len()]
                .iter()
                .map(|centre| centre + rng.gen_range(-1.0..1.0))
                .collect()
        })
        .collect()
}

/// `count` byte vectors drawn uniformly.
#[must_use]
pub fn bytes(count: usize, dimension: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.r#gen::<u8>()).collect())
        .collect()
}
