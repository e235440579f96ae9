//! Seeded synthetic vectors.

use grove_test_support::datasets;

use crate::error::BenchSetupError;

/// Shape of a uniform dataset.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticConfig {
    /// Number of vectors.
    pub point_count: usize,
    /// Elements per vector.
    pub dimensions: usize,
    /// RNG seed.
    pub seed: u64,
}

/// Generates vectors with elements drawn uniformly from `[-1, 1)`.
///
/// # Errors
/// Returns [`BenchSetupError::ZeroValue`] when `dimensions` is zero.
///
/// # Examples
/// ```
/// use grove_benches::source::{SyntheticConfig, generate};
///
/// let config = SyntheticConfig { point_count: 4, dimensions: 3, seed: 7 };
/// let points = generate(&config).expect("non-zero dimensions");
/// assert_eq!(points.len(), 4);
/// assert_eq!(points, generate(&config).expect("non-zero dimensions"));
/// ```
pub fn generate(config: &SyntheticConfig) -> Result<Vec<Vec<f32>>, BenchSetupError> {
    if config.dimensions == 0 {
        return Err(BenchSetupError::ZeroValue {
            context: "dimensions",
        });
    }
    Ok(datasets::uniform(config.point_count, config.dimensions, config.seed))
}
