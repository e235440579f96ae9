//! Indexes built in scratch directories for benchmarking.

use grove_core::{DistanceType, Index, ObjectType, Property};
use tempfile::TempDir;

use crate::{error::BenchSetupError, params::BuildBenchParams};

/// A built L2 index that lives as long as its scratch directory.
#[derive(Debug)]
pub struct IndexFixture {
    _dir: TempDir,
    index: Index,
}

impl IndexFixture {
    /// Creates an index sized for `points` and inserts them in parallel.
    ///
    /// # Errors
    /// Returns [`BenchSetupError::ZeroValue`] for an empty dataset, and
    /// propagates filesystem and index failures.
    pub fn build(points: &[Vec<f32>], params: &BuildBenchParams) -> Result<Self, BenchSetupError> {
        let dimension = points.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(BenchSetupError::ZeroValue {
                context: "dataset dimension",
            });
        }
        let dir = TempDir::new()?;
        let property = Property::new(dimension, ObjectType::Float, DistanceType::L2)?
            .with_edge_size_for_creation(params.edge_size);
        let index = Index::create(dir.path().join("index"), property)?;
        index.batch_insert(points, params.threads)?;
        Ok(Self { _dir: dir, index })
    }

    /// The built index.
    #[must_use]
    pub const fn index(&self) -> &Index {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SyntheticConfig, generate};

    #[test]
    fn builds_every_point() {
        let points = generate(&SyntheticConfig {
            point_count: 64,
            dimensions: 4,
            seed: 9,
        })
        .expect("valid config");
        let fixture = IndexFixture::build(
            &points,
            &BuildBenchParams {
                point_count: 64,
                edge_size: 8,
                threads: 2,
            },
        )
        .expect("fixture builds");
        assert_eq!(fixture.index().count_objects().expect("open index"), 64);
    }

    #[test]
    fn rejects_empty_datasets() {
        let params = BuildBenchParams {
            point_count: 0,
            edge_size: 8,
            threads: 1,
        };
        assert!(matches!(
            IndexFixture::build(&[], &params),
            Err(BenchSetupError::ZeroValue { .. })
        ));
    }
}
