#![allow(dead_code)]

use std::path::PathBuf;

use grove_core::{DistanceType, Index, ObjectType, Property};
use tempfile::TempDir;

/// Temporary directory plus the index directory inside it.
pub struct Scratch {
    pub dir: TempDir,
    pub path: PathBuf,
}

#[must_use]
pub fn scratch() -> Scratch {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("index");
    Scratch { dir, path }
}

#[must_use]
pub fn float_property(dimension: usize, distance_type: DistanceType) -> Property {
    Property::new(dimension, ObjectType::Float, distance_type).expect("valid property")
}

/// Creates an L2 float index and batch-inserts `points`.
#[must_use]
pub fn built_index(scratch: &Scratch, points: &[Vec<f32>]) -> Index {
    let dimension = points.first().map_or(4, Vec::len);
    let index = Index::create(&scratch.path, float_property(dimension, DistanceType::L2))
        .expect("index created");
    let outcome = index.batch_insert(points, 2).expect("batch insert");
    assert!(outcome.skipped().is_empty());
    index
}

/// The three-point index from the canonical nearest-neighbour scenario.
#[must_use]
pub fn three_points(scratch: &Scratch) -> Index {
    built_index(
        scratch,
        &[
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![10.0, 10.0, 10.0, 10.0],
        ],
    )
}
