//! Benchmark support crate for grove.
//!
//! Provides seeded datasets, index fixtures, and recall scoring used by the
//! Criterion benchmarks for graph construction and search.

pub mod error;
pub mod fixture;
pub mod params;
pub mod recall;
pub mod source;
