//! Index construction: linking, removal, refinement, and their worker pools.

mod link;
mod refine;
mod removal;

use rayon::{ThreadPool, ThreadPoolBuilder};

pub(crate) use self::link::Linker;
pub use self::refine::{DEFAULT_REFINE_BATCH_SIZE, RefineParams, RefineSummary};
pub(crate) use self::refine::Refiner;
pub use self::removal::{RemovalPolicy, RemovalReport};
pub(crate) use self::removal::excise;

use crate::error::{IndexError, ObjectError, Result};

/// Builds a pool of `thread_count` workers; zero selects rayon's default.
pub(crate) fn worker_pool(thread_count: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .thread_name(|index| format!("grove-worker-{index}"))
        .build()
        .map_err(|error| IndexError::invalid(format!("cannot start {thread_count} workers: {error}")))
}

/// Input row rejected by [`crate::Index::batch_insert`].
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRow {
    /// Position of the row in the input.
    pub row: usize,
    /// Why the row was rejected.
    pub error: ObjectError,
}

/// Result of [`crate::Index::batch_insert`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchInsertOutcome {
    ids: Vec<usize>,
    skipped: Vec<SkippedRow>,
}

impl BatchInsertOutcome {
    pub(crate) const fn new(ids: Vec<usize>, skipped: Vec<SkippedRow>) -> Self {
        Self { ids, skipped }
    }

    /// Ids assigned to the accepted rows, in input order.
    #[must_use]
    #[rustfmt::skip]
    pub fn ids(&self) -> &[usize] { &self.ids }

    /// Rows that failed validation.
    #[must_use]
    #[rustfmt::skip]
    pub fn skipped(&self) -> &[SkippedRow] { &self.skipped }

    /// Consumes the outcome, returning the assigned ids.
    #[must_use]
    #[rustfmt::skip]
    pub fn into_ids(self) -> Vec<usize> { self.ids }
}
