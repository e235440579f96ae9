//! Search engine: seed, expand, terminate.

mod engine;
mod params;
mod seed;

pub(crate) use self::engine::{Found, Traversal};
pub use self::params::{DEFAULT_EPSILON, DEFAULT_SIZE, SearchDefaults, SearchOutcome, SearchParams};
pub(crate) use self::params::SearchLimits;
pub(crate) use self::seed::Seeding;

use crate::error::Result;
use crate::object::Element;
use crate::tree::VpTree;

impl<T: Element> Traversal<'_, T> {
    /// Seeds with `seeding`, then traverses. Seed-selection distance
    /// evaluations are included in the returned count.
    pub(crate) fn seeded_search(
        &self,
        seeding: Seeding,
        tree: &VpTree,
        query: &[T],
        limits: &SearchLimits,
    ) -> Result<Found> {
        let mut seeding_computations = 0;
        let seeds = seeding.seeds(tree, self.space, self.graph, query, &mut seeding_computations)?;
        let mut found = self.search(&seeds, query, limits)?;
        found.distance_computations += seeding_computations;
        Ok(found)
    }
}
