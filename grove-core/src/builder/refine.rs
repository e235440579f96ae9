//! Graph refinement: re-derive each node's edges from a fresh search.

use std::num::NonZeroUsize;

use rayon::{ThreadPool, prelude::*};
use tracing::info;

use crate::error::{IndexError, Result};
use crate::graph::Edge;
use crate::object::Element;
use crate::search::{DEFAULT_EPSILON, SearchLimits, Seeding, Traversal};
use crate::tree::VpTree;

/// Default number of nodes refined per batch.
pub const DEFAULT_REFINE_BATCH_SIZE: usize = 10_000;

/// Parameters for [`crate::Index::refine`].
///
/// # Examples
/// ```
/// use grove_core::RefineParams;
///
/// let params = RefineParams::default().with_edge_count(8).with_epsilon(0.2);
/// assert_eq!(params.edge_count(), 8);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefineParams {
    epsilon: f32,
    expected_accuracy: Option<f32>,
    edge_count: usize,
    explored_edge_count: usize,
    batch_size: NonZeroUsize,
    thread_count: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            expected_accuracy: None,
            edge_count: 0,
            explored_edge_count: 0,
            batch_size: NonZeroUsize::new(DEFAULT_REFINE_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            thread_count: 0,
        }
    }
}

impl RefineParams {
    /// Search slack used to rediscover neighbours.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Recall target that replaces epsilon; non-positive values are ignored.
    #[must_use]
    pub const fn with_expected_accuracy(mut self, accuracy: f32) -> Self {
        self.expected_accuracy = Some(accuracy);
        self
    }

    /// Edges kept per node; zero keeps the creation bound.
    #[must_use]
    pub const fn with_edge_count(mut self, edges: usize) -> Self {
        self.edge_count = edges;
        self
    }

    /// Edges traversed per node while searching; zero is unlimited.
    #[must_use]
    pub const fn with_explored_edge_count(mut self, edges: usize) -> Self {
        self.explored_edge_count = edges;
        self
    }

    /// Nodes refined between progress reports.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Worker threads; zero uses the available parallelism.
    #[must_use]
    pub const fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    /// Search slack.
    #[must_use]
    #[rustfmt::skip]
    pub const fn epsilon(&self) -> f32 { self.epsilon }

    /// Recall target, if any.
    #[must_use]
    pub fn expected_accuracy(&self) -> Option<f32> {
        self.expected_accuracy
            .filter(|accuracy| accuracy.is_finite() && *accuracy > 0.0)
    }

    /// Edges kept per node (zero: creation bound).
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_count(&self) -> usize { self.edge_count }

    /// Edges traversed per node (zero: all).
    #[must_use]
    #[rustfmt::skip]
    pub const fn explored_edge_count(&self) -> usize { self.explored_edge_count }

    /// Nodes per batch.
    #[must_use]
    #[rustfmt::skip]
    pub const fn batch_size(&self) -> NonZeroUsize { self.batch_size }

    /// Worker threads (zero: default).
    #[must_use]
    #[rustfmt::skip]
    pub const fn thread_count(&self) -> usize { self.thread_count }
}

/// Totals reported by [`crate::Index::refine`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RefineSummary {
    refined_nodes: usize,
    distance_computations: usize,
}

impl RefineSummary {
    /// Nodes whose edge lists were rebuilt.
    #[must_use]
    #[rustfmt::skip]
    pub const fn refined_nodes(&self) -> usize { self.refined_nodes }

    /// Distance evaluations performed.
    #[must_use]
    #[rustfmt::skip]
    pub const fn distance_computations(&self) -> usize { self.distance_computations }
}

struct RefinePlan {
    id: usize,
    edges: Vec<Edge>,
    distance_computations: usize,
}

/// Rebuilds edge lists batch by batch.
pub(crate) struct Refiner<'a, T: Element> {
    pub(crate) traversal: Traversal<'a, T>,
    pub(crate) seeding: Seeding,
    pub(crate) tree: &'a VpTree,
    pub(crate) bound: usize,
    pub(crate) verbose: bool,
}

impl<T: Element> Refiner<'_, T> {
    /// Refines `ids`; `epsilon` is already resolved from any accuracy target.
    pub(crate) fn refine(
        &self,
        ids: &[usize],
        params: &RefineParams,
        epsilon: f32,
        pool: &ThreadPool,
    ) -> Result<RefineSummary> {
        let keep = match params.edge_count {
            0 => self.bound,
            edges => edges.min(self.bound),
        };
        let explored = NonZeroUsize::new(params.explored_edge_count).map(NonZeroUsize::get);
        let limits = SearchLimits::construction(keep + 1, epsilon, explored);

        let mut summary = RefineSummary::default();
        for batch in ids.chunks(params.batch_size.get()) {
            let plans = pool.install(|| {
                batch
                    .par_iter()
                    .map(|&id| self.plan(id, keep, &limits))
                    .collect::<Result<Vec<_>>>()
            })?;

            pool.install(|| {
                plans.par_iter().try_for_each(|plan| {
                    let mut slot = self.traversal.graph.write(plan.id)?;
                    if let Some(node) = slot.as_mut() {
                        node.replace(plan.edges.clone(), self.bound);
                    }
                    Ok::<(), IndexError>(())
                })
            })?;
            pool.install(|| {
                plans.par_iter().try_for_each(|plan| {
                    for edge in &plan.edges {
                        self.traversal
                            .graph
                            .offer(edge.id, Edge::new(plan.id, edge.distance), self.bound)?;
                    }
                    Ok::<(), IndexError>(())
                })
            })?;

            summary.refined_nodes += plans.len();
            summary.distance_computations += plans
                .iter()
                .map(|plan| plan.distance_computations)
                .sum::<usize>();
            if self.verbose {
                info!(
                    processed = summary.refined_nodes,
                    total = ids.len(),
                    "refined graph batch"
                );
            }
        }
        Ok(summary)
    }

    fn plan(&self, id: usize, keep: usize, limits: &SearchLimits) -> Result<RefinePlan> {
        let space = self.traversal.space;
        let query = space.vector(id).ok_or_else(|| IndexError::GraphInvariant {
            message: format!("object {id} has no stored vector"),
        })?;
        let found = self
            .traversal
            .seeded_search(self.seeding, self.tree, query, limits)?;
        let edges = found
            .neighbours
            .iter()
            .filter(|neighbour| neighbour.id != id && space.is_live(neighbour.id))
            .take(keep)
            .map(|neighbour| Edge::new(neighbour.id, neighbour.distance))
            .collect();
        Ok(RefinePlan {
            id,
            edges,
            distance_computations: found.distance_computations,
        })
    }
}
