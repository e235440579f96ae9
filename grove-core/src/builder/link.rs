//! Graph construction: single-object and round-based parallel linking.
//!
//! Parallel linking runs in rounds. Phase one searches every member of a
//! round against the graph and seed tree as they stood when the round began
//! and also compares each member with the members before it in the same
//! round. After a barrier, phase two applies forward and reverse edges with
//! bounded insertion under per-node write locks, and the round's members join
//! the seed tree. Bounded insertion keeps the closest offered edges, so the
//! finished graph does not depend on how workers interleave.

use std::collections::HashSet;

use rayon::{ThreadPool, prelude::*};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::graph::Edge;
use crate::neighbour::Neighbour;
use crate::object::Element;
use crate::search::{SearchLimits, Seeding, Traversal};
use crate::tree::VpTree;

/// Epsilon used while searching for a new node's neighbours.
pub(crate) const BUILD_EPSILON: f32 = 0.1;
/// Round length per worker thread.
const ROUND_FACTOR: usize = 32;

#[derive(Debug)]
struct LinkPlan {
    id: usize,
    neighbours: Vec<Neighbour>,
    distance_computations: usize,
}

/// Links objects into the graph.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Linker<'a, T: Element> {
    traversal: Traversal<'a, T>,
    seeding: Seeding,
    bound: usize,
}

impl<'a, T: Element> Linker<'a, T> {
    pub(crate) const fn new(traversal: Traversal<'a, T>, seeding: Seeding, bound: usize) -> Self {
        Self {
            traversal,
            seeding,
            bound,
        }
    }

    /// Links one object on the calling thread and adds it to `tree`. Returns
    /// the number of distance evaluations.
    pub(crate) fn link_one(&self, tree: &mut VpTree, id: usize) -> Result<usize> {
        let plan = self.plan(tree, &[], 0, id)?;
        self.traversal.graph.attach(id)?;
        self.apply(&plan)?;
        tree.insert(self.traversal.space, id);
        Ok(plan.distance_computations)
    }

    /// Links `ids` in rounds sized to the pool, adding each round to `tree`
    /// once its edges are in place. Returns the number of distance
    /// evaluations.
    pub(crate) fn link_all(&self, tree: &mut VpTree, ids: &[usize], pool: &ThreadPool) -> Result<usize> {
        let round_len = pool.current_num_threads().max(1) * ROUND_FACTOR;
        let mut computations = 0;
        for (round_index, round) in ids.chunks(round_len).enumerate() {
            let seeds_from: &VpTree = tree;
            let plans = pool.install(|| {
                round
                    .par_iter()
                    .enumerate()
                    .map(|(position, &id)| self.plan(seeds_from, round, position, id))
                    .collect::<Result<Vec<_>>>()
            })?;

            for plan in &plans {
                self.traversal.graph.attach(plan.id)?;
            }
            pool.install(|| plans.par_iter().try_for_each(|plan| self.apply(plan)))?;
            for &id in round {
                tree.insert(self.traversal.space, id);
            }

            computations += plans
                .iter()
                .map(|plan| plan.distance_computations)
                .sum::<usize>();
            debug!(round = round_index, members = round.len(), "linked round");
        }
        Ok(computations)
    }

    fn plan(&self, tree: &VpTree, round: &[usize], position: usize, id: usize) -> Result<LinkPlan> {
        let space = self.traversal.space;
        let query = space.vector(id).ok_or_else(|| IndexError::GraphInvariant {
            message: format!("object {id} has no stored vector"),
        })?;

        let limits = SearchLimits::construction(self.bound, BUILD_EPSILON, None);
        let found = self
            .traversal
            .seeded_search(self.seeding, tree, query, &limits)?;
        let mut neighbours = found.neighbours;
        let mut distance_computations = found.distance_computations;

        for &earlier in round.iter().take(position) {
            if space.is_live(earlier) {
                neighbours.push(Neighbour {
                    id: earlier,
                    distance: space.distance_to(earlier, query),
                });
                distance_computations += 1;
            }
        }

        neighbours.sort_unstable();
        let mut seen = HashSet::with_capacity(neighbours.len());
        neighbours.retain(|neighbour| neighbour.id != id && seen.insert(neighbour.id));
        neighbours.truncate(self.bound);

        Ok(LinkPlan {
            id,
            neighbours,
            distance_computations,
        })
    }

    fn apply(&self, plan: &LinkPlan) -> Result<()> {
        let graph = self.traversal.graph;
        for neighbour in &plan.neighbours {
            graph.offer(plan.id, Edge::new(neighbour.id, neighbour.distance), self.bound)?;
        }
        for neighbour in &plan.neighbours {
            graph.offer(neighbour.id, Edge::new(plan.id, neighbour.distance), self.bound)?;
        }
        Ok(())
    }
}
