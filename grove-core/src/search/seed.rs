//! Seed selection for graph traversal.

use crate::error::Result;
use crate::graph::GraphRepository;
use crate::object::{Element, Space};
use crate::tree::VpTree;

/// Fewest seeds handed to a traversal when that many objects are linked.
pub(crate) const SEED_COUNT: usize = 10;

/// How traversals choose their starting objects.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum Seeding {
    /// Best-first descent of the vantage-point tree.
    #[default]
    Tree,
    /// Evenly spaced sample of linked objects.
    Naive,
}

impl Seeding {
    /// Picks seeds for `query`, falling back to the strided sample when the
    /// tree is disabled or has nothing to offer.
    pub(crate) fn seeds<T: Element>(
        self,
        tree: &VpTree,
        space: Space<'_, T>,
        graph: &GraphRepository,
        query: &[T],
        computations: &mut usize,
    ) -> Result<Vec<usize>> {
        if self == Self::Tree && !tree.is_empty() {
            let seeds = tree.seed(space, query, SEED_COUNT, computations);
            if !seeds.is_empty() {
                return Ok(seeds);
            }
        }
        strided_seeds(space, graph, SEED_COUNT)
    }
}

/// Takes `count` evenly spaced ids from the live, linked objects.
fn strided_seeds<T: Element>(space: Space<'_, T>, graph: &GraphRepository, count: usize) -> Result<Vec<usize>> {
    let mut linked = graph.linked_ids()?;
    linked.retain(|id| space.is_live(*id));
    if linked.len() <= count {
        return Ok(linked);
    }
    let stride = linked.len().div_ceil(count);
    Ok(linked.into_iter().step_by(stride).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectRepository, with_space};
    use crate::property::{DistanceType, ObjectType, Property};

    #[test]
    fn strided_seeds_skip_unlinked_and_removed_objects() {
        let property = Property::new(1, ObjectType::Float, DistanceType::L2).expect("valid");
        let mut objects = ObjectRepository::new(&property);
        for value in 0..20_u8 {
            objects.append(&[value]).expect("append");
        }
        objects.remove(0);
        let mut graph = GraphRepository::default();
        graph.ensure_slots(20);
        for id in (0..20).filter(|id| id % 2 == 0) {
            graph.attach(id).expect("attach");
        }

        let seeds = with_space!(&objects, |space| strided_seeds(space, &graph, 5))
            .expect("seeds");
        assert_eq!(seeds, vec![2, 6, 10, 14, 18]);
    }

    #[test]
    fn strided_seeds_spread_over_linked_objects_only() {
        let property = Property::new(1, ObjectType::Float, DistanceType::L2).expect("valid");
        let mut objects = ObjectRepository::new(&property);
        for value in 0..100_u8 {
            objects.append(&[value]).expect("append");
        }
        let mut graph = GraphRepository::default();
        graph.ensure_slots(100);
        for id in 0..30 {
            graph.attach(id).expect("attach");
        }

        let seeds = with_space!(&objects, |space| strided_seeds(space, &graph, 10))
            .expect("seeds");
        assert_eq!(seeds, (0..30).step_by(3).collect::<Vec<_>>());
    }

    #[test]
    fn tree_seeding_falls_back_when_the_tree_is_empty() {
        let property = Property::new(1, ObjectType::Float, DistanceType::L2).expect("valid");
        let mut objects = ObjectRepository::new(&property);
        objects.append(&[1.0_f32]).expect("append");
        let mut graph = GraphRepository::default();
        graph.ensure_slots(1);
        graph.attach(0).expect("attach");

        let seeds = with_space!(&objects, |space| {
            let query = space.encode(&[0.0_f32]).expect("encode");
            Seeding::Tree.seeds(&VpTree::default(), space, &graph, &query, &mut 0)
        })
        .expect("seeds");
        assert_eq!(seeds, vec![0]);
    }
}
