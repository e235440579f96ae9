//! Vantage-point tree used to pick search seeds.
//!
//! Nodes live in an arena. Internal nodes split their members around a pivot
//! at the median pivot distance; leaves hold member ids. The tree refers to
//! objects by id only and never touches the graph.

use std::collections::BinaryHeap;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::neighbour::ReverseNeighbour;
use crate::object::{Element, Space};

/// Maximum members held by a leaf before it splits.
pub(crate) const DEFAULT_LEAF_CAPACITY: usize = 100;
const DEFAULT_TREE_SEED: u64 = 0x7265_6573_6565_6473;
const ROOT: usize = 0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        members: Vec<usize>,
    },
    Split {
        pivot: usize,
        radius: f32,
        inside: usize,
        outside: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct VpTree {
    nodes: Vec<TreeNode>,
    leaf_capacity: usize,
    seed: u64,
    len: usize,
}

impl Default for VpTree {
    fn default() -> Self {
        Self::empty(DEFAULT_LEAF_CAPACITY, DEFAULT_TREE_SEED)
    }
}

impl VpTree {
    fn empty(leaf_capacity: usize, seed: u64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf {
                members: Vec::new(),
            }],
            leaf_capacity: leaf_capacity.max(2),
            seed,
            len: 0,
        }
    }

    /// Builds a tree over `ids` from scratch.
    pub(crate) fn build<T: Element>(space: Space<'_, T>, ids: Vec<usize>) -> Self {
        Self::build_with(space, ids, DEFAULT_LEAF_CAPACITY, DEFAULT_TREE_SEED)
    }

    pub(crate) fn build_with<T: Element>(
        space: Space<'_, T>,
        ids: Vec<usize>,
        leaf_capacity: usize,
        seed: u64,
    ) -> Self {
        let mut tree = Self::empty(leaf_capacity, seed);
        tree.len = ids.len();
        let mut rng = SmallRng::seed_from_u64(seed);
        tree.fill(space, ROOT, ids, &mut rng);
        tree
    }

    /// Members added since the last rebuild, removed ones included.
    #[rustfmt::skip]
    pub(crate) fn len(&self) -> usize { self.len }

    #[rustfmt::skip]
    pub(crate) fn is_empty(&self) -> bool { self.len == 0 }

    fn fill<T: Element>(&mut self, space: Space<'_, T>, slot: usize, mut ids: Vec<usize>, rng: &mut SmallRng) {
        if ids.len() <= self.leaf_capacity {
            self.set(slot, TreeNode::Leaf { members: ids });
            return;
        }

        let pivot = ids.swap_remove(rng.gen_range(0..ids.len()));
        let mut ranked: Vec<(f32, usize)> = ids
            .into_iter()
            .map(|id| (space.between(pivot, id), id))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let outside_ranked = ranked.split_off(ranked.len() / 2);
        let radius = ranked.last().map_or(0.0, |(distance, _)| *distance);
        let mut inside: Vec<usize> = ranked.into_iter().map(|(_, id)| id).collect();
        inside.push(pivot);
        let outside: Vec<usize> = outside_ranked.into_iter().map(|(_, id)| id).collect();

        let inside_slot = self.alloc();
        let outside_slot = self.alloc();
        self.set(
            slot,
            TreeNode::Split {
                pivot,
                radius,
                inside: inside_slot,
                outside: outside_slot,
            },
        );
        self.fill(space, inside_slot, inside, rng);
        self.fill(space, outside_slot, outside, rng);
    }

    fn alloc(&mut self) -> usize {
        self.nodes.push(TreeNode::Leaf {
            members: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn set(&mut self, slot: usize, node: TreeNode) {
        if let Some(existing) = self.nodes.get_mut(slot) {
            *existing = node;
        }
    }

    /// Adds `id` to the leaf its vector descends to, splitting the leaf when
    /// it overflows.
    pub(crate) fn insert<T: Element>(&mut self, space: Space<'_, T>, id: usize) {
        let mut slot = ROOT;
        while let Some(TreeNode::Split {
            pivot,
            radius,
            inside,
            outside,
        }) = self.nodes.get(slot)
        {
            slot = if space.between(*pivot, id) <= *radius {
                *inside
            } else {
                *outside
            };
        }

        let overflow = match self.nodes.get_mut(slot) {
            Some(TreeNode::Leaf { members }) => {
                members.push(id);
                (members.len() > self.leaf_capacity).then(|| std::mem::take(members))
            }
            _ => None,
        };
        self.len += 1;

        if let Some(members) = overflow {
            let mut rng = SmallRng::seed_from_u64(self.seed ^ (slot as u64).rotate_left(32) ^ id as u64);
            self.fill(space, slot, members, &mut rng);
        }
    }

    /// Gathers every live member of the leaves nearest `query`.
    ///
    /// Leaves are visited in order of their distance lower bound. Visiting
    /// stops once at least `count` members are gathered and no remaining leaf
    /// could contain `query` itself, so a stored vector always finds the leaf
    /// that holds it. Removed members stay in their leaves until the tree is
    /// rebuilt and are skipped here.
    pub(crate) fn seed<T: Element>(
        &self,
        space: Space<'_, T>,
        query: &[T],
        count: usize,
        computations: &mut usize,
    ) -> Vec<usize> {
        let mut seeds = Vec::new();
        if self.is_empty() || count == 0 {
            return seeds;
        }

        let mut frontier = BinaryHeap::new();
        frontier.push(ReverseNeighbour::new(ROOT, 0.0));
        while let Some(ReverseNeighbour { inner }) = frontier.pop() {
            if seeds.len() >= count && inner.distance > 0.0 {
                break;
            }
            match self.nodes.get(inner.id) {
                Some(TreeNode::Leaf { members }) => {
                    seeds.extend(members.iter().copied().filter(|id| space.is_live(*id)));
                }
                Some(TreeNode::Split {
                    pivot,
                    radius,
                    inside,
                    outside,
                }) => {
                    let distance = space.distance_to(*pivot, query);
                    *computations += 1;
                    let (near, far, gap) = if distance <= *radius {
                        (*inside, *outside, *radius - distance)
                    } else {
                        (*outside, *inside, distance - *radius)
                    };
                    frontier.push(ReverseNeighbour::new(near, inner.distance));
                    frontier.push(ReverseNeighbour::new(far, inner.distance.max(gap)));
                }
                None => {}
            }
        }
        seeds
    }

    #[cfg(test)]
    fn members(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Leaf { members } => Some(members.clone()),
                TreeNode::Split { .. } => None,
            })
            .flatten()
            .collect();
        ids.sort_unstable();
        ids
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn walk(tree: &VpTree, slot: usize) -> usize {
            match tree.nodes.get(slot) {
                Some(TreeNode::Split { inside, outside, .. }) => {
                    1 + walk(tree, *inside).max(walk(tree, *outside))
                }
                _ => 1,
            }
        }
        walk(self, ROOT)
    }
}
