//! Adjacency list of a single graph node.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Directed edge to a neighbouring object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Edge {
    pub(crate) id: usize,
    pub(crate) distance: f32,
}

impl Edge {
    pub(crate) const fn new(id: usize, distance: f32) -> Self {
        Self { id, distance }
    }

    fn order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

/// Edges sorted ascending by `(distance, id)`; ids are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Node {
    edges: Vec<Edge>,
}

impl Node {
    pub(crate) fn from_edges(mut edges: Vec<Edge>, bound: usize) -> Self {
        edges.sort_by(Edge::order);
        let mut seen = std::collections::HashSet::with_capacity(edges.len());
        edges.retain(|edge| seen.insert(edge.id));
        edges.truncate(bound);
        Self { edges }
    }

    #[rustfmt::skip]
    pub(crate) fn edges(&self) -> &[Edge] { &self.edges }

    #[cfg(test)]
    #[rustfmt::skip]
    pub(crate) fn degree(&self) -> usize { self.edges.len() }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.edges.iter().any(|edge| edge.id == id)
    }

    /// Offers `edge` under a degree bound.
    ///
    /// A full list only accepts an edge that orders strictly before its
    /// current weakest edge, which is then evicted. Returns whether the list
    /// changed.
    pub(crate) fn offer(&mut self, edge: Edge, bound: usize) -> bool {
        if bound == 0 || self.contains(edge.id) {
            return false;
        }
        let position = self
            .edges
            .partition_point(|existing| existing.order(&edge) == Ordering::Less);
        if self.edges.len() < bound {
            self.edges.insert(position, edge);
            return true;
        }
        if position >= self.edges.len() {
            return false;
        }
        self.edges.insert(position, edge);
        self.edges.truncate(bound);
        true
    }

    /// Replaces every edge, keeping the closest `bound`.
    pub(crate) fn replace(&mut self, edges: Vec<Edge>, bound: usize) {
        *self = Self::from_edges(edges, bound);
    }

    /// Drops the edge to `id`; returns whether one existed.
    pub(crate) fn remove(&mut self, id: usize) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != id);
        self.edges.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn offer_keeps_order_and_evicts_the_weakest() {
        let mut node = Node::default();
        assert!(node.offer(Edge::new(1, 0.5), 2));
        assert!(node.offer(Edge::new(2, 0.1), 2));
        assert!(node.offer(Edge::new(3, 0.3), 2));
        assert_eq!(
            node.edges().iter().map(|edge| edge.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[rstest]
    fn offer_rejects_duplicates_and_ties_at_capacity() {
        let mut node = Node::default();
        assert!(node.offer(Edge::new(1, 0.5), 1));
        assert!(!node.offer(Edge::new(1, 0.1), 1));
        assert!(!node.offer(Edge::new(9, 0.5), 1));
        assert_eq!(node.edges(), &[Edge::new(1, 0.5)]);
    }

    #[rstest]
    fn remove_reports_presence() {
        let mut node = Node::from_edges(vec![Edge::new(4, 1.0), Edge::new(2, 0.5)], 4);
        assert!(node.remove(4));
        assert!(!node.remove(4));
        assert_eq!(node.degree(), 1);
    }

    proptest! {
        #[test]
        fn offers_stay_sorted_bounded_and_order_independent(
            distances in proptest::collection::vec(0.0_f32..100.0, 1..64),
            bound in 1_usize..12,
        ) {
            let edges: Vec<Edge> = distances
                .iter()
                .enumerate()
                .map(|(id, &distance)| Edge::new(id, distance))
                .collect();

            let mut forward = Node::default();
            for edge in &edges {
                forward.offer(*edge, bound);
            }
            let mut backward = Node::default();
            for edge in edges.iter().rev() {
                backward.offer(*edge, bound);
            }

            prop_assert!(forward.degree() <= bound);
            prop_assert!(forward
                .edges()
                .windows(2)
                .all(|pair| pair[0].order(&pair[1]) == Ordering::Less));
            prop_assert_eq!(forward.edges(), backward.edges());
            prop_assert_eq!(forward, Node::from_edges(edges, bound));
        }
    }
}
