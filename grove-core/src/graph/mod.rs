//! Graph repository: one lock-protected adjacency list per linked object.
//!
//! Slots mirror object ids. A slot holds `None` until the object is linked,
//! and again after an eager removal. Individual node locks let parallel
//! linking workers mutate disjoint nodes while searches hold read locks.

mod node;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

pub(crate) use self::node::{Edge, Node};
use crate::error::{IndexError, Result};

const NODE_RESOURCE: &str = "graph node";

fn poisoned<T>(_: PoisonError<T>) -> IndexError {
    IndexError::LockPoisoned {
        resource: NODE_RESOURCE,
    }
}

/// Serialisable adjacency lists, indexed by object id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct GraphImage {
    pub(crate) nodes: Vec<Option<Vec<Edge>>>,
}

#[derive(Debug, Default)]
pub(crate) struct GraphRepository {
    nodes: Vec<RwLock<Option<Node>>>,
}

impl GraphRepository {
    /// Grows the slot table so every object id below `capacity` has a slot.
    pub(crate) fn ensure_slots(&mut self, capacity: usize) {
        if self.nodes.len() < capacity {
            self.nodes.resize_with(capacity, || RwLock::new(None));
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional);
    }

    #[rustfmt::skip]
    pub(crate) fn slots(&self) -> usize { self.nodes.len() }

    fn slot(&self, id: usize) -> Result<&RwLock<Option<Node>>> {
        self.nodes.get(id).ok_or_else(|| IndexError::GraphInvariant {
            message: format!("graph has no slot for object {id}"),
        })
    }

    pub(crate) fn read(&self, id: usize) -> Result<RwLockReadGuard<'_, Option<Node>>> {
        self.slot(id)?.read().map_err(poisoned)
    }

    pub(crate) fn write(&self, id: usize) -> Result<RwLockWriteGuard<'_, Option<Node>>> {
        self.slot(id)?.write().map_err(poisoned)
    }

    pub(crate) fn is_linked(&self, id: usize) -> Result<bool> {
        match self.nodes.get(id) {
            Some(slot) => Ok(slot.read().map_err(poisoned)?.is_some()),
            None => Ok(false),
        }
    }

    /// Gives `id` an empty adjacency list if it has none.
    pub(crate) fn attach(&self, id: usize) -> Result<()> {
        let mut slot = self.write(id)?;
        if slot.is_none() {
            *slot = Some(Node::default());
        }
        Ok(())
    }

    /// Offers an edge from `from`; unlinked nodes ignore the offer.
    pub(crate) fn offer(&self, from: usize, edge: Edge, bound: usize) -> Result<bool> {
        let mut slot = self.write(from)?;
        Ok(slot
            .as_mut()
            .is_some_and(|node| node.offer(edge, bound)))
    }

    /// Removes and returns the node of `id`.
    pub(crate) fn detach(&mut self, id: usize) -> Result<Option<Node>> {
        match self.nodes.get_mut(id) {
            Some(slot) => Ok(slot.get_mut().map_err(poisoned)?.take()),
            None => Ok(None),
        }
    }

    /// Exclusive iteration over linked nodes, for whole-graph edits.
    pub(crate) fn linked_mut(&mut self) -> impl Iterator<Item = Result<(usize, &mut Node)>> {
        self.nodes
            .iter_mut()
            .enumerate()
            .filter_map(|(id, slot)| match slot.get_mut() {
                Ok(Some(node)) => Some(Ok((id, node))),
                Ok(None) => None,
                Err(error) => Some(Err(poisoned(error))),
            })
    }

    /// Ids that currently own an adjacency list.
    pub(crate) fn linked_ids(&self) -> Result<Vec<usize>> {
        let mut ids = Vec::new();
        for (id, slot) in self.nodes.iter().enumerate() {
            if slot.read().map_err(poisoned)?.is_some() {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    #[cfg(test)]
    pub(crate) fn linked_count(&self) -> Result<usize> {
        self.linked_ids().map(|ids| ids.len())
    }

    pub(crate) fn image(&self) -> Result<GraphImage> {
        let nodes = self
            .nodes
            .iter()
            .map(|slot| {
                let guard = slot.read().map_err(poisoned)?;
                Ok(guard.as_ref().map(|node| node.edges().to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GraphImage { nodes })
    }

    /// Rebuilds the repository, checking that every edge targets a slot
    /// below `capacity` and that no list exceeds `bound`.
    pub(crate) fn from_image(image: GraphImage, capacity: usize, bound: usize) -> std::result::Result<Self, String> {
        if image.nodes.len() > capacity {
            return Err(format!(
                "graph has {} slots but only {capacity} objects exist",
                image.nodes.len()
            ));
        }
        let mut graph = Self::default();
        graph.ensure_slots(capacity);
        for (id, edges) in image.nodes.into_iter().enumerate() {
            let Some(edges) = edges else { continue };
            if let Some(edge) = edges.iter().find(|edge| edge.id >= capacity || edge.id == id) {
                return Err(format!("node {id} has an invalid edge to {}", edge.id));
            }
            if let Some(slot) = graph.nodes.get_mut(id) {
                *slot = RwLock::new(Some(Node::from_edges(edges, bound)));
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn graph() -> GraphRepository {
        let mut graph = GraphRepository::default();
        graph.ensure_slots(4);
        graph
    }

    #[rstest]
    fn offers_only_reach_attached_nodes(graph: GraphRepository) {
        assert!(!graph.offer(0, Edge::new(1, 1.0), 3).expect("offer"));
        graph.attach(0).expect("attach");
        assert!(graph.offer(0, Edge::new(1, 1.0), 3).expect("offer"));
        assert_eq!(graph.linked_ids().expect("ids"), vec![0]);
        assert!(graph.is_linked(0).expect("linked"));
        assert!(!graph.is_linked(42).expect("out of range is unlinked"));
    }

    #[rstest]
    fn detach_empties_the_slot(mut graph: GraphRepository) {
        graph.attach(2).expect("attach");
        assert!(graph.detach(2).expect("detach").is_some());
        assert!(graph.detach(2).expect("detach").is_none());
        assert_eq!(graph.linked_count().expect("count"), 0);
    }

    #[rstest]
    fn reading_a_missing_slot_is_an_invariant_violation(graph: GraphRepository) {
        let error = graph.read(9).expect_err("slot 9 does not exist");
        assert!(matches!(error, IndexError::GraphInvariant { .. }));
    }

    #[rstest]
    fn images_reject_dangling_edges(graph: GraphRepository) {
        graph.attach(0).expect("attach");
        graph.offer(0, Edge::new(3, 1.0), 2).expect("offer");
        let image = graph.image().expect("image");
        assert!(GraphRepository::from_image(image.clone(), 4, 2).is_ok());
        assert!(GraphRepository::from_image(image, 3, 2).is_err());
    }
}
