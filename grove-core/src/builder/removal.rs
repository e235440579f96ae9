//! Object removal and graph repair.

use std::collections::HashMap;

use crate::error::Result;
use crate::graph::{Edge, GraphRepository};
use crate::object::{Element, Space};

/// What happens to the graph when an object is removed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RemovalPolicy {
    /// Drop the removed node and every edge pointing at it, then offer the
    /// removed node's live neighbours to each node that lost an edge.
    #[default]
    Eager,
    /// Only tombstone; traversal keeps passing through removed nodes.
    Lazy,
}

/// Per-id outcome of [`crate::Index::remove`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RemovalReport {
    removed: Vec<usize>,
    already_removed: Vec<usize>,
    not_found: Vec<usize>,
}

impl RemovalReport {
    pub(crate) fn record_removed(&mut self, id: usize) {
        self.removed.push(id);
    }

    pub(crate) fn record_already_removed(&mut self, id: usize) {
        self.already_removed.push(id);
    }

    pub(crate) fn record_not_found(&mut self, id: usize) {
        self.not_found.push(id);
    }

    /// Ids tombstoned by this call.
    #[must_use]
    #[rustfmt::skip]
    pub fn removed(&self) -> &[usize] { &self.removed }

    /// Ids that were already tombstoned.
    #[must_use]
    #[rustfmt::skip]
    pub fn already_removed(&self) -> &[usize] { &self.already_removed }

    /// Ids that were never assigned.
    #[must_use]
    #[rustfmt::skip]
    pub fn not_found(&self) -> &[usize] { &self.not_found }
}

/// Excises `removed` from the graph. Returns the number of repaired nodes.
pub(crate) fn excise<T: Element>(
    graph: &mut GraphRepository,
    space: Space<'_, T>,
    removed: &[usize],
    bound: usize,
) -> Result<usize> {
    let mut substitutes: HashMap<usize, Vec<usize>> = HashMap::new();
    for &id in removed {
        if let Some(node) = graph.detach(id)? {
            let live = node
                .edges()
                .iter()
                .map(|edge| edge.id)
                .filter(|candidate| space.is_live(*candidate))
                .collect();
            substitutes.insert(id, live);
        }
    }
    if substitutes.is_empty() {
        return Ok(0);
    }

    let mut repaired = 0;
    for entry in graph.linked_mut() {
        let (id, node) = entry?;
        let lost: Vec<usize> = node
            .edges()
            .iter()
            .map(|edge| edge.id)
            .filter(|target| substitutes.contains_key(target))
            .collect();
        if lost.is_empty() {
            continue;
        }
        repaired += 1;
        for target in &lost {
            node.remove(*target);
        }
        for candidate in lost
            .iter()
            .filter_map(|target| substitutes.get(target))
            .flatten()
        {
            if *candidate != id && space.is_live(*candidate) {
                node.offer(Edge::new(*candidate, space.between(id, *candidate)), bound);
            }
        }
    }
    Ok(repaired)
}
