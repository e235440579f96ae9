//! Epsilon-bounded best-first traversal of the proximity graph.
//!
//! A bounded max-heap holds the best results so far and a min-heap holds the
//! frontier. Once the result set is full, only candidates within
//! `(1 + epsilon)` times the current worst result are explored; popping a
//! candidate beyond that radius ends the search.

use std::collections::{BinaryHeap, HashSet};

use super::params::SearchLimits;
use crate::error::Result;
use crate::graph::GraphRepository;
use crate::neighbour::{Neighbour, ReverseNeighbour};
use crate::object::{Element, Space};

/// Everything a traversal reads: typed objects plus adjacency lists.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Traversal<'a, T: Element> {
    pub(crate) space: Space<'a, T>,
    pub(crate) graph: &'a GraphRepository,
}

/// Results of one traversal, closest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Found {
    pub(crate) neighbours: Vec<Neighbour>,
    pub(crate) distance_computations: usize,
}

#[derive(Debug)]
struct SearchState {
    visited: HashSet<usize>,
    frontier: BinaryHeap<ReverseNeighbour>,
    results: BinaryHeap<Neighbour>,
    size: usize,
    expansion: f32,
    radius: f32,
    distance_computations: usize,
}

impl SearchState {
    fn new(limits: &SearchLimits) -> Self {
        Self {
            visited: HashSet::new(),
            frontier: BinaryHeap::new(),
            results: BinaryHeap::with_capacity(limits.size + 1),
            size: limits.size,
            expansion: 1.0 + limits.epsilon,
            radius: limits.radius,
            distance_computations: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.size
    }

    fn worst(&self) -> f32 {
        self.results
            .peek()
            .map_or(f32::INFINITY, |worst| worst.distance)
    }

    fn exploration_radius(&self) -> f32 {
        if self.is_full() {
            self.worst() * self.expansion
        } else {
            f32::INFINITY
        }
    }

    fn should_terminate(&self, candidate_distance: f32) -> bool {
        self.is_full() && candidate_distance > self.exploration_radius()
    }

    fn admit(&mut self, id: usize, distance: f32, live: bool) {
        if !live || distance > self.radius {
            return;
        }
        if !self.is_full() || distance < self.worst() {
            self.results.push(Neighbour { id, distance });
            if self.results.len() > self.size {
                self.results.pop();
            }
        }
    }

    fn seed(&mut self, id: usize, distance: f32, live: bool) {
        self.frontier.push(ReverseNeighbour::new(id, distance));
        self.admit(id, distance, live);
    }

    fn consider(&mut self, id: usize, distance: f32, live: bool) {
        if distance <= self.radius && distance <= self.exploration_radius() {
            self.frontier.push(ReverseNeighbour::new(id, distance));
        }
        self.admit(id, distance, live);
    }

    fn finalise(self) -> Found {
        Found {
            neighbours: self.results.into_sorted_vec(),
            distance_computations: self.distance_computations,
        }
    }
}

impl<T: Element> Traversal<'_, T> {
    /// Searches from `seeds` for the objects closest to `query`.
    ///
    /// Seeds always enter the frontier; removed objects are traversed but
    /// never returned.
    pub(crate) fn search(&self, seeds: &[usize], query: &[T], limits: &SearchLimits) -> Result<Found> {
        let mut state = SearchState::new(limits);
        if limits.size == 0 {
            return Ok(state.finalise());
        }

        for &seed in seeds {
            if state.visited.insert(seed) {
                let distance = self.space.distance_to(seed, query);
                state.distance_computations += 1;
                state.seed(seed, distance, self.space.is_live(seed));
            }
        }

        while let Some(ReverseNeighbour { inner: candidate }) = state.frontier.pop() {
            if state.should_terminate(candidate.distance) {
                break;
            }
            let node = self.graph.read(candidate.id)?;
            let Some(node) = node.as_ref() else {
                continue;
            };
            let limit = limits.edge_limit.unwrap_or(usize::MAX);
            for edge in node.edges().iter().take(limit) {
                if !state.visited.insert(edge.id) {
                    continue;
                }
                let distance = self.space.distance_to(edge.id, query);
                state.distance_computations += 1;
                state.consider(edge.id, distance, self.space.is_live(edge.id));
            }
        }

        Ok(state.finalise())
    }
}
