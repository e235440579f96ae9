//! Caller-facing search parameters and per-handle defaults.

use std::num::NonZeroUsize;

use crate::accuracy::AccuracyTable;
use crate::neighbour::Neighbour;
use crate::property::{EdgeBound, Property};

/// Default number of results.
pub const DEFAULT_SIZE: usize = 20;
/// Default exploration slack.
pub const DEFAULT_EPSILON: f32 = 0.1;

/// Per-query overrides. Unset fields fall back to the handle's
/// [`SearchDefaults`].
///
/// # Examples
/// ```
/// use grove_core::{EdgeBound, SearchParams};
///
/// let params = SearchParams::new(10)
///     .with_epsilon(0.2)
///     .with_edge_bound(EdgeBound::Unlimited);
/// assert_eq!(params.size(), 10);
/// assert_eq!(params.epsilon(), Some(0.2));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SearchParams {
    size: usize,
    epsilon: Option<f32>,
    radius: Option<f32>,
    edge_bound: EdgeBound,
    expected_accuracy: Option<f32>,
}

impl SearchParams {
    /// Requests `size` results; zero selects the default size.
    #[must_use]
    pub const fn new(size: usize) -> Self {
        Self {
            size,
            epsilon: None,
            radius: None,
            edge_bound: EdgeBound::Default,
            expected_accuracy: None,
        }
    }

    /// Sets the exploration slack; values at or below `-1` are ignored.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Only admits results within `radius`; negative values are ignored.
    #[must_use]
    pub const fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Limits the edges traversed per node.
    #[must_use]
    pub const fn with_edge_bound(mut self, edge_bound: EdgeBound) -> Self {
        self.edge_bound = edge_bound;
        self
    }

    /// Targets a recall level in `(0, 1]`; when set it takes precedence over
    /// epsilon. Non-positive values are ignored.
    #[must_use]
    pub const fn with_expected_accuracy(mut self, accuracy: f32) -> Self {
        self.expected_accuracy = Some(accuracy);
        self
    }

    /// Requested result count (zero: default).
    #[must_use]
    #[rustfmt::skip]
    pub const fn size(&self) -> usize { self.size }

    /// Requested epsilon, if any.
    #[must_use]
    #[rustfmt::skip]
    pub const fn epsilon(&self) -> Option<f32> { self.epsilon }

    /// Requested radius, if any.
    #[must_use]
    #[rustfmt::skip]
    pub const fn radius(&self) -> Option<f32> { self.radius }

    /// Requested edge bound.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_bound(&self) -> EdgeBound { self.edge_bound }

    /// Requested expected accuracy, if any.
    #[must_use]
    #[rustfmt::skip]
    pub const fn expected_accuracy(&self) -> Option<f32> { self.expected_accuracy }

    fn valid_epsilon(&self) -> Option<f32> {
        self.epsilon.filter(|epsilon| epsilon.is_finite() && *epsilon > -1.0)
    }

    fn valid_radius(&self) -> Option<f32> {
        self.radius.filter(|radius| *radius >= 0.0)
    }

    fn valid_accuracy(&self) -> Option<f32> {
        self.expected_accuracy
            .filter(|accuracy| accuracy.is_finite() && *accuracy > 0.0)
    }
}

/// Values used for any parameter a query leaves unset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchDefaults {
    size: NonZeroUsize,
    epsilon: f32,
    radius: f32,
    edge_bound: EdgeBound,
    expected_accuracy: Option<f32>,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            size: NonZeroUsize::new(DEFAULT_SIZE).unwrap_or(NonZeroUsize::MIN),
            epsilon: DEFAULT_EPSILON,
            radius: f32::INFINITY,
            edge_bound: EdgeBound::Default,
            expected_accuracy: None,
        }
    }
}

impl SearchDefaults {
    /// Folds the set, valid fields of `update` into the defaults; everything
    /// else keeps its previous value.
    pub fn merge(&mut self, update: &SearchParams) {
        if let Some(size) = NonZeroUsize::new(update.size) {
            self.size = size;
        }
        if let Some(epsilon) = update.valid_epsilon() {
            self.epsilon = epsilon;
        }
        if let Some(radius) = update.valid_radius() {
            self.radius = radius;
        }
        if update.edge_bound != EdgeBound::Default {
            self.edge_bound = update.edge_bound;
        }
        if let Some(accuracy) = update.valid_accuracy() {
            self.expected_accuracy = Some(accuracy);
        }
    }

    /// Default result count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn size(&self) -> usize { self.size.get() }

    /// Default epsilon.
    #[must_use]
    #[rustfmt::skip]
    pub const fn epsilon(&self) -> f32 { self.epsilon }

    /// Default radius.
    #[must_use]
    #[rustfmt::skip]
    pub const fn radius(&self) -> f32 { self.radius }

    /// Default edge bound.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_bound(&self) -> EdgeBound { self.edge_bound }

    /// Default expected accuracy.
    #[must_use]
    #[rustfmt::skip]
    pub const fn expected_accuracy(&self) -> Option<f32> { self.expected_accuracy }

    pub(crate) fn resolve(
        &self,
        params: &SearchParams,
        property: &Property,
        accuracy: &AccuracyTable,
    ) -> SearchLimits {
        let edge_bound = match params.edge_bound {
            EdgeBound::Default => self.edge_bound,
            explicit => explicit,
        };
        let epsilon = match (params.valid_accuracy(), params.valid_epsilon()) {
            (Some(target), _) => accuracy.epsilon_for(target),
            (None, Some(epsilon)) => epsilon,
            (None, None) => self
                .expected_accuracy
                .map_or(self.epsilon, |target| accuracy.epsilon_for(target)),
        };
        SearchLimits {
            size: NonZeroUsize::new(params.size).unwrap_or(self.size).get(),
            epsilon,
            radius: params.valid_radius().unwrap_or(self.radius),
            edge_limit: edge_bound.resolve(property),
        }
    }
}

/// Fully resolved traversal limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SearchLimits {
    pub(crate) size: usize,
    pub(crate) epsilon: f32,
    pub(crate) radius: f32,
    pub(crate) edge_limit: Option<usize>,
}

impl SearchLimits {
    /// Limits used while linking and refining: unbounded radius and edges.
    pub(crate) const fn construction(size: usize, epsilon: f32, edge_limit: Option<usize>) -> Self {
        Self {
            size,
            epsilon,
            radius: f32::INFINITY,
            edge_limit,
        }
    }
}

/// Result of a search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    neighbours: Vec<Neighbour>,
    distance_computations: usize,
    epsilon: f32,
}

impl SearchOutcome {
    pub(crate) const fn new(neighbours: Vec<Neighbour>, distance_computations: usize, epsilon: f32) -> Self {
        Self {
            neighbours,
            distance_computations,
            epsilon,
        }
    }

    /// Result ids, closest first.
    #[must_use]
    pub fn ids(&self) -> Vec<usize> {
        self.neighbours.iter().map(|neighbour| neighbour.id).collect()
    }

    /// Results with distances, closest first.
    #[must_use]
    #[rustfmt::skip]
    pub fn neighbours(&self) -> &[Neighbour] { &self.neighbours }

    /// Consumes the outcome, returning its results.
    #[must_use]
    #[rustfmt::skip]
    pub fn into_neighbours(self) -> Vec<Neighbour> { self.neighbours }

    /// Distance evaluations performed by this query.
    #[must_use]
    #[rustfmt::skip]
    pub const fn distance_computations(&self) -> usize { self.distance_computations }

    /// Epsilon the traversal ran with, after resolving expected accuracy.
    #[must_use]
    #[rustfmt::skip]
    pub const fn epsilon(&self) -> f32 { self.epsilon }

    /// Number of results.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.neighbours.len() }

    /// Whether no result was found.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.neighbours.is_empty() }
}
