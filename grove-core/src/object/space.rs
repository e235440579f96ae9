//! Borrowed, typed view over the repository used by search and build.

use super::element::Element;
use super::repository::TypedStore;
use crate::error::ObjectError;

/// Typed view pairing element storage with liveness flags.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Space<'a, T: Element> {
    store: &'a TypedStore<T>,
    removed: &'a [bool],
}

impl<'a, T: Element> Space<'a, T> {
    pub(crate) const fn new(store: &'a TypedStore<T>, removed: &'a [bool]) -> Self {
        Self { store, removed }
    }

    pub(crate) fn is_live(&self, id: usize) -> bool {
        matches!(self.removed.get(id), Some(false))
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.removed.len()
    }

    pub(crate) fn vector(&self, id: usize) -> Option<&'a [T]> {
        self.store.vector(id)
    }

    /// Distance from object `id` to an encoded query. Unknown ids are
    /// infinitely far away.
    #[inline]
    pub(crate) fn distance_to(&self, id: usize, query: &[T]) -> f32 {
        self.store
            .vector(id)
            .map_or(f32::INFINITY, |stored| self.store.distance(stored, query))
    }

    pub(crate) fn between(&self, left: usize, right: usize) -> f32 {
        match self.store.vector(right) {
            Some(stored) => self.distance_to(left, stored),
            None => f32::INFINITY,
        }
    }

    pub(crate) fn encode<V: Copy + Into<f64>>(&self, values: &[V]) -> Result<Vec<T>, ObjectError> {
        self.store.encode(values)
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = usize> + 'a {
        self.removed
            .iter()
            .enumerate()
            .filter_map(|(id, removed)| (!removed).then_some(id))
    }
}
