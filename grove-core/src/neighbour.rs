//! Search result entries and heap orderings.

use std::cmp::Ordering;

/// Object returned by a search, with its distance from the query.
///
/// Ordering is ascending by distance, ties broken by id, so sorted results
/// are deterministic.
///
/// # Examples
/// ```
/// use grove_core::Neighbour;
///
/// let neighbour = Neighbour { id: 3, distance: 0.42 };
/// assert_eq!(neighbour.id, 3);
/// assert!(neighbour.distance < 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Object id.
    pub id: usize,
    /// Distance between the query and [`Neighbour::id`].
    pub distance: f32,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap adaptor over [`Neighbour`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ReverseNeighbour {
    pub(crate) inner: Neighbour,
}

impl ReverseNeighbour {
    pub(crate) const fn new(id: usize, distance: f32) -> Self {
        Self {
            inner: Neighbour { id, distance },
        }
    }
}

impl Ord for ReverseNeighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        other.inner.cmp(&self.inner)
    }
}

impl PartialOrd for ReverseNeighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn reverse_heap_pops_the_closest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(ReverseNeighbour::new(1, 2.0));
        heap.push(ReverseNeighbour::new(2, 0.5));
        heap.push(ReverseNeighbour::new(0, 0.5));
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|entry| entry.inner.id)).collect();
        assert_eq!(order, vec![0, 2, 1]);
    }
}
