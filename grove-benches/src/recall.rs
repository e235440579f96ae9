//! Recall scoring against the shared brute-force oracle.

use std::collections::HashSet;

use grove_core::Neighbour;
use grove_test_support::oracle::{exact_knn, l2};

/// Integer recall score; convert to a fraction only when reporting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecallScore {
    /// True neighbours found by the approximate search.
    pub hits: usize,
    /// Target count.
    pub total: usize,
}

impl RecallScore {
    /// Adds another query's score to this one.
    pub const fn absorb(&mut self, other: Self) {
        self.hits += other.hits;
        self.total += other.total;
    }
}

/// Ids of the exact `k` nearest points to `query` under L2, nearest first.
#[must_use]
pub fn true_neighbours(points: &[Vec<f32>], query: &[f32], k: usize) -> Vec<usize> {
    exact_knn(
        points.iter().enumerate().map(|(id, point)| (id, point.as_slice())),
        query,
        k,
        l2,
    )
    .into_iter()
    .map(|(id, _)| id)
    .collect()
}

/// Overlap between the first `k` ids of `truth` and `observed`.
///
/// # Examples
/// ```
/// use grove_benches::recall::{RecallScore, recall_at_k};
/// use grove_core::Neighbour;
///
/// let observed = [Neighbour { id: 1, distance: 0.2 }, Neighbour { id: 5, distance: 0.9 }];
/// assert_eq!(recall_at_k(&[0, 1], &observed, 2), RecallScore { hits: 1, total: 2 });
/// ```
#[must_use]
pub fn recall_at_k(truth: &[usize], observed: &[Neighbour], k: usize) -> RecallScore {
    let truth: HashSet<usize> = truth.iter().take(k).copied().collect();
    let hits = observed
        .iter()
        .take(k)
        .filter(|neighbour| truth.contains(&neighbour.id))
        .count();
    RecallScore {
        hits,
        total: truth.len(),
    }
}
