//! Brute-force nearest neighbours used as ground truth.

use std::cmp::Ordering;

/// Euclidean distance.
#[must_use]
pub fn l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let diff = f64::from(*a) - f64::from(*b);
            diff * diff
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// The `k` nearest `(id, distance)` pairs among `candidates`, ascending by
/// distance with ties broken by id.
///
/// # Examples
/// ```
/// use grove_test_support::oracle::{exact_knn, l2};
///
/// let points = [vec![0.0_f32], vec![5.0], vec![1.0]];
/// let nearest = exact_knn(
///     points.iter().enumerate().map(|(id, p)| (id, p.as_slice())),
///     &[0.2],
///     2,
///     l2,
/// );
/// assert_eq!(nearest.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![0, 2]);
/// ```
pub fn exact_knn<'a, I, F>(candidates: I, query: &[f32], k: usize, distance: F) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, &'a [f32])>,
    F: Fn(&[f32], &[f32]) -> f32,
{
    let mut scored: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|(id, vector)| (id, distance(query, vector)))
        .collect();
    scored.sort_by(|left, right| {
        left.1
            .partial_cmp(&right.1)
            .unwrap_or(Ordering::Equal)
            .then(left.0.cmp(&right.0))
    });
    scored.truncate(k);
    scored
}

/// Fraction of `truth` present in `found`. An empty truth scores 1.
#[must_use]
pub fn recall(found: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let hits = truth.iter().filter(|id| found.contains(id)).count();
    hits as f64 / truth.len() as f64
}
