//! Expected-accuracy calibration.
//!
//! `build` measures mean recall at a fixed ladder of epsilons against a
//! brute-force sample and stores the curve with the index, so a search can
//! ask for a recall level instead of an epsilon.

use std::collections::HashSet;

use rand::{SeedableRng, rngs::SmallRng, seq::index::sample};
use rayon::{ThreadPool, prelude::*};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::neighbour::Neighbour;
use crate::object::Element;
use crate::search::{DEFAULT_EPSILON, SearchLimits, Seeding, Traversal};
use crate::tree::VpTree;

/// Epsilons measured during calibration, ascending.
pub(crate) const CALIBRATION_EPSILONS: [f32; 10] =
    [0.0, 0.02, 0.05, 0.1, 0.15, 0.2, 0.3, 0.5, 0.8, 1.0];
const DEFAULT_ACCURACIES: [f32; 10] = [0.70, 0.78, 0.85, 0.90, 0.93, 0.95, 0.97, 0.985, 0.995, 1.0];
const SAMPLE_LIMIT: usize = 50;
const CALIBRATION_K: usize = 10;
const CALIBRATION_SEED: u64 = 0x00ac_c0ac_c0ac_c0ac;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct AccuracyRow {
    epsilon: f32,
    accuracy: f32,
}

/// Monotone mapping from epsilon to measured recall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct AccuracyTable {
    rows: Vec<AccuracyRow>,
}

impl Default for AccuracyTable {
    fn default() -> Self {
        Self::from_measurements(CALIBRATION_EPSILONS.into_iter().zip(DEFAULT_ACCURACIES))
    }
}

impl AccuracyTable {
    /// Builds a table, raising each accuracy to at least its predecessor's.
    fn from_measurements(pairs: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut floor = 0.0_f32;
        let rows = pairs
            .into_iter()
            .map(|(epsilon, accuracy)| {
                floor = floor.max(accuracy);
                AccuracyRow {
                    epsilon,
                    accuracy: floor,
                }
            })
            .collect();
        Self { rows }
    }

    /// Smallest epsilon expected to reach `target` recall, interpolated
    /// between the bracketing rows. Targets beyond the table map to its
    /// largest epsilon.
    pub(crate) fn epsilon_for(&self, target: f32) -> f32 {
        let mut previous: Option<&AccuracyRow> = None;
        for row in &self.rows {
            if row.accuracy >= target {
                return match previous {
                    Some(lower) if row.accuracy > lower.accuracy => {
                        let fraction = (target - lower.accuracy) / (row.accuracy - lower.accuracy);
                        lower.epsilon + fraction.clamp(0.0, 1.0) * (row.epsilon - lower.epsilon)
                    }
                    _ => row.epsilon,
                };
            }
            previous = Some(row);
        }
        self.rows.last().map_or(DEFAULT_EPSILON, |row| row.epsilon)
    }

    /// `(epsilon, accuracy)` pairs, ascending.
    #[cfg(test)]
    pub(crate) fn rows(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.rows.iter().map(|row| (row.epsilon, row.accuracy))
    }

    /// Measures the curve for the current graph.
    pub(crate) fn calibrate<T: Element>(
        traversal: &Traversal<'_, T>,
        seeding: Seeding,
        tree: &VpTree,
        edge_limit: Option<usize>,
        pool: &ThreadPool,
    ) -> Result<Self> {
        let live: Vec<usize> = traversal.space.live_ids().collect();
        if live.len() < 2 {
            return Ok(Self::default());
        }

        let mut rng = SmallRng::seed_from_u64(CALIBRATION_SEED);
        let picked: Vec<usize> = sample(&mut rng, live.len(), SAMPLE_LIMIT.min(live.len()))
            .into_iter()
            .filter_map(|position| live.get(position).copied())
            .collect();
        let k = CALIBRATION_K.min(live.len());

        let truths = pool.install(|| {
            picked
                .par_iter()
                .map(|&id| exact_neighbours(traversal, &live, id, k).map(|truth| (id, truth)))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut measurements = Vec::with_capacity(CALIBRATION_EPSILONS.len());
        for epsilon in CALIBRATION_EPSILONS {
            let limits = SearchLimits::construction(k, epsilon, edge_limit);
            let recalls = pool.install(|| {
                truths
                    .par_iter()
                    .map(|(id, truth)| {
                        let query = stored_vector(traversal, *id)?;
                        let found = traversal.seeded_search(seeding, tree, query, &limits)?;
                        let hits = found
                            .neighbours
                            .iter()
                            .filter(|neighbour| truth.contains(&neighbour.id))
                            .count();
                        Ok(hits as f64 / k as f64)
                    })
                    .collect::<Result<Vec<f64>>>()
            })?;
            let mean = recalls.iter().sum::<f64>() / recalls.len().max(1) as f64;
            measurements.push((epsilon, mean as f32));
        }
        Ok(Self::from_measurements(measurements))
    }
}

fn stored_vector<'a, T: Element>(traversal: &Traversal<'a, T>, id: usize) -> Result<&'a [T]> {
    traversal
        .space
        .vector(id)
        .ok_or_else(|| IndexError::GraphInvariant {
            message: format!("object {id} has no stored vector"),
        })
}

fn exact_neighbours<T: Element>(
    traversal: &Traversal<'_, T>,
    live: &[usize],
    id: usize,
    k: usize,
) -> Result<HashSet<usize>> {
    let query = stored_vector(traversal, id)?;
    let mut ranked: Vec<Neighbour> = live
        .iter()
        .map(|&candidate| Neighbour {
            id: candidate,
            distance: traversal.space.distance_to(candidate, query),
        })
        .collect();
    ranked.sort_unstable();
    Ok(ranked.into_iter().take(k).map(|neighbour| neighbour.id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, 0.0)]
    #[case(0.70, 0.0)]
    #[case(0.90, 0.1)]
    #[case(1.0, 1.0)]
    fn lookup_hits_rows_and_bounds(#[case] target: f32, #[case] expected: f32) {
        let table = AccuracyTable::default();
        assert!((table.epsilon_for(target) - expected).abs() < 1e-6);
    }

    #[test]
    fn lookup_interpolates_between_rows() {
        let table = AccuracyTable::from_measurements([(0.0, 0.5), (1.0, 1.0)]);
        assert!((table.epsilon_for(0.75) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn measurements_are_forced_monotone() {
        let table = AccuracyTable::from_measurements([(0.0, 0.8), (0.1, 0.6), (0.2, 0.9)]);
        let accuracies: Vec<f32> = table.rows().map(|(_, accuracy)| accuracy).collect();
        assert_eq!(accuracies, vec![0.8, 0.8, 0.9]);
    }

    #[test]
    fn lookup_is_monotone_in_target() {
        let table = AccuracyTable::default();
        let mut previous = f32::NEG_INFINITY;
        for step in 0..=100 {
            let epsilon = table.epsilon_for(step as f32 / 100.0);
            assert!(epsilon >= previous);
            previous = epsilon;
        }
    }

    #[test]
    fn unreachable_targets_use_the_largest_epsilon() {
        let table = AccuracyTable::from_measurements([(0.0, 0.2), (0.5, 0.4)]);
        assert_eq!(table.epsilon_for(0.99), 0.5);
    }
}
