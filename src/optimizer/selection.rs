use crate::config::{SelectionKind, SelectionParams};
use crate::error::{KfResult, KnapForgeError};
use crate::scorer::FitnessMatrix;
use fastrand::Rng;
use std::cmp::Ordering;

/// Parent selection over a whole generation's fitness. Draws are with replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionStrategy {
    Roulette,
    Tournament { size: usize },
    LinearRank { pressure: f64 },
}

impl From<&SelectionParams> for SelectionStrategy {
    fn from(params: &SelectionParams) -> Self {
        match params.selection_type {
            SelectionKind::Roulette => SelectionStrategy::Roulette,
            SelectionKind::Tournament => SelectionStrategy::Tournament {
                size: params.tournament_size,
            },
            SelectionKind::LinearRank => SelectionStrategy::LinearRank {
                pressure: params.selection_pressure,
            },
        }
    }
}

impl SelectionStrategy {
    /// Returns `k` parent indices into `fitness`.
    pub fn select(&self, fitness: &FitnessMatrix, k: usize, rng: &mut Rng) -> KfResult<Vec<usize>> {
        if fitness.is_empty() {
            return Err(KnapForgeError::Validation(
                "Cannot select from an empty population".into(),
            ));
        }
        match *self {
            SelectionStrategy::Roulette => Ok(roulette(fitness, k, rng)),
            SelectionStrategy::Tournament { size } => {
                if !(2..=10).contains(&size) {
                    return Err(KnapForgeError::Validation(format!(
                        "Tournament size must be in range [2, 10], got {}",
                        size
                    )));
                }
                Ok(tournament(fitness, k, size, rng))
            }
            SelectionStrategy::LinearRank { pressure } => {
                if !(1.0..=2.0).contains(&pressure) {
                    return Err(KnapForgeError::Validation(format!(
                        "Selection pressure must be in range [1.0, 2.0], got {}",
                        pressure
                    )));
                }
                Ok(linear_rank(fitness, k, pressure, rng))
            }
        }
    }
}

/// Normalised cumulative distribution with the last entry pinned to 1.
/// `None` if the weights carry no mass.
fn cumulative(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    let mut acc = 0.0;
    let mut cdf: Vec<f64> = weights
        .iter()
        .map(|w| {
            acc += w;
            acc / total
        })
        .collect();
    if let Some(last) = cdf.last_mut() {
        *last = 1.0;
    }
    Some(cdf)
}

fn sample_cdf(cdf: &[f64], k: usize, rng: &mut Rng) -> Vec<usize> {
    let last = cdf.len() - 1;
    (0..k)
        .map(|_| {
            let u = rng.f64();
            cdf.partition_point(|&c| c < u).min(last)
        })
        .collect()
}

fn uniform(n: usize, k: usize, rng: &mut Rng) -> Vec<usize> {
    (0..k).map(|_| rng.usize(0..n)).collect()
}

fn roulette(fitness: &FitnessMatrix, k: usize, rng: &mut Rng) -> Vec<usize> {
    let n = fitness.len();
    let scores: Vec<f64> = fitness.scores.iter().map(|&s| s.max(0) as f64).collect();
    if let Some(cdf) = cumulative(&scores) {
        return sample_cdf(&cdf, k, rng);
    }

    // Nothing scored: prefer lighter individuals.
    let heaviest = fitness.weights.iter().copied().max().unwrap_or(0);
    let pseudo: Vec<f64> = fitness
        .weights
        .iter()
        .map(|&w| (heaviest - w) as f64)
        .collect();
    match cumulative(&pseudo) {
        Some(cdf) => sample_cdf(&cdf, k, rng),
        None => uniform(n, k, rng),
    }
}

/// Higher score wins; equal scores go to the lighter individual.
fn beats(fitness: &FitnessMatrix, a: usize, b: usize) -> bool {
    match fitness.scores[a].cmp(&fitness.scores[b]) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => fitness.weights[a] < fitness.weights[b],
    }
}

fn tournament(fitness: &FitnessMatrix, k: usize, size: usize, rng: &mut Rng) -> Vec<usize> {
    let n = fitness.len();
    let size = size.min(n);
    let mut pool: Vec<usize> = (0..n).collect();
    (0..k)
        .map(|_| {
            // Partial Fisher-Yates: the first `size` slots become the contestants.
            for j in 0..size {
                let pick = rng.usize(j..n);
                pool.swap(j, pick);
            }
            let mut winner = pool[0];
            for &challenger in &pool[1..size] {
                if beats(fitness, challenger, winner) {
                    winner = challenger;
                }
            }
            winner
        })
        .collect()
}

fn linear_rank(fitness: &FitnessMatrix, k: usize, pressure: f64, rng: &mut Rng) -> Vec<usize> {
    let n = fitness.len();
    if n == 1 {
        return vec![0; k];
    }
    // Ascending by score, heavier first among equal scores.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        fitness.scores[a]
            .cmp(&fitness.scores[b])
            .then(fitness.weights[b].cmp(&fitness.weights[a]))
    });

    let probs: Vec<f64> = (0..n)
        .map(|pos| 2.0 - pressure + 2.0 * (pressure - 1.0) * pos as f64 / (n - 1) as f64)
        .collect();
    match cumulative(&probs) {
        Some(cdf) => sample_cdf(&cdf, k, rng)
            .into_iter()
            .map(|pos| order[pos])
            .collect(),
        None => uniform(n, k, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_pins_last() {
        let cdf = cumulative(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(cdf[2], 1.0);
        assert!((cdf[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!(cumulative(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn test_roulette_never_picks_zero_mass() {
        let fitness = FitnessMatrix::from_pairs(&[(0, 5), (10, 5), (0, 5)]);
        let mut rng = Rng::with_seed(8);
        let picks = roulette(&fitness, 200, &mut rng);
        assert!(picks.iter().all(|&i| i == 1));
    }

    #[test]
    fn test_roulette_zero_scores_prefers_light() {
        // Heaviest individual gets zero pseudo-fitness.
        let fitness = FitnessMatrix::from_pairs(&[(0, 10), (0, 30), (0, 20)]);
        let mut rng = Rng::with_seed(8);
        let picks = roulette(&fitness, 300, &mut rng);
        assert!(picks.iter().all(|&i| i != 1));
    }

    #[test]
    fn test_tournament_full_size_picks_best() {
        let fitness = FitnessMatrix::from_pairs(&[(5, 3), (9, 7), (9, 4), (1, 1)]);
        let mut rng = Rng::with_seed(3);
        // Size is clamped to the population, so every tournament sees everyone.
        let picks = tournament(&fitness, 20, 10, &mut rng);
        assert!(picks.iter().all(|&i| i == 2));
    }

    #[test]
    fn test_rank_max_pressure_excludes_worst() {
        let fitness = FitnessMatrix::from_pairs(&[(1, 1), (2, 1), (3, 1)]);
        let mut rng = Rng::with_seed(3);
        let picks = linear_rank(&fitness, 300, 2.0, &mut rng);
        assert!(picks.iter().all(|&i| i != 0));
    }

    #[test]
    fn test_invalid_parameters() {
        let fitness = FitnessMatrix::from_pairs(&[(1, 1), (2, 1)]);
        let mut rng = Rng::with_seed(3);
        assert!(SelectionStrategy::Tournament { size: 1 }
            .select(&fitness, 2, &mut rng)
            .is_err());
        assert!(SelectionStrategy::LinearRank { pressure: 2.5 }
            .select(&fitness, 2, &mut rng)
            .is_err());
        assert!(SelectionStrategy::Roulette
            .select(&FitnessMatrix::default(), 2, &mut rng)
            .is_err());
    }
}
