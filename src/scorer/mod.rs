use crate::config::{ExperimentConfig, MAX_STREAM_BATCH};
use crate::error::{KfResult, KnapForgeError};
use crate::items::ItemTable;
use crate::population::GenomeBuffer;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fitness {
    pub score: i64,
    pub weight: i64,
}

/// Per-individual (score, weight) pairs for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FitnessMatrix {
    pub scores: Vec<i64>,
    pub weights: Vec<i64>,
}

impl FitnessMatrix {
    pub fn from_pairs(pairs: &[(i64, i64)]) -> Self {
        Self {
            scores: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, idx: usize) -> Fitness {
        Fitness {
            score: self.scores[idx],
            weight: self.weights[idx],
        }
    }

    fn extend(&mut self, batch: Vec<Fitness>) {
        for f in batch {
            self.scores.push(f.score);
            self.weights.push(f.weight);
        }
    }
}

/// Applies the weight constraint to a raw value score.
///
/// `penalty == 0` is a hard cutoff; otherwise each unit of excess weight costs
/// `penalty` points, floored at 0. Feasible individuals are returned unchanged.
pub fn penalize(raw_score: i64, weight: i64, max_weight: i64, penalty: f64) -> i64 {
    if weight <= max_weight {
        return raw_score;
    }
    if penalty == 0.0 {
        return 0;
    }
    let excess = (weight - max_weight) as f64;
    (raw_score as f64 - excess * penalty).max(0.0) as i64
}

/// Scores every row of a row-major 0/1 matrix.
pub fn score_rows(
    genomes: &[u8],
    values: &[i64],
    weights: &[i64],
    max_weight: i64,
    penalty: f64,
) -> Vec<Fitness> {
    let cols = values.len();
    if cols == 0 {
        return Vec::new();
    }
    genomes
        .par_chunks(cols)
        .map(|row| {
            let mut raw = 0i64;
            let mut weight = 0i64;
            for ((&gene, &v), &w) in row.iter().zip(values).zip(weights) {
                let g = gene as i64;
                raw += g * v;
                weight += g * w;
            }
            Fitness {
                score: penalize(raw, weight, max_weight, penalty),
                weight,
            }
        })
        .collect()
}

/// Streams `population` through [`score_rows`] in chunks of `batch_size` rows.
pub fn evaluate(
    population: &GenomeBuffer,
    values: &[i64],
    weights: &[i64],
    max_weight: i64,
    penalty: f64,
    batch_size: usize,
) -> KfResult<FitnessMatrix> {
    let cols = population.cols();
    if cols == 0 || values.len() != cols || weights.len() != cols {
        return Err(KnapForgeError::Validation(format!(
            "Genome length {} does not match item table of {} values / {} weights",
            cols,
            values.len(),
            weights.len()
        )));
    }
    if batch_size == 0 || batch_size > MAX_STREAM_BATCH {
        return Err(KnapForgeError::Validation(format!(
            "Batch size must be in [1, {}], got {}",
            MAX_STREAM_BATCH, batch_size
        )));
    }

    let mut matrix = FitnessMatrix {
        scores: Vec::with_capacity(population.rows()),
        weights: Vec::with_capacity(population.rows()),
    };
    for chunk in population.as_slice().chunks(batch_size * cols) {
        matrix.extend(score_rows(chunk, values, weights, max_weight, penalty));
    }
    Ok(matrix)
}

/// Evaluator bound to one experiment's items and constraint settings.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    items: ItemTable,
    max_weight: i64,
    penalty: f64,
    batch_size: usize,
}

impl FitnessEvaluator {
    pub fn new(items: ItemTable, max_weight: i64, penalty: f64, batch_size: usize) -> Self {
        Self {
            items,
            max_weight,
            penalty,
            batch_size,
        }
    }

    pub fn from_config(items: ItemTable, config: &ExperimentConfig) -> Self {
        Self::new(
            items,
            config.data.max_weight,
            config.effective_penalty(),
            config.population.stream_batch_size,
        )
    }

    pub fn items(&self) -> &ItemTable {
        &self.items
    }

    pub fn evaluate(&self, population: &GenomeBuffer) -> KfResult<FitnessMatrix> {
        evaluate(
            population,
            self.items.values(),
            self.items.weights(),
            self.max_weight,
            self.penalty,
            self.batch_size,
        )
    }
}
