use crate::error::{KfResult, KnapForgeError};
use crate::population::GenomeBuffer;
use crate::scorer::FitnessMatrix;
use serde::Serialize;

/// One generation's statistics, as written to the report CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub iteration: usize,
    pub best_fitness: i64,
    pub best_weight: i64,
    pub avg_fitness: f64,
    pub worst_fitness: i64,
    pub worst_weight: i64,
    pub identical_best_count: usize,
    /// Best individual as a string of `0`/`1` characters.
    pub genome: String,
}

impl GenerationSummary {
    pub fn from_fitness(
        iteration: usize,
        fitness: &FitnessMatrix,
        population: &GenomeBuffer,
    ) -> KfResult<Self> {
        if fitness.is_empty() || fitness.len() != population.rows() {
            return Err(KnapForgeError::Validation(format!(
                "Fitness of {} individuals does not match population of {}",
                fitness.len(),
                population.rows()
            )));
        }

        let best = best_index(fitness);
        let worst = worst_index(fitness);
        let best_fitness = fitness.get(best);
        let worst_fitness = fitness.get(worst);
        let identical_best_count = fitness
            .scores
            .iter()
            .zip(&fitness.weights)
            .filter(|&(&s, &w)| s == best_fitness.score && w == best_fitness.weight)
            .count();
        let total: f64 = fitness.scores.iter().map(|&s| s as f64).sum();

        Ok(Self {
            iteration,
            best_fitness: best_fitness.score,
            best_weight: best_fitness.weight,
            avg_fitness: total / fitness.len() as f64,
            worst_fitness: worst_fitness.score,
            worst_weight: worst_fitness.weight,
            identical_best_count,
            genome: genome_string(population.row(best)),
        })
    }
}

/// Highest score; lower weight wins ties.
pub fn best_index(fitness: &FitnessMatrix) -> usize {
    (0..fitness.len())
        .max_by(|&a, &b| {
            fitness.scores[a]
                .cmp(&fitness.scores[b])
                .then(fitness.weights[b].cmp(&fitness.weights[a]))
                .then(b.cmp(&a))
        })
        .unwrap_or(0)
}

/// Lowest score; higher weight wins ties.
pub fn worst_index(fitness: &FitnessMatrix) -> usize {
    (0..fitness.len())
        .min_by(|&a, &b| {
            fitness.scores[a]
                .cmp(&fitness.scores[b])
                .then(fitness.weights[b].cmp(&fitness.weights[a]))
                .then(a.cmp(&b))
        })
        .unwrap_or(0)
}

pub fn genome_string(row: &[u8]) -> String {
    row.iter().map(|&g| if g == 0 { '0' } else { '1' }).collect()
}
