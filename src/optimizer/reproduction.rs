use super::crossover::{apply_cut, check_genome_length, draw_cut};
use super::mutation::mutate;
use crate::config::{CrossoverKind, ExperimentConfig, MAX_STREAM_BATCH};
use crate::error::{KfResult, KnapForgeError};
use crate::population::GenomeBuffer;
use fastrand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReproductionParams {
    pub crossover: CrossoverKind,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    /// Parent pairs per streamed batch.
    pub batch_size: usize,
}

impl From<&ExperimentConfig> for ReproductionParams {
    fn from(cfg: &ExperimentConfig) -> Self {
        Self {
            crossover: cfg.operators.crossover_type,
            crossover_probability: cfg.operators.crossover_probability,
            mutation_probability: cfg.operators.mutation_probability,
            batch_size: cfg.population.stream_batch_size,
        }
    }
}

/// Shuffles the selected parent pool and pairs it up, so every entry is used
/// exactly once.
pub fn pair_parents(selected: &[usize], rng: &mut Rng) -> KfResult<Vec<(usize, usize)>> {
    if selected.len() % 2 != 0 {
        return Err(KnapForgeError::Validation(format!(
            "Parent pool must have an even size, got {}",
            selected.len()
        )));
    }
    let mut pool = selected.to_vec();
    rng.shuffle(&mut pool);
    Ok(pool.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

/// Streams parent pairs through crossover and mutation into `children`.
///
/// Pairs are processed in batches of `params.batch_size`. For a batch starting
/// at pair `s` with `n` pairs, first children land in rows `2s..2s+n` and
/// second children in `2s+n..2s+2n`. Disk-backed children are flushed after
/// every batch.
pub fn reproduce(
    population: &GenomeBuffer,
    children: &mut GenomeBuffer,
    pairs: &[(usize, usize)],
    params: &ReproductionParams,
    rng: &mut Rng,
) -> KfResult<()> {
    let rows = population.rows();
    let len = population.cols();
    if children.rows() != rows || children.cols() != len {
        return Err(KnapForgeError::Validation(format!(
            "Children shape ({}, {}) does not match population ({}, {})",
            children.rows(),
            children.cols(),
            rows,
            len
        )));
    }
    if pairs.len() * 2 != rows {
        return Err(KnapForgeError::Validation(format!(
            "{} parent pairs cannot fill {} children rows",
            pairs.len(),
            rows
        )));
    }
    if let Some(&(a, b)) = pairs.iter().find(|&&(a, b)| a >= rows || b >= rows) {
        return Err(KnapForgeError::Validation(format!(
            "Parent index out of range: ({}, {}) for population of {}",
            a, b, rows
        )));
    }
    if params.batch_size == 0 || params.batch_size > MAX_STREAM_BATCH {
        return Err(KnapForgeError::Validation(format!(
            "Batch size must be in [1, {}], got {}",
            MAX_STREAM_BATCH, params.batch_size
        )));
    }
    check_genome_length(params.crossover, len)?;

    let mut batches = 0;
    for (batch_idx, batch) in pairs.chunks(params.batch_size).enumerate() {
        let start = batch_idx * params.batch_size;
        let n = batch.len();

        let mut c1 = Vec::with_capacity(n * len);
        let mut c2 = Vec::with_capacity(n * len);
        for &(p1, p2) in batch {
            c1.extend_from_slice(population.row(p1));
            c2.extend_from_slice(population.row(p2));
        }

        let mask: Vec<bool> = (0..n)
            .map(|_| rng.f64() < params.crossover_probability)
            .collect();
        for i in (0..n).filter(|&i| mask[i]) {
            let cut = draw_cut(params.crossover, len, rng);
            let range = i * len..(i + 1) * len;
            apply_cut(&mut c1[range.clone()], &mut c2[range], cut);
        }

        mutate(&mut c1, params.mutation_probability, rng);
        mutate(&mut c2, params.mutation_probability, rng);

        children.write_rows(start * 2, &c1)?;
        children.write_rows(start * 2 + n, &c2)?;
        children.flush()?;
        batches += 1;
    }
    debug!("Reproduced {} pairs in {} batch(es)", pairs.len(), batches);
    Ok(())
}
