use super::buffer::GenomeBuffer;
use crate::config::MAX_STREAM_BATCH;
use crate::error::{KfResult, KnapForgeError};
use fastrand::Rng;

/// Streams a `rows x cols` Bernoulli(p) matrix in chunks of at most `batch` rows.
pub struct BernoulliBatches<'a> {
    rng: &'a mut Rng,
    p: f64,
    cols: usize,
    batch: usize,
    remaining: usize,
}

impl<'a> BernoulliBatches<'a> {
    pub fn new(rng: &'a mut Rng, rows: usize, cols: usize, p: f64, batch: usize) -> KfResult<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(KnapForgeError::Validation(format!(
                "Probability must be in [0, 1], got {}",
                p
            )));
        }
        if batch == 0 || batch > MAX_STREAM_BATCH {
            return Err(KnapForgeError::Validation(format!(
                "Batch size must be in [1, {}], got {}",
                MAX_STREAM_BATCH, batch
            )));
        }
        Ok(Self {
            rng,
            p,
            cols,
            batch,
            remaining: rows,
        })
    }
}

impl Iterator for BernoulliBatches<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let rows = self.remaining.min(self.batch);
        self.remaining -= rows;
        let cells = rows * self.cols;
        let p = self.p;
        let rng = &mut *self.rng;
        Some((0..cells).map(|_| (rng.f64() < p) as u8).collect())
    }
}

/// Writes a fresh Bernoulli(p) population into `buffer`, batch by batch.
pub fn fill_initial_population(
    buffer: &mut GenomeBuffer,
    p: f64,
    batch: usize,
    rng: &mut Rng,
) -> KfResult<()> {
    let rows = buffer.rows();
    let cols = buffer.cols();
    let mut start = 0;
    for chunk in BernoulliBatches::new(rng, rows, cols, p, batch)? {
        buffer.write_rows(start, &chunk)?;
        start += chunk.len() / cols;
        buffer.flush()?;
    }
    Ok(())
}
