use crate::config::CrossoverKind;
use crate::error::{KfResult, KnapForgeError};
use fastrand::Rng;

/// Cut positions for one parent pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cut {
    /// Swap columns `[at, len)`.
    OnePoint(usize),
    /// Swap columns `[start, stop)`.
    TwoPoint { start: usize, stop: usize },
}

/// Smallest genome length a crossover kind can cut.
pub fn min_genome_length(kind: CrossoverKind) -> usize {
    match kind {
        CrossoverKind::OnePoint => 2,
        CrossoverKind::TwoPoint => 3,
    }
}

pub fn check_genome_length(kind: CrossoverKind, len: usize) -> KfResult<()> {
    let min = min_genome_length(kind);
    if len < min {
        return Err(KnapForgeError::Validation(format!(
            "{}-point crossover needs a genome length of at least {}, got {}",
            kind, min, len
        )));
    }
    Ok(())
}

/// Draws cut columns uniformly from `[1, len - 1]`.
pub fn draw_cut(kind: CrossoverKind, len: usize, rng: &mut Rng) -> Cut {
    match kind {
        CrossoverKind::OnePoint => Cut::OnePoint(rng.usize(1..len)),
        CrossoverKind::TwoPoint => {
            let start = rng.usize(1..len - 1);
            let stop = rng.usize(start + 1..len);
            Cut::TwoPoint { start, stop }
        }
    }
}

/// Exchanges the cut segment between two children in place.
pub fn apply_cut(c1: &mut [u8], c2: &mut [u8], cut: Cut) {
    debug_assert_eq!(c1.len(), c2.len());
    let range = match cut {
        Cut::OnePoint(at) => at..c1.len(),
        Cut::TwoPoint { start, stop } => start..stop,
    };
    c1[range.clone()].swap_with_slice(&mut c2[range]);
}
