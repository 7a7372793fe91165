use fastrand::Rng;

/// Flips each gene independently with probability `pm`. No draws are made when `pm <= 0`.
pub fn mutate(genes: &mut [u8], pm: f64, rng: &mut Rng) {
    if pm <= 0.0 {
        return;
    }
    for gene in genes.iter_mut() {
        if rng.f64() < pm {
            *gene ^= 1;
        }
    }
}
