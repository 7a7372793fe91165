//! RAM vs. disk-mapped placement of genome buffers.

use crate::config::StorageParams;
use sysinfo::System;
use tracing::debug;

/// Bytes needed for a `rows x cols` array of `elem_size`-byte cells.
pub fn estimate_bytes(rows: usize, cols: usize, elem_size: usize) -> u64 {
    (rows as u64)
        .saturating_mul(cols as u64)
        .saturating_mul(elem_size as u64)
}

/// Currently available system memory in bytes. Sampled fresh on every call.
pub fn available_memory_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

/// True if an array of the given shape fits under the RAM budget.
///
/// With `hard_cap_bytes` set, available memory is not consulted at all.
pub fn should_keep_in_memory(
    rows: usize,
    cols: usize,
    elem_size: usize,
    fraction: f64,
    hard_cap_bytes: Option<u64>,
) -> bool {
    match hard_cap_bytes {
        Some(cap) => estimate_bytes(rows, cols, elem_size) < cap,
        None => fits_budget(
            rows,
            cols,
            elem_size,
            fraction,
            None,
            available_memory_bytes(),
        ),
    }
}

fn fits_budget(
    rows: usize,
    cols: usize,
    elem_size: usize,
    fraction: f64,
    hard_cap_bytes: Option<u64>,
    available: u64,
) -> bool {
    let needed = estimate_bytes(rows, cols, elem_size);
    let budget = match hard_cap_bytes {
        Some(cap) => cap as f64,
        None => fraction * available as f64,
    };
    let keep = (needed as f64) < budget;
    debug!(
        "Memory policy: {} bytes needed, budget {:.0} bytes -> {}",
        needed,
        budget,
        if keep { "RAM" } else { "disk" }
    );
    keep
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryPolicy {
    pub ram_fraction: f64,
    pub hard_cap_bytes: Option<u64>,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            ram_fraction: 0.2,
            hard_cap_bytes: None,
        }
    }
}

impl From<&StorageParams> for MemoryPolicy {
    fn from(params: &StorageParams) -> Self {
        Self {
            ram_fraction: params.ram_fraction,
            hard_cap_bytes: params.hard_max_ram_bytes,
        }
    }
}

impl MemoryPolicy {
    pub fn keep_in_memory(&self, rows: usize, cols: usize, elem_size: usize) -> bool {
        should_keep_in_memory(rows, cols, elem_size, self.ram_fraction, self.hard_cap_bytes)
    }

    /// Same decision against a caller-supplied availability figure.
    pub fn keep_in_memory_with(&self, rows: usize, cols: usize, elem_size: usize, available: u64) -> bool {
        fits_budget(
            rows,
            cols,
            elem_size,
            self.ram_fraction,
            self.hard_cap_bytes,
            available,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_cap() {
        // 1000 x 1000 bytes = 1 MB
        assert!(!should_keep_in_memory(1000, 1000, 1, 0.5, Some(500_000)));
        assert!(should_keep_in_memory(10, 10, 1, 0.5, Some(500_000)));
    }

    #[test]
    fn test_fraction_of_available() {
        let policy = MemoryPolicy {
            ram_fraction: 0.25,
            hard_cap_bytes: None,
        };
        assert!(policy.keep_in_memory_with(10, 10, 1, 1_000));
        assert!(!policy.keep_in_memory_with(10, 100, 1, 1_000));
        // Exactly at budget goes to disk.
        assert!(!policy.keep_in_memory_with(10, 25, 1, 1_000));
    }

    #[test]
    fn test_cap_overrides_availability() {
        let policy = MemoryPolicy {
            ram_fraction: 1.0,
            hard_cap_bytes: Some(64),
        };
        assert!(!policy.keep_in_memory_with(8, 8, 1, u64::MAX));
        assert!(policy.keep_in_memory_with(7, 8, 1, 0));
    }

    #[test]
    fn test_estimate_saturates() {
        assert_eq!(estimate_bytes(usize::MAX, usize::MAX, 8), u64::MAX);
    }
}
