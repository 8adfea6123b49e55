//! Benchmark workloads for the Tessera kernels.
//!
//! All generators are deterministic in their seed:
//!
//! - [`power_law_rows`]: row sizes with a heavy tail, the shape that makes
//!   naive equal-row-count partitioning fall over
//! - [`uniform_random_rows`]: row sizes drawn uniformly from a range
//! - [`populated_rows`]: a container filled with random entries
//! - [`clone_drop_schedule`]: a random sequence of handle operations

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tessera_core::ContainerError;
use tessera_crs::CompressedRows;

/// Row sizes where a few rows hold most of the entries.
///
/// Each size is `max_len / k` for a uniformly drawn `k` in `1..=max_len`,
/// so small rows dominate and large rows are rare.
pub fn power_law_rows(num_rows: usize, max_len: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_len = max_len.max(1);
    (0..num_rows)
        .map(|_| max_len / rng.random_range(1..=max_len))
        .collect()
}

/// Row sizes drawn uniformly from `0..=max_len`.
pub fn uniform_random_rows(num_rows: usize, max_len: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..num_rows)
        .map(|_| rng.random_range(0..=max_len))
        .collect()
}

/// A host container with the given row sizes, filled with values in `[0, 1)`.
pub fn populated_rows(sizes: &[usize], seed: u64) -> Result<CompressedRows<f64>, ContainerError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = CompressedRows::new(sizes.iter().copied())?;
    for value in rows.entries_mut()? {
        *value = rng.random();
    }
    Ok(rows)
}

/// One step of a handle workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleOp {
    /// Clone handle `i`.
    Clone(usize),
    /// Drop handle `i`.
    Drop(usize),
}

/// A random clone/drop schedule over at most `max_handles` live handles.
///
/// Indices are always valid for the handle count at the time the op runs,
/// starting from one handle. The schedule never drops the last handle.
pub fn clone_drop_schedule(len: usize, max_handles: usize, seed: u64) -> Vec<HandleOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_handles = max_handles.max(2);
    let mut live = 1usize;
    let mut ops = Vec::with_capacity(len);
    for _ in 0..len {
        let clone = live == 1 || (live < max_handles && rng.random_bool(0.5));
        let index = rng.random_range(0..live);
        if clone {
            ops.push(HandleOp::Clone(index));
            live += 1;
        } else {
            ops.push(HandleOp::Drop(index));
            live -= 1;
        }
    }
    ops
}
