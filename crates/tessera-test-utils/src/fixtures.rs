//! Row-size fixtures for container and partitioning tests.
//!
//! - [`uniform_rows`] — every row the same length.
//! - [`skewed_rows`] — one heavy row among light ones.
//! - [`sparse_rows`] — a mix of empty and short rows.

/// `num_rows` rows of `len` entries each.
pub fn uniform_rows(num_rows: usize, len: usize) -> Vec<usize> {
    vec![len; num_rows]
}

/// `num_rows` rows of length 1, except row `heavy` with `heavy_len` entries.
pub fn skewed_rows(num_rows: usize, heavy: usize, heavy_len: usize) -> Vec<usize> {
    (0..num_rows)
        .map(|row| if row == heavy { heavy_len } else { 1 })
        .collect()
}

/// Deterministic mix: every third row empty, others 1..=4 entries.
pub fn sparse_rows(num_rows: usize) -> Vec<usize> {
    (0..num_rows)
        .map(|row| if row % 3 == 0 { 0 } else { 1 + row % 4 })
        .collect()
}

/// Materialise rows from sizes, filling row `r` with the value `r`.
pub fn rows_from_sizes(sizes: &[usize]) -> Vec<Vec<u32>> {
    sizes
        .iter()
        .enumerate()
        .map(|(row, &len)| vec![row as u32; len])
        .collect()
}
