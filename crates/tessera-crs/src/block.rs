//! Disjoint mutable views over the blocks of a partitioned container.

use std::ops::Range;

use tessera_core::{ContainerError, MemorySpace};

use crate::rows::CompressedRows;

/// Exclusive access to the entries of one block.
///
/// Obtained from [`CompressedRows::blocks_mut`]. Views of different blocks
/// never overlap, so each can be moved to its own worker thread.
#[derive(Debug)]
pub struct BlockMut<'a, T> {
    block: usize,
    rows: Range<usize>,
    row_offsets: &'a [usize],
    entries: &'a mut [T],
}

impl<'a, T> BlockMut<'a, T> {
    /// Index of this block in the partitioning.
    pub fn block(&self) -> usize {
        self.block
    }

    /// Global row indices covered by this block.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Whether the block covers no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All entries of the block, flat.
    pub fn entries_mut(&mut self) -> &mut [T] {
        &mut *self.entries
    }

    /// Entries of global row `row`, which must belong to this block.
    ///
    /// Fails with [`ContainerError::RowOutsideBlock`] otherwise.
    pub fn row_mut(&mut self, row: usize) -> Result<&mut [T], ContainerError> {
        if !self.rows.contains(&row) {
            return Err(ContainerError::RowOutsideBlock {
                row,
                block: self.block,
                rows: self.rows.clone(),
            });
        }
        let base = self.row_offsets[self.rows.start];
        let start = self.row_offsets[row] - base;
        let end = self.row_offsets[row + 1] - base;
        Ok(&mut self.entries[start..end])
    }

    /// Call `f(row, entries)` for every row of the block, in order.
    pub fn for_each_row<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, &mut [T]),
    {
        let base = self.row_offsets[self.rows.start];
        for row in self.rows.clone() {
            let start = self.row_offsets[row] - base;
            let end = self.row_offsets[row + 1] - base;
            f(row, &mut self.entries[start..end]);
        }
    }
}

impl<T, S: MemorySpace> CompressedRows<T, S> {
    /// Split the entries into one [`BlockMut`] per block of the current
    /// partitioning.
    ///
    /// Fails with [`ContainerError::InvalidArgument`] before
    /// partitioning, or [`ContainerError::HostAccessDenied`] when the
    /// entries are not host accessible.
    pub fn blocks_mut(&mut self) -> Result<Vec<BlockMut<'_, T>>, ContainerError> {
        self.check_host_access()?;
        let partition = self
            .partition
            .as_ref()
            .ok_or_else(|| ContainerError::InvalidArgument {
                reason: "no block partitioning has been created".into(),
            })?;

        let row_offsets = self.row_offsets.as_slice();
        let mut rest: &mut [T] = &mut self.entries;
        let mut views = Vec::with_capacity(partition.num_blocks());
        for (block, bounds) in partition.offsets().windows(2).enumerate() {
            let rows = bounds[0]..bounds[1];
            let len = row_offsets[rows.end] - row_offsets[rows.start];
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            views.push(BlockMut {
                block,
                rows,
                row_offsets,
                entries: head,
            });
        }
        Ok(views)
    }
}
