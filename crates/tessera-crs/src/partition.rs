//! Load-balanced block partitioning of rows.
//!
//! Each row costs `entries + cost_per_row`. Rows are walked left to right
//! and grouped into contiguous blocks by a greedy running sum:
//!
//! - a block closes after a row once the cumulative cost reaches the
//!   block's share of the total (`cumulative * B >= (k + 1) * total`);
//! - a non-empty block closes before a row whose cost would push it above
//!   twice the average block cost.
//!
//! Rows are never split, so a single row heavier than twice the average
//! gets a block of its own. Every block with more than one row stays within
//! twice the average. When rows run out early the trailing blocks are
//! empty.

use std::ops::Range;

use smallvec::SmallVec;
use tessera_core::{ContainerError, MemorySpace};
use tracing::debug;

use crate::config::PartitionConfig;
use crate::rows::CompressedRows;

/// Block boundaries as row indices. Inline up to 16 blocks.
pub type BlockOffsets = SmallVec<[usize; 17]>;

/// A computed partitioning: `offsets[k]..offsets[k + 1]` are the rows of
/// block `k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockPartition {
    offsets: BlockOffsets,
    cost_per_row: usize,
}

impl BlockPartition {
    /// Partition the rows described by `row_offsets` into `num_blocks`
    /// blocks.
    ///
    /// `row_offsets` must follow the container invariants (non-empty,
    /// starting at 0, non-decreasing).
    pub fn compute(
        row_offsets: &[usize],
        num_blocks: usize,
        cost_per_row: usize,
    ) -> Result<Self, ContainerError> {
        if num_blocks == 0 {
            return Err(ContainerError::InvalidArgument {
                reason: "num_blocks must be at least 1".into(),
            });
        }
        let num_rows = row_offsets.len().saturating_sub(1);
        let total = total_cost(row_offsets, cost_per_row);
        let blocks = num_blocks as u128;
        let per_row = cost_per_row as u128;

        let mut offsets = BlockOffsets::with_capacity(num_blocks + 1);
        offsets.push(0);

        let mut block_start = 0usize;
        let mut running: u128 = 0;
        let mut cumulative: u128 = 0;

        for row in 0..num_rows {
            let cost = (row_offsets[row + 1] - row_offsets[row]) as u128 + per_row;

            // Overshoot guard: a lone row may exceed the bound, a group may not.
            if offsets.len() < num_blocks
                && row > block_start
                && (running + cost) * blocks > 2 * total
            {
                offsets.push(row);
                block_start = row;
                running = 0;
            }

            running += cost;
            cumulative += cost;

            // Block k is full once the prefix reaches (k + 1) / B of the total.
            let current_block = (offsets.len() - 1) as u128;
            if offsets.len() < num_blocks && cumulative * blocks >= (current_block + 1) * total {
                offsets.push(row + 1);
                block_start = row + 1;
                running = 0;
            }
        }

        while offsets.len() <= num_blocks {
            offsets.push(num_rows);
        }

        Ok(Self {
            offsets,
            cost_per_row,
        })
    }

    /// The `num_blocks() + 1` block boundaries.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The per-row overhead this partitioning was balanced with.
    pub fn cost_per_row(&self) -> usize {
        self.cost_per_row
    }

    /// Rows of `block`.
    pub fn rows(&self, block: usize) -> Result<Range<usize>, ContainerError> {
        if block >= self.num_blocks() {
            return Err(ContainerError::OutOfRange {
                index: block,
                len: self.num_blocks(),
            });
        }
        Ok(self.offsets[block]..self.offsets[block + 1])
    }

    /// Weighted cost of `block` given the container's row offsets.
    ///
    /// `row_offsets` too short for the block is
    /// [`ContainerError::OutOfRange`] on the missing offset.
    pub fn cost(&self, row_offsets: &[usize], block: usize) -> Result<usize, ContainerError> {
        let rows = self.rows(block)?;
        let (Some(&start), Some(&end)) = (row_offsets.get(rows.start), row_offsets.get(rows.end))
        else {
            return Err(ContainerError::OutOfRange {
                index: rows.end,
                len: row_offsets.len(),
            });
        };
        let entries = end.saturating_sub(start);
        Ok(entries + rows.len() * self.cost_per_row)
    }
}

/// `entries + cost_per_row * rows`, widened so it cannot overflow.
pub(crate) fn total_cost(row_offsets: &[usize], cost_per_row: usize) -> u128 {
    let num_rows = row_offsets.len().saturating_sub(1);
    let entries = row_offsets.last().copied().unwrap_or(0);
    entries as u128 + cost_per_row as u128 * num_rows as u128
}

impl<T, S: MemorySpace> CompressedRows<T, S> {
    /// Partition the rows into `num_blocks` contiguous blocks of balanced
    /// cost, replacing any previous partitioning.
    ///
    /// `num_blocks == 0` is [`ContainerError::InvalidArgument`]; on error
    /// the previous partitioning is kept.
    pub fn create_block_partitioning(
        &mut self,
        num_blocks: usize,
        cost_per_row: usize,
    ) -> Result<(), ContainerError> {
        let partition = BlockPartition::compute(&self.row_offsets, num_blocks, cost_per_row)?;
        debug!(
            space = self.space.name(),
            rows = self.num_rows(),
            num_blocks,
            cost_per_row,
            total_cost = %total_cost(&self.row_offsets, cost_per_row),
            "created block partitioning"
        );
        self.partition = Some(partition);
        Ok(())
    }

    /// Partition according to `config`.
    pub fn partition_with(&mut self, config: &PartitionConfig) -> Result<(), ContainerError> {
        config.validate()?;
        self.create_block_partitioning(config.num_blocks, config.cost_per_row)
    }

    /// The current partitioning, if one has been created.
    pub fn partition(&self) -> Option<&BlockPartition> {
        self.partition.as_ref()
    }

    /// Block boundaries of the current partitioning, if any.
    pub fn block_offsets(&self) -> Option<&[usize]> {
        self.partition.as_ref().map(BlockPartition::offsets)
    }

    /// Number of blocks, or 0 before partitioning.
    pub fn num_blocks(&self) -> usize {
        self.partition.as_ref().map_or(0, BlockPartition::num_blocks)
    }

    /// Rows of `block` in the current partitioning.
    pub fn block_rows(&self, block: usize) -> Result<Range<usize>, ContainerError> {
        self.require_partition()?.rows(block)
    }

    /// Weighted cost of `block` in the current partitioning.
    pub fn block_cost(&self, block: usize) -> Result<usize, ContainerError> {
        self.require_partition()?.cost(&self.row_offsets, block)
    }

    pub(crate) fn require_partition(&self) -> Result<&BlockPartition, ContainerError> {
        self.partition
            .as_ref()
            .ok_or_else(|| ContainerError::InvalidArgument {
                reason: "no block partitioning has been created".into(),
            })
    }
}
