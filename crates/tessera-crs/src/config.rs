//! Block-partitioning configuration.

use tessera_core::ContainerError;

/// Parameters for [`CompressedRows::partition_with`].
///
/// Every row costs its entry count plus `cost_per_row`; blocks are balanced
/// on that weighted cost.
///
/// [`CompressedRows::partition_with`]: crate::CompressedRows::partition_with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Number of blocks to produce. Must be at least 1.
    pub num_blocks: usize,

    /// Fixed overhead charged for every row, in entry-equivalents.
    ///
    /// Default: 4. Setting it to 0 balances on entry count alone, which
    /// lets long runs of empty rows pile into a single block.
    pub cost_per_row: usize,
}

impl PartitionConfig {
    /// Default fixed cost per row.
    pub const DEFAULT_COST_PER_ROW: usize = 4;

    /// Create a config for `num_blocks` blocks with the default row cost.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            num_blocks,
            cost_per_row: Self::DEFAULT_COST_PER_ROW,
        }
    }

    /// Override the per-row overhead.
    pub fn with_cost_per_row(mut self, cost_per_row: usize) -> Self {
        self.cost_per_row = cost_per_row;
        self
    }

    /// Check the config before use.
    pub fn validate(&self) -> Result<(), ContainerError> {
        if self.num_blocks == 0 {
            return Err(ContainerError::InvalidArgument {
                reason: "num_blocks must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cost_per_row_is_four() {
        let config = PartitionConfig::new(8);
        assert_eq!(config.num_blocks, 8);
        assert_eq!(config.cost_per_row, 4);
    }

    #[test]
    fn with_cost_per_row_overrides() {
        let config = PartitionConfig::new(2).with_cost_per_row(0);
        assert_eq!(config.cost_per_row, 0);
    }

    #[test]
    fn zero_blocks_rejected() {
        let err = PartitionConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, ContainerError::InvalidArgument { .. }));
    }

    #[test]
    fn default_is_single_block() {
        assert!(PartitionConfig::default().validate().is_ok());
        assert_eq!(PartitionConfig::default().num_blocks, 1);
    }
}
