//! Mirrors across memory spaces and explicit entry synchronisation.

use tessera_core::{ContainerError, HostSpace, MemorySpace};
use tracing::debug;

use crate::rows::CompressedRows;

impl<T: Clone + Default, S: MemorySpace> CompressedRows<T, S> {
    /// Copy this container into host memory.
    ///
    /// Row offsets, entries, and the block partitioning (if any) are copied
    /// in full. The mirror shares nothing with `self`.
    pub fn create_mirror(&self) -> Result<CompressedRows<T, HostSpace>, ContainerError> {
        self.create_mirror_in(HostSpace)
    }

    /// Copy this container into `space`.
    ///
    /// Allocation happens before any copy; if either allocation fails no
    /// mirror is returned.
    pub fn create_mirror_in<D: MemorySpace>(
        &self,
        space: D,
    ) -> Result<CompressedRows<T, D>, ContainerError> {
        let mut row_offsets = space.allocate::<usize>(self.row_offsets.len())?;
        let mut entries = space.allocate::<T>(self.entries.len())?;
        space.deep_copy(&mut row_offsets, &self.row_offsets)?;
        space.deep_copy(&mut entries, &self.entries)?;

        debug!(
            from = self.space.name(),
            to = space.name(),
            rows = self.num_rows(),
            entries = self.entries.len(),
            "created mirror"
        );

        Ok(CompressedRows {
            row_offsets,
            entries,
            partition: self.partition.clone(),
            space,
        })
    }

    /// Overwrite this container's entries with `other`'s.
    ///
    /// Both containers must have identical row offsets; otherwise
    /// [`ContainerError::InvalidArgument`] is returned and nothing is copied.
    pub fn sync_from<D: MemorySpace>(
        &mut self,
        other: &CompressedRows<T, D>,
    ) -> Result<(), ContainerError> {
        if self.row_offsets != other.row_offsets {
            return Err(ContainerError::InvalidArgument {
                reason: format!(
                    "cannot sync containers with different structure ({} rows / {} entries vs {} rows / {} entries)",
                    self.num_rows(),
                    self.num_entries(),
                    other.num_rows(),
                    other.num_entries()
                ),
            });
        }
        self.space.deep_copy(&mut self.entries, &other.entries)?;
        debug!(
            from = other.space.name(),
            to = self.space.name(),
            entries = self.entries.len(),
            "synced entries"
        );
        Ok(())
    }

    /// Overwrite `other`'s entries with this container's.
    pub fn sync_to<D: MemorySpace>(
        &self,
        other: &mut CompressedRows<T, D>,
    ) -> Result<(), ContainerError> {
        other.sync_from(self)
    }

    /// Whether `other` has exactly the same row structure.
    pub fn same_structure<D: MemorySpace>(&self, other: &CompressedRows<T, D>) -> bool {
        self.row_offsets == other.row_offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompressedRows<i64> {
        CompressedRows::from_rows(&[vec![1, 2, 3], vec![], vec![4, 5], vec![6]]).unwrap()
    }

    #[test]
    fn mirror_copies_structure_and_entries() {
        let rows = sample();
        let mirror = rows.create_mirror().unwrap();
        assert_eq!(mirror.row_offsets(), rows.row_offsets());
        assert_eq!(mirror.entries().unwrap(), rows.entries().unwrap());
        assert!(mirror.same_structure(&rows));
    }

    #[test]
    fn mirror_copies_partition() {
        let mut rows = sample();
        rows.create_block_partitioning(2, 0).unwrap();
        let mirror = rows.create_mirror().unwrap();
        assert_eq!(mirror.block_offsets(), rows.block_offsets());
    }

    #[test]
    fn mirror_does_not_alias() {
        let rows = sample();
        let mut mirror = rows.create_mirror().unwrap();
        mirror.row_mut(0).unwrap().fill(-1);
        assert_eq!(rows.row(0).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn sync_round_trip() {
        let mut rows = sample();
        let mut mirror = rows.create_mirror().unwrap();

        mirror.row_mut(2).unwrap().copy_from_slice(&[40, 50]);
        rows.sync_from(&mirror).unwrap();
        assert_eq!(rows.row(2).unwrap(), &[40, 50]);

        rows.row_mut(3).unwrap()[0] = 60;
        rows.sync_to(&mut mirror).unwrap();
        assert_eq!(mirror.row(3).unwrap(), &[60]);
    }

    #[test]
    fn sync_rejects_mismatched_structure() {
        let mut rows = sample();
        let other = CompressedRows::<i64>::new([3usize, 0, 1, 2]).unwrap();
        let before = rows.entries().unwrap().to_vec();
        let err = rows.sync_from(&other).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidArgument { .. }));
        assert_eq!(rows.entries().unwrap(), before.as_slice());
    }
}
