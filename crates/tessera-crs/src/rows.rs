//! The compressed-row container and its construction paths.

use std::fmt;

use tessera_core::{ContainerError, HostSpace, MemorySpace};

use crate::partition::BlockPartition;

/// Immutable compressed-row structure with mutable entry values.
///
/// Row `i` owns `entries[row_offsets[i]..row_offsets[i + 1]]`. The offsets
/// always start at 0, never decrease, and end at `entries.len()`.
/// Construction either succeeds completely or returns an error; no
/// partially built container is ever observable.
///
/// The structural arrays are read-only after construction, so a shared
/// `&CompressedRows` can be read from many threads at once.
pub struct CompressedRows<T, S: MemorySpace = HostSpace> {
    pub(crate) row_offsets: Vec<usize>,
    pub(crate) entries: Vec<T>,
    pub(crate) partition: Option<BlockPartition>,
    pub(crate) space: S,
}

impl<T: Clone + Default> CompressedRows<T, HostSpace> {
    /// Build a host container with `row_sizes[i]` default entries in row `i`.
    ///
    /// Sizes may be any integer type. A negative size, or a total that
    /// overflows `usize`, is [`ContainerError::InvalidArgument`].
    pub fn new<I>(row_sizes: I) -> Result<Self, ContainerError>
    where
        I: IntoIterator,
        I::Item: TryInto<usize> + fmt::Debug + Copy,
    {
        Self::new_in(HostSpace, row_sizes)
    }

    /// Build a host container holding a copy of `rows`, preserving the
    /// order of entries within each row.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self, ContainerError> {
        Self::from_rows_in(HostSpace, rows)
    }

    /// Adopt existing host arrays as a container.
    ///
    /// `row_offsets` must be non-empty, start at 0, never decrease, and end
    /// at `entries.len()`.
    pub fn from_raw_parts(row_offsets: Vec<usize>, entries: Vec<T>) -> Result<Self, ContainerError> {
        validate_offsets(&row_offsets, entries.len())?;
        Ok(Self {
            row_offsets,
            entries,
            partition: None,
            space: HostSpace,
        })
    }
}

impl<T: Clone + Default, S: MemorySpace> CompressedRows<T, S> {
    /// Build a container in `space` with `row_sizes[i]` default entries in
    /// row `i`.
    pub fn new_in<I>(space: S, row_sizes: I) -> Result<Self, ContainerError>
    where
        I: IntoIterator,
        I::Item: TryInto<usize> + fmt::Debug + Copy,
    {
        let host_offsets = prefix_offsets(row_sizes)?;
        let num_entries = host_offsets[host_offsets.len() - 1];

        let mut row_offsets = space.allocate::<usize>(host_offsets.len())?;
        space.deep_copy(&mut row_offsets, &host_offsets)?;
        let entries = space.allocate::<T>(num_entries)?;

        Ok(Self {
            row_offsets,
            entries,
            partition: None,
            space,
        })
    }

    /// Build a container in `space` holding a copy of `rows`.
    pub fn from_rows_in<R: AsRef<[T]>>(space: S, rows: &[R]) -> Result<Self, ContainerError> {
        let mut container = Self::new_in(space, rows.iter().map(|r| r.as_ref().len()))?;

        // Stage on the host, then push across in one deep copy.
        let mut staging = Vec::new();
        staging
            .try_reserve_exact(container.entries.len())
            .map_err(|_| ContainerError::AllocationFailure {
                requested: container.entries.len(),
            })?;
        for row in rows {
            staging.extend_from_slice(row.as_ref());
        }
        container.space.deep_copy(&mut container.entries, &staging)?;
        Ok(container)
    }
}

impl<T, S: MemorySpace> CompressedRows<T, S> {
    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Total number of entries across all rows.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `num_rows() + 1` row offsets.
    ///
    /// Structural arrays are always readable, whatever the memory space.
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// The memory space holding this container.
    pub fn space(&self) -> &S {
        &self.space
    }

    /// Number of entries in `row`.
    pub fn row_len(&self, row: usize) -> Result<usize, ContainerError> {
        let (start, end) = self.row_bounds(row)?;
        Ok(end - start)
    }

    /// Length of the longest row, or 0 for a container without rows.
    pub fn max_row_len(&self) -> usize {
        self.row_offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// All entries, flat.
    pub fn entries(&self) -> Result<&[T], ContainerError> {
        self.check_host_access()?;
        Ok(&self.entries)
    }

    /// All entries, flat and mutable.
    pub fn entries_mut(&mut self) -> Result<&mut [T], ContainerError> {
        self.check_host_access()?;
        Ok(&mut self.entries)
    }

    /// View of the entries in `row`. O(1).
    pub fn row(&self, row: usize) -> Result<&[T], ContainerError> {
        self.check_host_access()?;
        let (start, end) = self.row_bounds(row)?;
        Ok(&self.entries[start..end])
    }

    /// Mutable view of the entries in `row`. O(1).
    pub fn row_mut(&mut self, row: usize) -> Result<&mut [T], ContainerError> {
        self.check_host_access()?;
        let (start, end) = self.row_bounds(row)?;
        Ok(&mut self.entries[start..end])
    }

    /// Iterate rows in order.
    pub fn iter_rows(&self) -> Result<impl Iterator<Item = &[T]> + '_, ContainerError> {
        self.check_host_access()?;
        Ok(self
            .row_offsets
            .windows(2)
            .map(move |w| &self.entries[w[0]..w[1]]))
    }

    pub(crate) fn row_bounds(&self, row: usize) -> Result<(usize, usize), ContainerError> {
        if row >= self.num_rows() {
            return Err(ContainerError::OutOfRange {
                index: row,
                len: self.num_rows(),
            });
        }
        Ok((self.row_offsets[row], self.row_offsets[row + 1]))
    }

    pub(crate) fn check_host_access(&self) -> Result<(), ContainerError> {
        if self.space.host_accessible() {
            Ok(())
        } else {
            Err(ContainerError::HostAccessDenied {
                space: self.space.name(),
            })
        }
    }
}

impl<T, S: MemorySpace> fmt::Debug for CompressedRows<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedRows")
            .field("space", &self.space.name())
            .field("num_rows", &self.num_rows())
            .field("num_entries", &self.num_entries())
            .field("partition", &self.partition)
            .finish()
    }
}

/// Exclusive prefix sum of `row_sizes`, validated.
fn prefix_offsets<I>(row_sizes: I) -> Result<Vec<usize>, ContainerError>
where
    I: IntoIterator,
    I::Item: TryInto<usize> + fmt::Debug + Copy,
{
    let iter = row_sizes.into_iter();
    let mut offsets = Vec::with_capacity(iter.size_hint().0 + 1);
    offsets.push(0usize);
    let mut total = 0usize;
    for (row, size) in iter.enumerate() {
        let len: usize = size
            .try_into()
            .map_err(|_| ContainerError::InvalidArgument {
                reason: format!("row {row} has invalid size {size:?}"),
            })?;
        total = total
            .checked_add(len)
            .ok_or_else(|| ContainerError::InvalidArgument {
                reason: format!("total entry count overflows at row {row}"),
            })?;
        offsets.push(total);
    }
    Ok(offsets)
}

fn validate_offsets(row_offsets: &[usize], num_entries: usize) -> Result<(), ContainerError> {
    let Some(&first) = row_offsets.first() else {
        return Err(ContainerError::InvalidArgument {
            reason: "row offsets must hold at least one element".into(),
        });
    };
    if first != 0 {
        return Err(ContainerError::InvalidArgument {
            reason: format!("row offsets must start at 0, got {first}"),
        });
    }
    if let Some(row) = row_offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(ContainerError::InvalidArgument {
            reason: format!("row offsets decrease at row {row}"),
        });
    }
    let last = row_offsets[row_offsets.len() - 1];
    if last != num_entries {
        return Err(ContainerError::InvalidArgument {
            reason: format!("row offsets end at {last} but there are {num_entries} entries"),
        });
    }
    Ok(())
}
