//! Memory-space abstraction for container storage.
//!
//! A [`MemorySpace`] decides where a container's arrays live and how bulk
//! copies between spaces are performed. Containers are generic over their
//! space, so dispatch is resolved at compile time.

use crate::error::ContainerError;

/// Capability set of a memory space: allocate, deep-copy, and a query for
/// whether the host may touch the memory directly.
pub trait MemorySpace: Clone + Send + Sync + 'static {
    /// Short name used in diagnostics and errors.
    fn name(&self) -> &'static str;

    /// Whether host code may read and write this space's memory directly.
    fn host_accessible(&self) -> bool;

    /// Allocate `len` default-initialised elements.
    ///
    /// Returns [`ContainerError::AllocationFailure`] if the space cannot
    /// provide the memory. Nothing is allocated on failure.
    fn allocate<T: Clone + Default>(&self, len: usize) -> Result<Vec<T>, ContainerError>;

    /// Copy `src` into `dst` element by element.
    ///
    /// Both slices must have the same length; a mismatch is
    /// [`ContainerError::InvalidArgument`] and leaves `dst` untouched.
    fn deep_copy<T: Clone>(&self, dst: &mut [T], src: &[T]) -> Result<(), ContainerError>;
}

/// Ordinary host memory backed by `Vec`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostSpace;

impl MemorySpace for HostSpace {
    fn name(&self) -> &'static str {
        "host"
    }

    fn host_accessible(&self) -> bool {
        true
    }

    fn allocate<T: Clone + Default>(&self, len: usize) -> Result<Vec<T>, ContainerError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ContainerError::AllocationFailure { requested: len })?;
        data.resize(len, T::default());
        Ok(data)
    }

    fn deep_copy<T: Clone>(&self, dst: &mut [T], src: &[T]) -> Result<(), ContainerError> {
        if dst.len() != src.len() {
            return Err(ContainerError::InvalidArgument {
                reason: format!(
                    "deep_copy length mismatch: dst has {}, src has {}",
                    dst.len(),
                    src.len()
                ),
            });
        }
        dst.clone_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_allocate_is_default_initialised() {
        let data: Vec<f64> = HostSpace.allocate(16).unwrap();
        assert_eq!(data.len(), 16);
        assert!(data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn host_allocate_zero_is_empty() {
        let data: Vec<u32> = HostSpace.allocate(0).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn host_allocate_impossible_size_fails() {
        let result: Result<Vec<u64>, _> = HostSpace.allocate(usize::MAX);
        assert_eq!(
            result,
            Err(ContainerError::AllocationFailure {
                requested: usize::MAX
            })
        );
    }

    #[test]
    fn deep_copy_copies_values() {
        let src = [1, 2, 3];
        let mut dst = [0; 3];
        HostSpace.deep_copy(&mut dst, &src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn deep_copy_rejects_length_mismatch() {
        let src = [1, 2, 3];
        let mut dst = [9; 2];
        let err = HostSpace.deep_copy(&mut dst, &src).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidArgument { .. }));
        assert_eq!(dst, [9, 9]);
    }

    #[test]
    fn host_space_is_accessible() {
        assert!(HostSpace.host_accessible());
        assert_eq!(HostSpace.name(), "host");
    }
}
