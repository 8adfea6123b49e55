//! A configurable [`MemorySpace`] for exercising container code paths that
//! the host space never takes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tessera_core::{ContainerError, MemorySpace};

/// Call counters shared by every clone of a [`MockSpace`].
#[derive(Debug, Default)]
pub struct MockSpaceStats {
    allocations: AtomicUsize,
    deep_copies: AtomicUsize,
}

impl MockSpaceStats {
    /// Successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Deep copies so far, successful or not.
    pub fn deep_copies(&self) -> usize {
        self.deep_copies.load(Ordering::Relaxed)
    }
}

/// Memory space that can refuse host access and fail allocations on demand.
///
/// Storage is still plain `Vec`, so its contents can be checked after a
/// mirror back to the host.
#[derive(Clone, Debug)]
pub struct MockSpace {
    host_accessible: bool,
    fail_after: Option<usize>,
    stats: Arc<MockSpaceStats>,
}

impl MockSpace {
    /// A host-accessible space that never fails.
    pub fn new() -> Self {
        Self {
            host_accessible: true,
            fail_after: None,
            stats: Arc::new(MockSpaceStats::default()),
        }
    }

    /// A space the host may not touch directly, like device memory.
    pub fn device() -> Self {
        Self {
            host_accessible: false,
            ..Self::new()
        }
    }

    /// Fail every allocation after the first `successes`.
    pub fn failing_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    pub fn stats(&self) -> &MockSpaceStats {
        &self.stats
    }
}

impl Default for MockSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySpace for MockSpace {
    fn name(&self) -> &'static str {
        if self.host_accessible {
            "mock"
        } else {
            "mock-device"
        }
    }

    fn host_accessible(&self) -> bool {
        self.host_accessible
    }

    fn allocate<T: Clone + Default>(&self, len: usize) -> Result<Vec<T>, ContainerError> {
        if let Some(limit) = self.fail_after {
            if self.stats.allocations() >= limit {
                return Err(ContainerError::AllocationFailure { requested: len });
            }
        }
        self.stats.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(vec![T::default(); len])
    }

    fn deep_copy<T: Clone>(&self, dst: &mut [T], src: &[T]) -> Result<(), ContainerError> {
        self.stats.deep_copies.fetch_add(1, Ordering::Relaxed);
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
