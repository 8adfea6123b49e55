//! Tessera: load-balanced compressed-row containers and reference-counted
//! task futures for parallel kernels.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tessera sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! // Three rows of lengths 3, 0 and 2, split into two balanced blocks.
//! let mut rows = CompressedRows::from_rows(&[vec![1, 2, 3], vec![], vec![4, 5]]).unwrap();
//! rows.partition_with(&PartitionConfig::new(2)).unwrap();
//! assert_eq!(rows.row(2).unwrap(), &[4, 5]);
//!
//! for mut block in rows.blocks_mut().unwrap() {
//!     block.for_each_row(|_, entries| entries.iter_mut().for_each(|v| *v *= 10));
//! }
//! assert_eq!(rows.row(0).unwrap(), &[10, 20, 30]);
//!
//! // A task whose result is shared by two futures.
//! let queue = TaskQueue::new(TaskQueueConfig::new(16)).unwrap();
//! let first = queue.spawn().unwrap();
//! let second = first.clone();
//! queue.complete(first.task_id().unwrap(), "done").unwrap();
//! drop(first);
//! assert_eq!(*second.get().unwrap(), "done");
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | Task ids, errors, memory spaces, the task-pool trait |
//! | [`crs`] | `tessera-crs` | Compressed-row containers, partitioning, mirrors |
//! | [`task`] | `tessera-task` | Task queue and reference-counted futures |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and errors (`tessera-core`).
///
/// Contains [`types::TaskId`], the error enums, the [`types::MemorySpace`]
/// abstraction and the [`types::TaskPool`] protocol.
pub use tessera_core as types;

/// Compressed-row containers (`tessera-crs`).
///
/// [`crs::CompressedRows`] with block partitioning, disjoint block views
/// and mirrors across memory spaces.
pub use tessera_crs as crs;

/// Task queue and futures (`tessera-task`).
///
/// [`task::TaskQueue`] owns task storage; [`task::TaskFuture`] is the
/// reference-counted handle on one task.
pub use tessera_task as task;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Core types and errors
    pub use tessera_core::{ContainerError, HostSpace, MemorySpace, TaskError, TaskId, TaskPool};

    // Containers
    pub use tessera_crs::{BlockMut, CompressedRows, PartitionConfig};

    // Tasks
    pub use tessera_task::{QueueMetrics, TaskFuture, TaskQueue, TaskQueueConfig};
}
