//! Reference-counted task futures over a slab-backed task queue.
//!
//! # Architecture
//!
//! ```text
//! Arc<TaskQueue<V>>
//! ├── slots: Box<[TaskSlot<V>]>   (fixed slab, one per concurrent task)
//! │   ├── generation: AtomicU32   (bumped on deallocation)
//! │   ├── ref_count: AtomicU32    (shared by every future on the task)
//! │   ├── state: AtomicU8         (free / pending / ready)
//! │   └── value: RwLock<Option<V>>
//! ├── free_list: Mutex<Vec<u32>>
//! └── ready channel               (ids of tasks whose result was published)
//!
//! TaskFuture<P: TaskPool> = Option<(Arc<P>, TaskId)>
//! ```
//!
//! A [`TaskFuture`] contributes exactly one reference to its task. Cloning
//! adds one, moving transfers it, and dropping or [`TaskFuture::clear`]
//! removes it. Whichever future removes the last reference asks the queue
//! to deallocate the slot, exactly once.
//!
//! Futures store a generation-checked [`TaskId`](tessera_core::TaskId)
//! rather than a pointer, so a future that outlives its task (only possible
//! through [`TaskFuture::from_raw`] misuse) observes a stale id instead of
//! another task's data.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod future;
pub mod metrics;
pub mod queue;

pub use config::{TaskQueueConfig, CREATOR_RETAINS_ONE_REFERENCE};
pub use future::TaskFuture;
pub use metrics::QueueMetrics;
pub use queue::{TaskQueue, TaskValue};
