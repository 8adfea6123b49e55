//! Error types for the Tessera kernels.
//!
//! Organised by subsystem: [`ContainerError`] for compressed-row
//! containers and their mirrors, [`TaskError`] for task queues and
//! futures. Every variant is a programmer-error class failure reported
//! synchronously at the offending call; none are retried.

use std::error::Error;
use std::fmt;
use std::ops::Range;

use crate::id::TaskId;

/// Errors from building, accessing, partitioning, or mirroring a
/// compressed-row container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerError {
    /// Malformed construction or partitioning input (negative row size,
    /// zero block count, inconsistent offsets, mismatched mirror shape).
    InvalidArgument {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// An index outside the valid range.
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The number of valid positions.
        len: usize,
    },
    /// A row was addressed through a block view that does not cover it.
    RowOutsideBlock {
        /// The global row index requested.
        row: usize,
        /// The block the view belongs to.
        block: usize,
        /// Global rows the block covers.
        rows: Range<usize>,
    },
    /// The memory space could not satisfy an allocation.
    AllocationFailure {
        /// Number of elements requested.
        requested: usize,
    },
    /// Direct host access was requested on data that lives in a space
    /// without host access. Go through a host mirror instead.
    HostAccessDenied {
        /// Name of the memory space holding the data.
        space: &'static str,
    },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::RowOutsideBlock { row, block, rows } => {
                write!(f, "row {row} is outside block {block} (rows {rows:?})")
            }
            Self::AllocationFailure { requested } => {
                write!(f, "allocation of {requested} elements failed")
            }
            Self::HostAccessDenied { space } => {
                write!(f, "memory space '{space}' is not host accessible")
            }
        }
    }
}

impl Error for ContainerError {}

/// Errors from task queues and task futures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskError {
    /// `get()` was called on a future that holds no task.
    NullDereference,
    /// `get()` was called before the task's result was published.
    PreconditionViolation {
        /// Which precondition failed.
        reason: String,
    },
    /// The id names a slot generation that has already been deallocated.
    StaleTask {
        /// The stale id.
        task: TaskId,
    },
    /// Every slot in the queue is occupied by a live task.
    QueueFull {
        /// Number of slots in the queue.
        capacity: u32,
    },
    /// A result was published twice for the same task.
    AlreadyComplete {
        /// The task that was already complete.
        task: TaskId,
    },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullDereference => write!(f, "dereferenced an empty task future"),
            Self::PreconditionViolation { reason } => {
                write!(f, "precondition violated: {reason}")
            }
            Self::StaleTask { task } => write!(f, "task {task} has been deallocated"),
            Self::QueueFull { capacity } => {
                write!(f, "task queue full: all {capacity} slots are live")
            }
            Self::AlreadyComplete { task } => write!(f, "task {task} is already complete"),
        }
    }
}

impl Error for TaskError {}
