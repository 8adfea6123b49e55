//! Core abstraction trait for task storage.

use std::ops::Deref;

use crate::id::TaskId;

/// Storage and reference-count protocol behind a task future.
///
/// A task pool owns every task record. Futures hold a [`TaskId`] plus a
/// shared pointer to the pool and drive the reference count through this
/// trait; the pool performs physical deallocation. Count operations must
/// be atomic: futures referencing the same task may be cloned and dropped
/// concurrently from different threads.
pub trait TaskPool: Send + Sync {
    /// The result type stored by each task.
    type Value;

    /// Borrow of a task's result, valid while the borrow lives.
    type ValueRef<'a>: Deref<Target = Self::Value>
    where
        Self: 'a;

    /// Add one reference to `task`.
    fn increment_reference_count(&self, task: TaskId);

    /// Remove one reference from `task`.
    ///
    /// Returns `true` iff this removed the last reference. Exactly one
    /// caller observes `true` for a given task, even under concurrent
    /// decrements.
    fn decrement_and_check_reference_count(&self, task: TaskId) -> bool;

    /// Physically release `task`. Called once, by whichever holder
    /// observed `true` from [`decrement_and_check_reference_count`].
    ///
    /// [`decrement_and_check_reference_count`]: TaskPool::decrement_and_check_reference_count
    fn deallocate(&self, task: TaskId);

    /// Whether `task`'s result has been published and its waiters released.
    ///
    /// Non-blocking; callers poll.
    fn wait_queue_is_consumed(&self, task: TaskId) -> bool;

    /// Borrow `task`'s result, or `None` if no result has been published.
    fn value(&self, task: TaskId) -> Option<Self::ValueRef<'_>>;
}
