//! Reference-counted handle to a task's eventual result.

use std::fmt;
use std::sync::Arc;

use tessera_core::{TaskError, TaskId, TaskPool};

/// A handle on a task owned by a [`TaskPool`].
///
/// A future is either empty or attached to one task, in which case it owns
/// exactly one of that task's references:
///
/// - [`Clone`] adds a reference; [`Clone::clone_from`] onto a future that
///   already holds the same task changes nothing.
/// - Moving a future (including [`TaskFuture::take`]) transfers its
///   reference without touching the count.
/// - Dropping or [`TaskFuture::clear`] releases the reference; the future
///   that releases the last one asks the pool to deallocate the task.
///
/// Futures on the same task may be cloned and dropped from different
/// threads; the pool's atomic count serialises them.
pub struct TaskFuture<P: TaskPool> {
    task: Option<(Arc<P>, TaskId)>,
}

impl<P: TaskPool> TaskFuture<P> {
    /// An empty future.
    pub const fn new() -> Self {
        Self { task: None }
    }

    /// Attach to `task` by adopting a reference the caller already owns.
    ///
    /// The count is not incremented: the new future takes over the
    /// caller's reference and will release it when dropped.
    pub fn from_raw(pool: Arc<P>, task: TaskId) -> Self {
        Self {
            task: Some((pool, task)),
        }
    }

    /// Whether this future holds no task.
    pub fn is_null(&self) -> bool {
        self.task.is_none()
    }

    /// The task this future is attached to.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task.as_ref().map(|(_, task)| *task)
    }

    /// The pool owning this future's task.
    pub fn pool(&self) -> Option<&Arc<P>> {
        self.task.as_ref().map(|(pool, _)| pool)
    }

    /// Whether both futures hold the same task of the same pool.
    ///
    /// Two empty futures do not share a task.
    pub fn same_task(&self, other: &Self) -> bool {
        match (&self.task, &other.task) {
            (Some((a_pool, a)), Some((b_pool, b))) => Arc::ptr_eq(a_pool, b_pool) && a == b,
            _ => false,
        }
    }

    /// Whether the result can be read.
    ///
    /// An empty future is trivially ready. Otherwise the pool is asked on
    /// every call; readiness is never cached.
    pub fn is_ready(&self) -> bool {
        match &self.task {
            None => true,
            Some((pool, task)) => pool.wait_queue_is_consumed(*task),
        }
    }

    /// Borrow the task's result.
    ///
    /// Fails with [`TaskError::NullDereference`] on an empty future and
    /// [`TaskError::PreconditionViolation`] before the result is published.
    pub fn get(&self) -> Result<P::ValueRef<'_>, TaskError> {
        let (pool, task) = self.task.as_ref().ok_or(TaskError::NullDereference)?;
        if !pool.wait_queue_is_consumed(*task) {
            return Err(TaskError::PreconditionViolation {
                reason: format!("task {task} is not ready"),
            });
        }
        pool.value(*task).ok_or(TaskError::StaleTask { task: *task })
    }

    /// Release this future's reference and become empty.
    ///
    /// No-op on an empty future, so calling it twice is safe.
    pub fn clear(&mut self) {
        if let Some((pool, task)) = self.task.take() {
            if pool.decrement_and_check_reference_count(task) {
                pool.deallocate(task);
            }
        }
    }

    /// Move the task out, leaving this future empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Replace this future's task with `other`'s, releasing the current one.
    ///
    /// When both already hold the same task, `other`'s duplicate reference
    /// is released and the count ends where it started.
    pub fn assign(&mut self, other: Self) {
        *self = other;
    }
}

impl<P: TaskPool> Default for TaskFuture<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TaskPool> Clone for TaskFuture<P> {
    fn clone(&self) -> Self {
        match &self.task {
            Some((pool, task)) => {
                pool.increment_reference_count(*task);
                Self::from_raw(Arc::clone(pool), *task)
            }
            None => Self::new(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.same_task(source) || (self.is_null() && source.is_null()) {
            return;
        }
        // Take the new reference before the old one is released.
        *self = source.clone();
    }
}

impl<P: TaskPool> Drop for TaskFuture<P> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<P: TaskPool> fmt::Debug for TaskFuture<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task_id() {
            Some(task) => f.debug_tuple("TaskFuture").field(&task).finish(),
            None => f.write_str("TaskFuture(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test_utils::MockTaskPool;

    fn attached(pool: &Arc<MockTaskPool<i32>>) -> TaskFuture<MockTaskPool<i32>> {
        let task = pool.insert(1);
        TaskFuture::from_raw(Arc::clone(pool), task)
    }

    #[test]
    fn default_is_empty_and_ready() {
        let fut: TaskFuture<MockTaskPool<i32>> = TaskFuture::default();
        assert!(fut.is_null());
        assert!(fut.is_ready());
        assert_eq!(fut.task_id(), None);
    }

    #[test]
    fn get_on_empty_is_null_dereference() {
        let fut: TaskFuture<MockTaskPool<i32>> = TaskFuture::new();
        assert_eq!(fut.get().unwrap_err(), TaskError::NullDereference);
    }

    #[test]
    fn get_before_ready_is_precondition_violation() {
        let pool = Arc::new(MockTaskPool::new());
        let fut = attached(&pool);
        assert!(matches!(
            fut.get(),
            Err(TaskError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn readiness_is_polled_not_cached() {
        let pool = Arc::new(MockTaskPool::new());
        let fut = attached(&pool);
        assert!(!fut.is_ready());
        pool.publish(fut.task_id().unwrap(), 42);
        assert!(fut.is_ready());
        assert_eq!(*fut.get().unwrap(), 42);
    }

    #[test]
    fn from_raw_does_not_increment() {
        let pool = Arc::new(MockTaskPool::new());
        let fut = attached(&pool);
        assert_eq!(pool.reference_count(fut.task_id().unwrap()), Some(1));
        assert!(Arc::ptr_eq(fut.pool().unwrap(), &pool));
    }

    #[test]
    fn clone_increments_once() {
        let pool = Arc::new(MockTaskPool::new());
        let a = attached(&pool);
        let id = a.task_id().unwrap();
        let b = a.clone();
        assert_eq!(pool.reference_count(id), Some(2));
        assert!(a.same_task(&b));
    }

    #[test]
    fn clone_from_same_task_is_noop() {
        let pool = Arc::new(MockTaskPool::new());
        let a = attached(&pool);
        let id = a.task_id().unwrap();
        let mut b = a.clone();
        b.clone_from(&a);
        assert_eq!(pool.reference_count(id), Some(2));
        assert_eq!(pool.deallocations(), 0);
    }

    #[test]
    fn clone_from_other_task_swaps_references() {
        let pool = Arc::new(MockTaskPool::new());
        let a = attached(&pool);
        let mut b = attached(&pool);
        let old = b.task_id().unwrap();
        b.clone_from(&a);
        assert!(b.same_task(&a));
        assert_eq!(pool.reference_count(a.task_id().unwrap()), Some(2));
        assert_eq!(pool.deallocation_log(), vec![old]);
    }

    #[test]
    fn take_moves_without_touching_count() {
        let pool = Arc::new(MockTaskPool::new());
        let mut a = attached(&pool);
        let id = a.task_id().unwrap();
        let b = a.take();
        assert!(a.is_null());
        assert_eq!(b.task_id(), Some(id));
        assert_eq!(pool.reference_count(id), Some(1));
        assert_eq!(pool.increments(), 0);
    }

    #[test]
    fn assign_same_task_keeps_count() {
        let pool = Arc::new(MockTaskPool::new());
        let mut a = attached(&pool);
        let id = a.task_id().unwrap();
        let b = a.clone();
        a.assign(b);
        assert_eq!(pool.reference_count(id), Some(1));
        assert_eq!(pool.deallocations(), 0);
    }

    #[test]
    fn assign_releases_previous_task() {
        let pool = Arc::new(MockTaskPool::new());
        let mut a = attached(&pool);
        let old = a.task_id().unwrap();
        let b = attached(&pool);
        let new = b.task_id().unwrap();
        a.assign(b);
        assert_eq!(a.task_id(), Some(new));
        assert_eq!(pool.deallocation_log(), vec![old]);
    }

    #[test]
    fn clear_twice_deallocates_once() {
        let pool = Arc::new(MockTaskPool::new());
        let mut fut = attached(&pool);
        fut.clear();
        fut.clear();
        assert!(fut.is_null());
        assert_eq!(pool.deallocations(), 1);
    }

    #[test]
    fn empty_future_can_be_reused() {
        let pool = Arc::new(MockTaskPool::new());
        let mut fut = attached(&pool);
        fut.clear();
        fut = attached(&pool);
        assert!(!fut.is_null());
        drop(fut);
        assert_eq!(pool.deallocations(), 2);
    }

    #[test]
    fn debug_shows_task() {
        let fut: TaskFuture<MockTaskPool<i32>> = TaskFuture::new();
        assert_eq!(format!("{fut:?}"), "TaskFuture(empty)");
    }
}
