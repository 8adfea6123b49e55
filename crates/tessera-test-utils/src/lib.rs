//! Test utilities and mock types for Tessera development.
//!
//! Provides mock implementations of the core traits ([`MemorySpace`] via
//! [`MockSpace`], [`TaskPool`] via [`MockTaskPool`]) and row-size fixtures
//! for container tests.
//!
//! [`MemorySpace`]: tessera_core::MemorySpace
//! [`TaskPool`]: tessera_core::TaskPool

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod space;

pub use space::{MockSpace, MockSpaceStats};

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tessera_core::{TaskId, TaskPool};

struct MockTask<V> {
    references: u32,
    value: Option<Arc<V>>,
}

/// Mock implementation of [`TaskPool`].
///
/// Tasks live in an `IndexMap<TaskId, _>` behind a mutex. Every call is
/// recorded so tests can assert on the exact reference traffic a future
/// generated. Create tasks with [`insert`](MockTaskPool::insert), publish
/// results with [`publish`](MockTaskPool::publish).
pub struct MockTaskPool<V> {
    tasks: Mutex<IndexMap<TaskId, MockTask<V>>>,
    next_index: AtomicU32,
    increments: AtomicUsize,
    deallocated: Mutex<Vec<TaskId>>,
    bad_deallocations: AtomicUsize,
}

impl<V> MockTaskPool<V> {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(IndexMap::new()),
            next_index: AtomicU32::new(0),
            increments: AtomicUsize::new(0),
            deallocated: Mutex::new(Vec::new()),
            bad_deallocations: AtomicUsize::new(0),
        }
    }

    /// Create a pending task holding `references` references.
    pub fn insert(&self, references: u32) -> TaskId {
        let task = TaskId::new(self.next_index.fetch_add(1, Ordering::Relaxed), 0);
        self.tasks.lock().unwrap().insert(
            task,
            MockTask {
                references,
                value: None,
            },
        );
        task
    }

    /// Publish `value` as `task`'s result.
    pub fn publish(&self, task: TaskId, value: V) {
        let mut tasks = self.tasks.lock().unwrap();
        let entry = tasks.get_mut(&task).expect("publish on unknown task");
        entry.value = Some(Arc::new(value));
    }

    /// Current count of a live task.
    pub fn reference_count(&self, task: TaskId) -> Option<u32> {
        self.tasks.lock().unwrap().get(&task).map(|t| t.references)
    }

    /// Number of live tasks.
    pub fn live(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Total successful deallocations.
    pub fn deallocations(&self) -> usize {
        self.deallocated.lock().unwrap().len()
    }

    /// Deallocated tasks, in order.
    pub fn deallocation_log(&self) -> Vec<TaskId> {
        self.deallocated.lock().unwrap().clone()
    }

    /// Deallocations of unknown tasks or tasks with references left.
    pub fn bad_deallocations(&self) -> usize {
        self.bad_deallocations.load(Ordering::Relaxed)
    }

    /// Total calls to `increment_reference_count`.
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::Relaxed)
    }
}

impl<V> Default for MockTaskPool<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + Sync> TaskPool for MockTaskPool<V> {
    type Value = V;
    type ValueRef<'a>
        = Arc<V>
    where
        Self: 'a;

    fn increment_reference_count(&self, task: TaskId) {
        self.increments.fetch_add(1, Ordering::Relaxed);
        if let Some(entry) = self.tasks.lock().unwrap().get_mut(&task) {
            entry.references += 1;
        }
    }

    fn decrement_and_check_reference_count(&self, task: TaskId) -> bool {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&task) {
            Some(entry) if entry.references > 0 => {
                entry.references -= 1;
                entry.references == 0
            }
            _ => false,
        }
    }

    fn deallocate(&self, task: TaskId) {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(&task) {
            Some(entry) if entry.references == 0 => {
                tasks.shift_remove(&task);
                self.deallocated.lock().unwrap().push(task);
            }
            _ => {
                self.bad_deallocations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn wait_queue_is_consumed(&self, task: TaskId) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .get(&task)
            .is_some_and(|t| t.value.is_some())
    }

    fn value(&self, task: TaskId) -> Option<Arc<V>> {
        self.tasks
            .lock()
            .unwrap()
            .get(&task)
            .and_then(|t| t.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_pool_tracks_references() {
        let pool: MockTaskPool<u8> = MockTaskPool::new();
        let task = pool.insert(1);
        pool.increment_reference_count(task);
        assert_eq!(pool.reference_count(task), Some(2));
        assert!(!pool.decrement_and_check_reference_count(task));
        assert!(pool.decrement_and_check_reference_count(task));
        pool.deallocate(task);
        assert_eq!(pool.deallocation_log(), vec![task]);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn mock_pool_flags_bad_deallocation() {
        let pool: MockTaskPool<u8> = MockTaskPool::new();
        let task = pool.insert(1);
        pool.deallocate(task);
        assert_eq!(pool.bad_deallocations(), 1);
        assert_eq!(pool.deallocations(), 0);
    }

    #[test]
    fn mock_pool_publishes_values() {
        let pool = MockTaskPool::new();
        let task = pool.insert(1);
        assert!(!pool.wait_queue_is_consumed(task));
        pool.publish(task, "x");
        assert!(pool.wait_queue_is_consumed(task));
        assert_eq!(*pool.value(task).unwrap(), "x");
    }
}
