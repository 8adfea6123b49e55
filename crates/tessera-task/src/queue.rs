//! Slab-backed task queue.
//!
//! [`TaskQueue`] owns a fixed slab of task slots. Each slot co-locates the
//! task's atomic reference count with its readiness state and result
//! storage. Slots are recycled through a free list; a slot's generation is
//! bumped on deallocation so ids for the old task stop resolving.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tessera_core::{TaskError, TaskId, TaskPool};
use tracing::{debug, trace, warn};

use crate::config::TaskQueueConfig;
use crate::future::TaskFuture;
use crate::metrics::{QueueCounters, QueueMetrics};

const STATE_FREE: u8 = 0;
const STATE_PENDING: u8 = 1;
const STATE_READY: u8 = 2;
const STATE_COMPLETING: u8 = 3;

/// One task record.
struct TaskSlot<V> {
    generation: AtomicU32,
    ref_count: AtomicU32,
    state: AtomicU8,
    value: RwLock<Option<V>>,
}

impl<V> TaskSlot<V> {
    fn new() -> Self {
        Self {
            generation: AtomicU32::new(0),
            ref_count: AtomicU32::new(0),
            state: AtomicU8::new(STATE_FREE),
            value: RwLock::new(None),
        }
    }
}

/// Shared owner of every task's storage.
///
/// Always used behind an `Arc`: futures keep a clone of it so that the last
/// future to release a task can hand the slot back.
///
/// The scheduler side spawns tasks with [`TaskQueue::spawn`] and publishes
/// results with [`TaskQueue::complete`]. Once a consumer subscribes through
/// [`TaskQueue::ready_receiver`] or [`TaskQueue::drain_ready`], ids of
/// completed tasks are also pushed onto a ready channel bounded to the
/// queue's capacity.
pub struct TaskQueue<V> {
    slots: Box<[TaskSlot<V>]>,
    free_list: Mutex<Vec<u32>>,
    ready_tx: Sender<TaskId>,
    ready_rx: Receiver<TaskId>,
    ready_subscribed: AtomicBool,
    counters: QueueCounters,
    config: TaskQueueConfig,
}

// Compile-time assertion: a queue of sendable values can be shared.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TaskQueue<Vec<f64>>>();
};

impl<V: Send + Sync> TaskQueue<V> {
    /// Create a queue with `config.capacity` empty slots.
    pub fn new(config: TaskQueueConfig) -> Result<Arc<Self>, TaskError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a queue with the default configuration.
    pub fn with_default_config() -> Arc<Self> {
        Self::build(TaskQueueConfig::default())
    }

    fn build(config: TaskQueueConfig) -> Arc<Self> {
        let slots = (0..config.capacity).map(|_| TaskSlot::new()).collect();
        // Reversed so that pop() hands out slot 0 first.
        let free_list = (0..config.capacity).rev().collect();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(config.capacity as usize);
        Arc::new(Self {
            slots,
            free_list: Mutex::new(free_list),
            ready_tx,
            ready_rx,
            ready_subscribed: AtomicBool::new(false),
            counters: QueueCounters::default(),
            config,
        })
    }

    /// Allocate a slot for a new task and return the first future on it.
    ///
    /// The task starts with [`TaskQueueConfig::initial_reference_count`]
    /// references: the returned future's, plus the scheduler's own when
    /// `creator_retains_reference` is set. The scheduler's reference is
    /// released by [`TaskQueue::complete`].
    pub fn spawn(self: &Arc<Self>) -> Result<TaskFuture<Self>, TaskError> {
        let index = {
            let mut free = self.free_list.lock().unwrap_or_else(PoisonError::into_inner);
            free.pop()
        };
        let Some(index) = index else {
            QueueCounters::bump(&self.counters.queue_full_rejections);
            return Err(TaskError::QueueFull {
                capacity: self.config.capacity,
            });
        };

        let slot = &self.slots[index as usize];
        let initial = self.config.initial_reference_count();
        slot.ref_count.store(initial, Ordering::Release);
        slot.state.store(STATE_PENDING, Ordering::Release);
        let task = TaskId::new(index, slot.generation.load(Ordering::Acquire));

        QueueCounters::bump(&self.counters.spawned);
        debug!(%task, references = initial, "spawned task");
        Ok(TaskFuture::from_raw(Arc::clone(self), task))
    }

    /// Publish `task`'s result.
    ///
    /// After this call every future on the task reports ready on its next
    /// poll. A second call for the same task fails with
    /// [`TaskError::AlreadyComplete`] without touching the result. When the
    /// queue is configured with `creator_retains_reference`, the
    /// scheduler's reference is released here; if no future remains the
    /// task is deallocated immediately.
    ///
    /// The caller must still own a reference to `task` (the scheduler's, or
    /// a future's).
    pub fn complete(&self, task: TaskId, value: V) -> Result<(), TaskError> {
        let slot = self.live_slot(task)?;
        // Only a pending task reaches the write lock.
        if slot
            .state
            .compare_exchange(
                STATE_PENDING,
                STATE_COMPLETING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(TaskError::AlreadyComplete { task });
        }
        *slot.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        slot.state.store(STATE_READY, Ordering::Release);

        QueueCounters::bump(&self.counters.completed);
        self.notify_ready(task);
        debug!(%task, "completed task");

        if self.config.creator_retains_reference && self.decrement_and_check_reference_count(task)
        {
            self.deallocate(task);
        }
        Ok(())
    }

    /// Add a reference to a live task and wrap it in a new future.
    pub fn attach(self: &Arc<Self>, task: TaskId) -> Result<TaskFuture<Self>, TaskError> {
        self.live_slot(task)?;
        self.increment_reference_count(task);
        Ok(TaskFuture::from_raw(Arc::clone(self), task))
    }

    /// Current reference count of `task`, or `None` once it is deallocated.
    pub fn reference_count(&self, task: TaskId) -> Option<u32> {
        self.slot(task)
            .map(|slot| slot.ref_count.load(Ordering::Acquire))
    }

    /// Whether `task` still occupies its slot.
    pub fn is_live(&self, task: TaskId) -> bool {
        self.slot(task).is_some()
    }

    /// Number of tasks currently occupying a slot.
    pub fn live_count(&self) -> usize {
        let free = self.free_list.lock().unwrap_or_else(PoisonError::into_inner);
        self.slots.len() - free.len()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// The configuration this queue was built with.
    pub fn config(&self) -> &TaskQueueConfig {
        &self.config
    }

    /// A receiver of ids for tasks whose result has been published.
    ///
    /// Completions are only queued after the first call to this method or
    /// [`TaskQueue::drain_ready`]. Every completion is delivered to exactly
    /// one receiver clone. At most `capacity` notifications are held;
    /// further ones are dropped and counted in
    /// [`QueueMetrics::ready_dropped`]. An id may be stale by the time it is
    /// received if all references were released in between.
    pub fn ready_receiver(&self) -> Receiver<TaskId> {
        self.ready_subscribed.store(true, Ordering::Release);
        self.ready_rx.clone()
    }

    /// Take every pending ready notification without blocking.
    ///
    /// Subscribes the queue to ready notifications like
    /// [`TaskQueue::ready_receiver`].
    pub fn drain_ready(&self) -> Vec<TaskId> {
        self.ready_subscribed.store(true, Ordering::Release);
        self.ready_rx.try_iter().collect()
    }

    /// Snapshot of the queue counters.
    pub fn metrics(&self) -> QueueMetrics {
        self.counters.snapshot(self.ready_rx.len())
    }

    fn notify_ready(&self, task: TaskId) {
        if !self.ready_subscribed.load(Ordering::Acquire) {
            return;
        }
        match self.ready_tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                QueueCounters::bump(&self.counters.ready_dropped);
                warn!(%task, "ready channel full, notification dropped");
            }
            // The queue holds a receiver, so the channel never disconnects.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn slot(&self, task: TaskId) -> Option<&TaskSlot<V>> {
        let slot = self.slots.get(task.index() as usize)?;
        let current = slot.generation.load(Ordering::Acquire) == task.generation();
        let occupied = slot.state.load(Ordering::Acquire) != STATE_FREE;
        (current && occupied).then_some(slot)
    }

    fn live_slot(&self, task: TaskId) -> Result<&TaskSlot<V>, TaskError> {
        self.slot(task).ok_or_else(|| {
            self.note_stale(task, "lookup");
            TaskError::StaleTask { task }
        })
    }

    fn note_stale(&self, task: TaskId, operation: &'static str) {
        QueueCounters::bump(&self.counters.stale_id_events);
        warn!(%task, operation, "operation on deallocated task");
    }
}

impl<V: Send + Sync> TaskPool for TaskQueue<V> {
    type Value = V;
    type ValueRef<'a>
        = TaskValue<'a, V>
    where
        Self: 'a;

    fn increment_reference_count(&self, task: TaskId) {
        match self.slot(task) {
            Some(slot) => {
                let previous = slot.ref_count.fetch_add(1, Ordering::Relaxed);
                trace!(%task, references = previous + 1, "reference added");
            }
            None => self.note_stale(task, "increment"),
        }
    }

    fn decrement_and_check_reference_count(&self, task: TaskId) -> bool {
        let Some(slot) = self.slot(task) else {
            self.note_stale(task, "decrement");
            return false;
        };
        match slot
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
        {
            Ok(previous) => {
                trace!(%task, references = previous - 1, "reference released");
                previous == 1
            }
            Err(_) => {
                warn!(%task, "reference count already zero");
                false
            }
        }
    }

    fn deallocate(&self, task: TaskId) {
        let Some(slot) = self.slot(task) else {
            self.note_stale(task, "deallocate");
            return;
        };
        if slot.ref_count.load(Ordering::Acquire) != 0 {
            warn!(%task, "deallocate called while references remain");
            return;
        }
        // Retire the id before the slot becomes reusable.
        let next = task.generation().wrapping_add(1);
        if slot
            .generation
            .compare_exchange(task.generation(), next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.note_stale(task, "deallocate");
            return;
        }

        let result = slot
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        slot.state.store(STATE_FREE, Ordering::Release);
        self.free_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.index());
        drop(result);

        QueueCounters::bump(&self.counters.deallocated);
        debug!(%task, "deallocated task");
    }

    fn wait_queue_is_consumed(&self, task: TaskId) -> bool {
        self.slot(task)
            .is_some_and(|slot| slot.state.load(Ordering::Acquire) == STATE_READY)
    }

    fn value(&self, task: TaskId) -> Option<TaskValue<'_, V>> {
        let slot = self.slot(task)?;
        let guard = slot.value.read().unwrap_or_else(PoisonError::into_inner);
        guard.is_some().then_some(TaskValue { guard })
    }
}

impl<V> fmt::Debug for TaskQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let free = self
            .free_list
            .lock()
            .map(|free| free.len())
            .unwrap_or_default();
        f.debug_struct("TaskQueue")
            .field("capacity", &self.config.capacity)
            .field("live", &(self.slots.len() - free))
            .field("ready_pending", &self.ready_rx.len())
            .finish()
    }
}

/// Read access to a published task result.
///
/// Holds a read lock on the slot's result storage; the owning future's
/// reference keeps the slot from being deallocated meanwhile.
pub struct TaskValue<'a, V> {
    guard: RwLockReadGuard<'a, Option<V>>,
}

impl<V> Deref for TaskValue<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        match self.guard.as_ref() {
            Some(value) => value,
            None => unreachable!("TaskValue is only built over a published result"),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for TaskValue<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskValue").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: u32) -> Arc<TaskQueue<String>> {
        TaskQueue::new(TaskQueueConfig::new(capacity)).unwrap()
    }

    #[test]
    fn spawn_starts_with_creator_reference() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        assert_eq!(q.reference_count(id), Some(2));
        assert!(!fut.is_ready());
        assert_eq!(q.live_count(), 1);
    }

    #[test]
    fn complete_publishes_and_releases_creator() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        q.complete(id, "done".to_string()).unwrap();

        assert!(fut.is_ready());
        assert_eq!(&*fut.get().unwrap(), "done");
        assert_eq!(q.reference_count(id), Some(1));
    }

    #[test]
    fn completing_twice_is_rejected() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        q.complete(id, "a".into()).unwrap();
        assert_eq!(
            q.complete(id, "b".into()),
            Err(TaskError::AlreadyComplete { task: id })
        );
        assert_eq!(&*fut.get().unwrap(), "a");
    }

    #[test]
    fn task_survives_dropped_futures_until_complete() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        drop(fut);
        assert!(q.is_live(id));
        assert_eq!(q.reference_count(id), Some(1));

        q.complete(id, "late".into()).unwrap();
        assert!(!q.is_live(id));
        assert_eq!(q.metrics().deallocated, 1);
    }

    #[test]
    fn without_creator_reference_last_future_frees() {
        let mut config = TaskQueueConfig::new(2);
        config.creator_retains_reference = false;
        let q: Arc<TaskQueue<u32>> = TaskQueue::new(config).unwrap();
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        assert_eq!(q.reference_count(id), Some(1));
        drop(fut);
        assert!(!q.is_live(id));
    }

    #[test]
    fn full_queue_rejects_spawn() {
        let q = queue(2);
        let _a = q.spawn().unwrap();
        let _b = q.spawn().unwrap();
        assert_eq!(
            q.spawn().unwrap_err(),
            TaskError::QueueFull { capacity: 2 }
        );
        assert_eq!(q.metrics().queue_full_rejections, 1);
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut config = TaskQueueConfig::new(1);
        config.creator_retains_reference = false;
        let q: Arc<TaskQueue<u8>> = TaskQueue::new(config).unwrap();

        let first = q.spawn().unwrap();
        let old = first.task_id().unwrap();
        drop(first);

        let second = q.spawn().unwrap();
        let new = second.task_id().unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(!q.is_live(old));
        assert!(q.is_live(new));
    }

    #[test]
    fn stale_ids_are_rejected() {
        let mut config = TaskQueueConfig::new(1);
        config.creator_retains_reference = false;
        let q: Arc<TaskQueue<u8>> = TaskQueue::new(config).unwrap();
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        drop(fut);

        assert_eq!(q.complete(id, 1), Err(TaskError::StaleTask { task: id }));
        assert_eq!(q.attach(id).unwrap_err(), TaskError::StaleTask { task: id });
        assert!(!q.decrement_and_check_reference_count(id));
        q.deallocate(id);
        assert_eq!(q.metrics().deallocated, 1);
        assert!(q.metrics().stale_id_events >= 3);
    }

    #[test]
    fn attach_adds_a_reference() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        let other = q.attach(id).unwrap();
        assert_eq!(q.reference_count(id), Some(3));
        assert!(other.same_task(&fut));
    }

    #[test]
    fn ready_channel_reports_completions() {
        let q = queue(4);
        let a = q.spawn().unwrap();
        let b = q.spawn().unwrap();
        let rx = q.ready_receiver();

        q.complete(b.task_id().unwrap(), "b".into()).unwrap();
        q.complete(a.task_id().unwrap(), "a".into()).unwrap();

        assert_eq!(q.metrics().ready_pending, 2);
        let ready: Vec<TaskId> = rx.try_iter().collect();
        assert_eq!(ready, vec![b.task_id().unwrap(), a.task_id().unwrap()]);
        assert!(q.drain_ready().is_empty());
    }

    #[test]
    fn completing_again_while_result_is_borrowed() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        q.complete(id, "a".into()).unwrap();

        let value = fut.get().unwrap();
        assert_eq!(
            q.complete(id, "b".into()),
            Err(TaskError::AlreadyComplete { task: id })
        );
        assert_eq!(&*value, "a");
    }

    #[test]
    fn unsubscribed_queue_holds_no_notifications() {
        let q: Arc<TaskQueue<u32>> = TaskQueue::new(TaskQueueConfig::new(1)).unwrap();
        for i in 0..10_000 {
            let fut = q.spawn().unwrap();
            q.complete(fut.task_id().unwrap(), i).unwrap();
        }
        let m = q.metrics();
        assert_eq!(m.live_tasks, 0);
        assert_eq!(m.ready_pending, 0);
        assert_eq!(m.ready_dropped, 0);
    }

    #[test]
    fn ready_channel_is_bounded_by_capacity() {
        let q: Arc<TaskQueue<u32>> = TaskQueue::new(TaskQueueConfig::new(2)).unwrap();
        let rx = q.ready_receiver();
        for i in 0..5 {
            let fut = q.spawn().unwrap();
            q.complete(fut.task_id().unwrap(), i).unwrap();
        }
        let m = q.metrics();
        assert_eq!(m.ready_pending, 2);
        assert_eq!(m.ready_dropped, 3);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn deallocate_with_live_references_is_refused() {
        let q = queue(4);
        let fut = q.spawn().unwrap();
        let id = fut.task_id().unwrap();
        q.deallocate(id);
        assert!(q.is_live(id));
    }

    #[test]
    fn metrics_track_lifecycle() {
        let q = queue(8);
        let futures: Vec<_> = (0..3).map(|_| q.spawn().unwrap()).collect();
        for fut in &futures {
            q.complete(fut.task_id().unwrap(), "x".into()).unwrap();
        }
        drop(futures);
        let m = q.metrics();
        assert_eq!(m.spawned, 3);
        assert_eq!(m.completed, 3);
        assert_eq!(m.deallocated, 3);
        assert_eq!(m.live_tasks, 0);
        assert_eq!(q.live_count(), 0);
    }

    #[test]
    fn result_is_dropped_on_deallocation() {
        let q: Arc<TaskQueue<Arc<()>>> = TaskQueue::new(TaskQueueConfig::new(2)).unwrap();
        let payload = Arc::new(());
        let fut = q.spawn().unwrap();
        q.complete(fut.task_id().unwrap(), Arc::clone(&payload)).unwrap();
        assert_eq!(Arc::strong_count(&payload), 2);
        drop(fut);
        assert_eq!(Arc::strong_count(&payload), 1);
    }
}
