//! Task queue counters.
//!
//! [`QueueMetrics`] is a point-in-time copy of the counters a
//! [`TaskQueue`](crate::TaskQueue) maintains while it runs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters read from a task queue by [`TaskQueue::metrics`](crate::TaskQueue::metrics).
///
/// All counts are cumulative since the queue was created, except
/// `live_tasks` and `ready_pending`, which are current values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Tasks spawned.
    pub spawned: u64,
    /// Results published.
    pub completed: u64,
    /// Slots released back to the free list.
    pub deallocated: u64,
    /// Tasks currently occupying a slot.
    pub live_tasks: u64,
    /// Ready notifications not yet taken from the ready channel.
    pub ready_pending: u64,
    /// Operations that named an already-deallocated task.
    pub stale_id_events: u64,
    /// Spawns rejected because every slot was live.
    pub queue_full_rejections: u64,
    /// Ready notifications dropped because the ready channel was full.
    pub ready_dropped: u64,
}

/// Atomic backing store for [`QueueMetrics`].
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub(crate) spawned: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) deallocated: AtomicU64,
    pub(crate) stale_id_events: AtomicU64,
    pub(crate) queue_full_rejections: AtomicU64,
    pub(crate) ready_dropped: AtomicU64,
}

impl QueueCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, ready_pending: usize) -> QueueMetrics {
        let spawned = self.spawned.load(Ordering::Relaxed);
        let deallocated = self.deallocated.load(Ordering::Relaxed);
        QueueMetrics {
            spawned,
            completed: self.completed.load(Ordering::Relaxed),
            deallocated,
            live_tasks: spawned.saturating_sub(deallocated),
            ready_pending: ready_pending as u64,
            stale_id_events: self.stale_id_events.load(Ordering::Relaxed),
            queue_full_rejections: self.queue_full_rejections.load(Ordering::Relaxed),
            ready_dropped: self.ready_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = QueueMetrics::default();
        assert_eq!(m.spawned, 0);
        assert_eq!(m.completed, 0);
        assert_eq!(m.deallocated, 0);
        assert_eq!(m.live_tasks, 0);
        assert_eq!(m.ready_pending, 0);
        assert_eq!(m.stale_id_events, 0);
        assert_eq!(m.queue_full_rejections, 0);
        assert_eq!(m.ready_dropped, 0);
    }

    #[test]
    fn snapshot_derives_live_tasks() {
        let counters = QueueCounters::default();
        for _ in 0..5 {
            QueueCounters::bump(&counters.spawned);
        }
        QueueCounters::bump(&counters.deallocated);
        QueueCounters::bump(&counters.deallocated);
        let m = counters.snapshot(3);
        assert_eq!(m.spawned, 5);
        assert_eq!(m.deallocated, 2);
        assert_eq!(m.live_tasks, 3);
        assert_eq!(m.ready_pending, 3);
    }
}
