//! Task queue configuration.

use tessera_core::TaskError;

/// Whether a freshly spawned task carries an extra reference owned by the
/// scheduler, released when the task's result is published.
///
/// With this set, a task spawned with one outstanding future starts at a
/// count of 2 and cannot be deallocated before it completes, even if every
/// future is dropped early.
pub const CREATOR_RETAINS_ONE_REFERENCE: bool = true;

/// Configuration for a [`TaskQueue`](crate::TaskQueue).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskQueueConfig {
    /// Number of task slots. Spawning beyond this many live tasks fails
    /// with [`TaskError::QueueFull`].
    ///
    /// Default: 4096. Must be at least 1.
    pub capacity: u32,

    /// See [`CREATOR_RETAINS_ONE_REFERENCE`].
    pub creator_retains_reference: bool,
}

impl TaskQueueConfig {
    /// Default slot count.
    pub const DEFAULT_CAPACITY: u32 = 4096;

    /// Create a config with `capacity` slots.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            creator_retains_reference: CREATOR_RETAINS_ONE_REFERENCE,
        }
    }

    /// Reference count a task starts with when spawned with one future.
    pub fn initial_reference_count(&self) -> u32 {
        1 + u32::from(self.creator_retains_reference)
    }

    /// Check the config before use.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.capacity == 0 {
            return Err(TaskError::QueueFull { capacity: 0 });
        }
        Ok(())
    }
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity() {
        let config = TaskQueueConfig::default();
        assert_eq!(config.capacity, 4096);
        assert!(config.creator_retains_reference);
    }

    #[test]
    fn initial_count_accounts_for_creator() {
        let mut config = TaskQueueConfig::new(8);
        assert_eq!(config.initial_reference_count(), 2);
        config.creator_retains_reference = false;
        assert_eq!(config.initial_reference_count(), 1);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            TaskQueueConfig::new(0).validate(),
            Err(TaskError::QueueFull { capacity: 0 })
        );
    }
}
