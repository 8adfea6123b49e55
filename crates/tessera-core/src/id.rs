//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a task slot inside a task queue.
///
/// A `TaskId` is a generation-checked arena index: `index` selects the slab
/// slot, `generation` is the slot's generation when the task was spawned.
/// Once the task is deallocated the slot's generation advances, so any
/// `TaskId` still naming the old generation resolves to nothing instead of
/// aliasing whatever task reuses the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    index: u32,
    generation: u32,
}

impl TaskId {
    /// Build an id from a slot index and the slot's generation.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slab slot this id points into.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// The slot generation this id was issued for.
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_round_trip() {
        let id = TaskId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
    }

    #[test]
    fn generation_distinguishes_reused_slots() {
        assert_ne!(TaskId::new(2, 0), TaskId::new(2, 1));
    }

    #[test]
    fn display_shows_index_and_generation() {
        assert_eq!(TaskId::new(12, 4).to_string(), "12v4");
    }
}
