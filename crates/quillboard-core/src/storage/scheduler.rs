//! Debounced save scheduling.
//!
//! Edits mark a target dirty; the scheduler holds each target until its
//! delay elapses with no further edits, coalescing bursts into one save.
//! Time is passed in explicitly so callers (and tests) control the clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Delay between the last edit and the save.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(100);

/// What to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveTarget {
    Canvas(Uuid),
    File(Uuid),
}

/// Coalesces dirty targets into due saves.
#[derive(Debug)]
pub struct SaveScheduler {
    delay: Duration,
    pending: HashMap<SaveTarget, Instant>,
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Mark a target dirty at `now`. Repeated marks push the due time back.
    pub fn mark_dirty(&mut self, target: SaveTarget, now: Instant) {
        self.pending.insert(target, now + self.delay);
    }

    /// Targets whose delay has elapsed by `now`. Due targets are removed
    /// from the schedule.
    pub fn poll(&mut self, now: Instant) -> Vec<SaveTarget> {
        let due: Vec<SaveTarget> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(target, _)| *target)
            .collect();
        for target in &due {
            self.pending.remove(target);
        }
        due
    }

    /// Drain everything regardless of due time, for shutdown.
    pub fn flush(&mut self) -> Vec<SaveTarget> {
        self.pending.drain().map(|(target, _)| target).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_due_after_delay() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let target = SaveTarget::Canvas(Uuid::new_v4());

        scheduler.mark_dirty(target, t0);
        assert!(scheduler.poll(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(100)), vec![target]);
        // Consumed on poll.
        assert!(scheduler.poll(t0 + Duration::from_millis(200)).is_empty());
    }

    #[test]
    fn test_repeated_marks_coalesce() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let target = SaveTarget::File(Uuid::new_v4());

        scheduler.mark_dirty(target, t0);
        scheduler.mark_dirty(target, t0 + Duration::from_millis(80));

        // The first deadline has passed but the second mark pushed it back.
        assert!(scheduler.poll(t0 + Duration::from_millis(120)).is_empty());
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(180)), vec![target]);
    }

    #[test]
    fn test_independent_targets() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let canvas = SaveTarget::Canvas(Uuid::new_v4());
        let file = SaveTarget::File(Uuid::new_v4());

        scheduler.mark_dirty(canvas, t0);
        scheduler.mark_dirty(file, t0 + Duration::from_millis(60));

        assert_eq!(scheduler.poll(t0 + Duration::from_millis(110)), vec![canvas]);
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(160)), vec![file]);
    }

    #[test]
    fn test_flush_drains_everything() {
        let mut scheduler = SaveScheduler::default();
        let t0 = Instant::now();
        scheduler.mark_dirty(SaveTarget::Canvas(Uuid::new_v4()), t0);
        scheduler.mark_dirty(SaveTarget::File(Uuid::new_v4()), t0);

        assert_eq!(scheduler.flush().len(), 2);
        assert!(scheduler.is_empty());
    }
}
