//! Generation-tagged debouncer.

use log::debug;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Action a debouncer triggers on expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKind {
    /// Clear the search field without re-filtering the list.
    ClearSearch,
    /// Open the first entry of the current filtered view.
    OpenTopMatch,
}

impl DebounceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClearSearch => "clear_search",
            Self::OpenTopMatch => "open_top_match",
        }
    }
}

impl Display for DebounceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered when a scheduled delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceExpiry {
    pub kind: DebounceKind,
    /// Generation captured at `arm` time.
    pub generation: u64,
}

/// Delivers a [`DebounceExpiry`] back to its owner after `delay`.
///
/// Implementations must not call back synchronously; delivery happens on
/// the owner's event loop.
pub trait ExpiryScheduler {
    fn schedule(&self, expiry: DebounceExpiry, delay: Duration);
}

/// Debounce state for one action.
#[derive(Debug, Clone)]
pub struct Debouncer {
    kind: DebounceKind,
    interval: Duration,
    pending: bool,
    generation: u64,
}

impl Debouncer {
    pub fn new(kind: DebounceKind, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            pending: false,
            generation: 0,
        }
    }

    pub fn kind(&self) -> DebounceKind {
        self.kind
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns whether an armed callback is still expected to act.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Restarts the timer: supersedes any in-flight callback and schedules
    /// a new one `interval` from now.
    ///
    /// Returns the generation the new callback carries.
    pub fn arm(&mut self, scheduler: &dyn ExpiryScheduler) -> u64 {
        self.generation += 1;
        self.pending = true;
        scheduler.schedule(
            DebounceExpiry {
                kind: self.kind,
                generation: self.generation,
            },
            self.interval,
        );
        self.generation
    }

    /// Invalidates any in-flight callback without scheduling a new one.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    /// Accepts a delivered callback.
    ///
    /// Returns `true` when the caller should run the action; stale
    /// generations are ignored.
    pub fn on_expiry(&mut self, generation: u64) -> bool {
        if !self.pending || generation != self.generation {
            debug!(
                "event=debounce_expiry module=debounce status=stale kind={} generation={} current={}",
                self.kind, generation, self.generation
            );
            return false;
        }
        self.pending = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{DebounceExpiry, DebounceKind, Debouncer, ExpiryScheduler};
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: RefCell<Vec<(DebounceExpiry, Duration)>>,
    }

    impl ExpiryScheduler for RecordingScheduler {
        fn schedule(&self, expiry: DebounceExpiry, delay: Duration) {
            self.scheduled.borrow_mut().push((expiry, delay));
        }
    }

    #[test]
    fn rearm_supersedes_previous_callback() {
        let scheduler = RecordingScheduler::default();
        let mut debouncer = Debouncer::new(DebounceKind::ClearSearch, Duration::from_secs(5));

        let first = debouncer.arm(&scheduler);
        let second = debouncer.arm(&scheduler);

        assert!(!debouncer.on_expiry(first));
        assert!(debouncer.is_pending());
        assert!(debouncer.on_expiry(second));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn expiry_runs_at_most_once_per_arm() {
        let scheduler = RecordingScheduler::default();
        let mut debouncer = Debouncer::new(DebounceKind::OpenTopMatch, Duration::from_secs(3));
        let generation = debouncer.arm(&scheduler);

        assert!(debouncer.on_expiry(generation));
        assert!(!debouncer.on_expiry(generation));
    }

    #[test]
    fn cancel_invalidates_without_scheduling() {
        let scheduler = RecordingScheduler::default();
        let mut debouncer = Debouncer::new(DebounceKind::OpenTopMatch, Duration::from_secs(3));
        let generation = debouncer.arm(&scheduler);
        debouncer.cancel();

        assert_eq!(scheduler.scheduled.borrow().len(), 1);
        assert!(!debouncer.is_pending());
        assert!(!debouncer.on_expiry(generation));
    }

    #[test]
    fn schedules_with_configured_interval_and_kind() {
        let scheduler = RecordingScheduler::default();
        let mut debouncer = Debouncer::new(DebounceKind::ClearSearch, Duration::from_millis(250));
        debouncer.arm(&scheduler);

        let scheduled = scheduler.scheduled.borrow();
        assert_eq!(scheduled[0].0.kind, DebounceKind::ClearSearch);
        assert_eq!(scheduled[0].0.generation, 1);
        assert_eq!(scheduled[0].1, Duration::from_millis(250));
    }
}
