//! Restartable single-shot timers.
//!
//! # Responsibility
//! - Delay an action until input has been quiet for an interval.
//! - Detect superseded timer callbacks without real timer cancellation.
//!
//! # Invariants
//! - Every `arm`/`cancel` bumps the generation; only a callback carrying
//!   the current generation may run its action.

mod debouncer;

pub use debouncer::{DebounceExpiry, DebounceKind, Debouncer, ExpiryScheduler};
