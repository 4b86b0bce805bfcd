//! Interaction controller: search debouncing, generation and persistence.
//!
//! # Responsibility
//! - Own the note collection and its filtered view.
//! - Turn presentation inputs, timer expiries and generation outcomes into
//!   collection mutations, store saves and presentation events.
//!
//! # Invariants
//! - All state is mutated on one task; background work reaches it only
//!   through `ControllerMessage`s.
//! - Every mutation is saved before the view is refreshed.
//! - Stale timer and generation callbacks are no-ops.

use crate::store::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod interaction;
mod message;
mod runtime;

pub use interaction::{ControllerState, InteractionController};
pub use message::{ControllerEvent, ControllerMessage, Mailbox, UserInput, ViewEntry};
pub use runtime::{run, ControllerHandle};

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Failure of one controller action.
#[derive(Debug)]
pub enum ControllerError {
    /// Save or load did not take effect; memory keeps the new state.
    Storage(StorageError),
    /// Presentation referenced a position outside the collection.
    NoteIndexOutOfRange { index: usize, len: usize },
    /// Rename with a blank title.
    EmptyTitle,
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "changes were not saved: {err}"),
            Self::NoteIndexOutOfRange { index, len } => {
                write!(f, "note index {index} out of range for {len} notes")
            }
            Self::EmptyTitle => write!(f, "note title cannot be empty"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::NoteIndexOutOfRange { .. } | Self::EmptyTitle => None,
        }
    }
}

impl From<StorageError> for ControllerError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}
