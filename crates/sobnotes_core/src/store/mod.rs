//! Durable note storage.
//!
//! # Responsibility
//! - Define the load/save contract the controller persists through.
//! - Keep file-format details out of the controller.
//!
//! # Invariants
//! - `save` is all-or-nothing: a later `load` sees either the previous
//!   collection or the new one, never a partial write.
//! - `load` on a fresh location creates an empty store.

use crate::model::note::Note;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod json_store;

pub use json_store::JsonNoteStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer error for note load/save.
#[derive(Debug)]
pub enum StorageError {
    /// File-system failure on `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The in-memory collection could not be encoded.
    Serialize(serde_json::Error),
    /// The persisted file exists but does not decode as a note list.
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "note store I/O failed at `{}`: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to encode notes: {err}"),
            Self::Deserialize { path, source } => {
                write!(f, "invalid note store `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Deserialize { source, .. } => Some(source),
        }
    }
}

/// Persistence contract for the note collection.
pub trait NoteStore {
    /// Loads the full collection, creating an empty store if none exists.
    fn load(&self) -> StorageResult<Vec<Note>>;
    /// Replaces the persisted collection with `notes`.
    fn save(&self, notes: &[Note]) -> StorageResult<()>;
}

impl<S: NoteStore + ?Sized> NoteStore for Box<S> {
    fn load(&self) -> StorageResult<Vec<Note>> {
        (**self).load()
    }

    fn save(&self, notes: &[Note]) -> StorageResult<()> {
        (**self).save(notes)
    }
}
