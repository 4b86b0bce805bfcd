//! Flat JSON file note store.
//!
//! # Responsibility
//! - Persist the note collection as one pretty-printed JSON array.
//! - Replace the file atomically on every save.
//!
//! # Invariants
//! - Saves go through a temp file in the target directory followed by a
//!   rename, so readers never observe a truncated file.
//! - Parent directories are created on demand for both load and save.

use super::{NoteStore, StorageError, StorageResult};
use crate::model::note::Note;
use log::{error, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Note store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonNoteStore {
    path: PathBuf,
}

impl JsonNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn ensure_parent_dir(&self) -> StorageResult<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })
    }

    fn write_atomically(&self, notes: &[Note]) -> StorageResult<()> {
        self.ensure_parent_dir()?;
        let encoded = serde_json::to_vec_pretty(notes).map_err(StorageError::Serialize)?;

        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let mut staged = NamedTempFile::new_in(self.parent_dir()).map_err(io_err)?;
        staged.write_all(&encoded).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged
            .persist(&self.path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }

    fn read_existing(&self) -> StorageResult<Vec<Note>> {
        let raw = fs::read(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| StorageError::Deserialize {
            path: self.path.clone(),
            source,
        })
    }
}

impl NoteStore for JsonNoteStore {
    fn load(&self) -> StorageResult<Vec<Note>> {
        let started_at = Instant::now();
        let result = if self.path.exists() {
            self.read_existing()
        } else {
            info!("event=store_init module=store status=ok reason=missing_file");
            self.write_atomically(&[]).map(|()| Vec::new())
        };

        match &result {
            Ok(notes) => info!(
                "event=store_load module=store status=ok count={} duration_ms={}",
                notes.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_load module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn save(&self, notes: &[Note]) -> StorageResult<()> {
        let started_at = Instant::now();
        let result = self.write_atomically(notes);
        match &result {
            Ok(()) => info!(
                "event=store_save module=store status=ok count={} duration_ms={}",
                notes.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_save module=store status=error count={} duration_ms={} error={}",
                notes.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}
