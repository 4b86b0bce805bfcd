//! Core logic for SobNotes.
//! This crate owns the note collection, search, debouncing and AI-assisted
//! note generation; presentations only exchange messages with it.

pub mod config;
pub mod controller;
pub mod debounce;
pub mod generation;
pub mod logging;
pub mod model;
pub mod search;
pub mod store;

pub use config::{AppConfig, ConfigError, ControllerSettings};
pub use controller::{
    ControllerError, ControllerEvent, ControllerHandle, ControllerMessage, ControllerResult,
    ControllerState, InteractionController, Mailbox, UserInput, ViewEntry,
};
pub use debounce::{DebounceExpiry, DebounceKind, Debouncer, ExpiryScheduler};
pub use generation::{
    GenerationError, GenerationHandle, GenerationOutcome, GenerationResult, GenerationStatus,
    GenerationTask, GenerationToken, GigaChatClient, GigaChatSettings, NoteGenerator, OutcomeSink,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{parse_tags, Note};
pub use search::filter::{filter, matching_indices, tokenize};
pub use store::{JsonNoteStore, NoteStore, StorageError, StorageResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
