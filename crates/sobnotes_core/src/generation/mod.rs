//! Remote note generation.
//!
//! # Responsibility
//! - Define the remote generation contract (`NoteGenerator`).
//! - Run one cancellable background request per user submit.
//! - Report failures as typed values, never as panics across tasks.
//!
//! # Invariants
//! - Background work never touches the note collection; it only delivers
//!   a `GenerationOutcome`.
//! - Only the outcome carrying the current token may be applied.

use crate::model::note::Note;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gigachat;
mod task;

pub use gigachat::{GigaChatClient, GigaChatSettings};
pub use task::{
    GenerationHandle, GenerationOutcome, GenerationStatus, GenerationTask, GenerationToken,
    OutcomeSink,
};

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failure of one generation request.
///
/// Carries rendered messages so outcomes can be cloned into events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Missing or rejected credentials. Not retryable.
    Config(String),
    /// Network, TLS, timeout or non-success HTTP status.
    Transport(String),
    /// Malformed or empty generated content.
    Response(String),
}

impl GenerationError {
    /// Returns whether resubmitting cannot succeed without new configuration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Stable machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "generation_config",
            Self::Transport(_) => "generation_transport",
            Self::Response(_) => "generation_response",
        }
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "generation is not configured: {message}"),
            Self::Transport(message) => write!(f, "generation request failed: {message}"),
            Self::Response(message) => write!(f, "generation returned unusable content: {message}"),
        }
    }
}

impl Error for GenerationError {}

/// Remote service that drafts a note for a free-text query.
#[async_trait]
pub trait NoteGenerator: Send + Sync {
    /// Produces `Note { title: query, body: generated text, tags: [] }`.
    async fn generate(&self, query: &str) -> GenerationResult<Note>;
}
