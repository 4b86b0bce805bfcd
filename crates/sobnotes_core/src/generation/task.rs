//! Single-flight generation task.
//!
//! # Responsibility
//! - Allocate a fresh token per submit and spawn the remote call.
//! - Decide whether a delivered outcome is current or stale.
//!
//! # Invariants
//! - At most one handle is pending; a submit supersedes the previous one.
//! - Cancelling invalidates the token only; the request may still finish,
//!   and its outcome is then rejected by `resolve`.

use super::{GenerationError, NoteGenerator};
use crate::model::note::Note;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic identifier of one submit.
pub type GenerationToken = u64;

/// Lifecycle of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Pending,
    Succeeded(Note),
    Failed(GenerationError),
}

/// Controller-side record of the latest submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationHandle {
    pub query: String,
    pub token: GenerationToken,
    pub status: GenerationStatus,
}

impl GenerationHandle {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, GenerationStatus::Pending)
    }
}

/// Result of one background request, tagged with its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub token: GenerationToken,
    pub query: String,
    pub result: Result<Note, GenerationError>,
}

/// Receives outcomes from background requests.
///
/// Called from a worker task; implementations forward to the owner's loop.
pub trait OutcomeSink: Send + Sync + 'static {
    fn deliver(&self, outcome: GenerationOutcome);
}

/// Owner of the single in-flight generation request.
pub struct GenerationTask {
    generator: Arc<dyn NoteGenerator>,
    sink: Arc<dyn OutcomeSink>,
    last_token: GenerationToken,
    current: Option<GenerationHandle>,
}

impl GenerationTask {
    pub fn new(generator: Arc<dyn NoteGenerator>, sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            generator,
            sink,
            last_token: 0,
            current: None,
        }
    }

    /// Starts a request for `query`, superseding any earlier one.
    ///
    /// The token is allocated before this returns; the network call runs
    /// on the ambient tokio runtime. Without a runtime the outcome is
    /// delivered immediately as a transport failure.
    pub fn submit(&mut self, query: impl Into<String>) -> GenerationHandle {
        let query = query.into();
        self.last_token += 1;
        let token = self.last_token;
        let handle = GenerationHandle {
            query: query.clone(),
            token,
            status: GenerationStatus::Pending,
        };
        self.current = Some(handle.clone());

        info!(
            "event=generation_submit module=generation status=start token={} query_len={}",
            token,
            query.chars().count()
        );

        let generator = Arc::clone(&self.generator);
        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let started_at = Instant::now();
                    let result = generator.generate(&query).await;
                    debug!(
                        "event=generation_finished module=generation status={} token={} duration_ms={}",
                        if result.is_ok() { "ok" } else { "error" },
                        token,
                        started_at.elapsed().as_millis()
                    );
                    sink.deliver(GenerationOutcome {
                        token,
                        query,
                        result,
                    });
                });
            }
            Err(err) => sink.deliver(GenerationOutcome {
                token,
                query,
                result: Err(GenerationError::Transport(format!(
                    "no async runtime available: {err}"
                ))),
            }),
        }

        handle
    }

    /// Invalidates the pending request, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            info!(
                "event=generation_cancel module=generation status=ok token={}",
                handle.token
            );
        }
    }

    /// Returns whether `token` belongs to the pending request.
    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| handle.token == token && handle.is_pending())
    }

    pub fn is_pending(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(GenerationHandle::is_pending)
    }

    /// Latest handle, resolved or not. `None` after `cancel`.
    pub fn current(&self) -> Option<&GenerationHandle> {
        self.current.as_ref()
    }

    /// Records a delivered outcome.
    ///
    /// Returns the result to apply, or `None` when the outcome is stale.
    pub fn resolve(&mut self, outcome: GenerationOutcome) -> Option<Result<Note, GenerationError>> {
        if !self.is_current(outcome.token) {
            info!(
                "event=generation_resolve module=generation status=stale token={} current={}",
                outcome.token,
                self.current
                    .as_ref()
                    .map(|handle| handle.token.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            return None;
        }

        let handle = self.current.as_mut()?;
        handle.status = match &outcome.result {
            Ok(note) => GenerationStatus::Succeeded(note.clone()),
            Err(err) => GenerationStatus::Failed(err.clone()),
        };
        Some(outcome.result)
    }
}
