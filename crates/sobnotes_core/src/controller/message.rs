//! Controller inbox/outbox types.

use super::ControllerError;
use crate::debounce::{DebounceExpiry, ExpiryScheduler};
use crate::generation::{GenerationError, GenerationOutcome, GenerationToken, OutcomeSink};
use crate::model::note::Note;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;

/// Inputs produced by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Search field text changed by the user.
    InputChanged(String),
    /// Explicit "generate a note for this query".
    Submit(String),
    SelectNote(usize),
    CreateNote,
    DeleteNote(usize),
    RenameNote(usize, String),
    CopyNote(usize),
    /// Editor saved the full content of the note at this position.
    EditNote(usize, Note),
}

/// One row of the filtered list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    /// Position in the collection; the only stable reference to the note.
    pub index: usize,
    pub note: Note,
}

/// Events consumed by the presentation layer.
#[derive(Debug)]
pub enum ControllerEvent {
    CollectionChanged(Vec<Note>),
    ViewFiltered(Vec<ViewEntry>),
    NoteOpened { index: usize, note: Note },
    /// The open note was deleted; the editor should be emptied.
    NoteClosed,
    /// The search field must be cleared without reporting an input change.
    SearchCleared,
    GenerationStarted {
        query: String,
        token: GenerationToken,
    },
    GenerationFailed(GenerationError),
    ActionFailed(ControllerError),
}

/// Everything the controller loop reacts to.
#[derive(Debug)]
pub enum ControllerMessage {
    Input(UserInput),
    DebounceFired(DebounceExpiry),
    GenerationFinished(GenerationOutcome),
    Shutdown,
}

impl ControllerMessage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input(UserInput::InputChanged(_)) => "input_changed",
            Self::Input(UserInput::Submit(_)) => "submit",
            Self::Input(UserInput::SelectNote(_)) => "select_note",
            Self::Input(UserInput::CreateNote) => "create_note",
            Self::Input(UserInput::DeleteNote(_)) => "delete_note",
            Self::Input(UserInput::RenameNote(..)) => "rename_note",
            Self::Input(UserInput::CopyNote(_)) => "copy_note",
            Self::Input(UserInput::EditNote(..)) => "edit_note",
            Self::DebounceFired(_) => "debounce_fired",
            Self::GenerationFinished(_) => "generation_finished",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Sending half of the controller inbox.
///
/// Timers and generation workers post into the same queue as user input,
/// so the controller sees one serialized stream.
#[derive(Debug, Clone)]
pub struct Mailbox {
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

impl Mailbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Posts a message. Returns `false` once the loop has stopped.
    pub fn post(&self, message: ControllerMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

impl ExpiryScheduler for Mailbox {
    fn schedule(&self, expiry: DebounceExpiry, delay: Duration) {
        let tx = self.tx.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                // Deadline is fixed at arm time, not at first poll.
                let Some(deadline) = tokio::time::Instant::now().checked_add(delay) else {
                    warn!(
                        "event=debounce_schedule module=controller status=error kind={} error=deadline_overflow delay_secs={}",
                        expiry.kind,
                        delay.as_secs()
                    );
                    return;
                };
                runtime.spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    // The loop may be gone at shutdown.
                    let _ = tx.send(ControllerMessage::DebounceFired(expiry));
                });
            }
            Err(err) => warn!(
                "event=debounce_schedule module=controller status=error kind={} error={}",
                expiry.kind, err
            ),
        }
    }
}

impl OutcomeSink for Mailbox {
    fn deliver(&self, outcome: GenerationOutcome) {
        let token = outcome.token;
        if !self.post(ControllerMessage::GenerationFinished(outcome)) {
            debug!(
                "event=generation_deliver module=controller status=dropped token={} reason=loop_closed",
                token
            );
        }
    }
}
