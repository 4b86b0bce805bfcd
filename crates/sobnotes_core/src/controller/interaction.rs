//! Controller state machine.

use super::message::{ControllerEvent, ControllerMessage, Mailbox, UserInput, ViewEntry};
use super::{ControllerError, ControllerResult};
use crate::config::ControllerSettings;
use crate::debounce::{DebounceExpiry, DebounceKind, Debouncer};
use crate::generation::{
    GenerationError, GenerationHandle, GenerationOutcome, GenerationTask, NoteGenerator,
};
use crate::model::note::{normalize_title, Note};
use crate::search::filter::matching_indices;
use crate::store::NoteStore;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Coarse controller state, derived from debouncer and task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// At least one search debouncer is armed.
    Searching,
    /// A generation request is outstanding.
    Generating,
}

/// Single owner of the note collection and everything racing against it.
pub struct InteractionController<S: NoteStore> {
    store: S,
    notes: Vec<Note>,
    view: Vec<usize>,
    selected: Option<usize>,
    search_text: String,
    clear_search: Debouncer,
    open_match: Debouncer,
    generation: GenerationTask,
    /// Fatal generation error; later submits fail with it immediately.
    generation_blocked: Option<GenerationError>,
    mailbox: Mailbox,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl<S: NoteStore> InteractionController<S> {
    /// Loads the collection and wires timers and generation to `mailbox`.
    ///
    /// # Errors
    /// - Returns `ControllerError::Storage` when the initial load fails.
    pub fn new(
        store: S,
        generator: Arc<dyn NoteGenerator>,
        settings: ControllerSettings,
        mailbox: Mailbox,
        events: mpsc::UnboundedSender<ControllerEvent>,
    ) -> ControllerResult<Self> {
        let notes = store.load()?;
        let view = (0..notes.len()).collect();
        let sink = Arc::new(mailbox.clone());
        Ok(Self {
            store,
            notes,
            view,
            selected: None,
            search_text: String::new(),
            clear_search: Debouncer::new(DebounceKind::ClearSearch, settings.search_reset),
            open_match: Debouncer::new(DebounceKind::OpenTopMatch, settings.open_top_match),
            generation: GenerationTask::new(generator, sink),
            generation_blocked: None,
            mailbox,
            events,
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Collection positions currently shown in the list.
    pub fn view_indices(&self) -> &[usize] {
        &self.view
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn generation_handle(&self) -> Option<&GenerationHandle> {
        self.generation.current()
    }

    pub fn debouncer(&self, kind: DebounceKind) -> &Debouncer {
        match kind {
            DebounceKind::ClearSearch => &self.clear_search,
            DebounceKind::OpenTopMatch => &self.open_match,
        }
    }

    pub fn state(&self) -> ControllerState {
        if self.generation.is_pending() {
            ControllerState::Generating
        } else if self.clear_search.is_pending() || self.open_match.is_pending() {
            ControllerState::Searching
        } else {
            ControllerState::Idle
        }
    }

    /// Emits the full collection and current view, e.g. on startup.
    pub fn publish_snapshot(&self) {
        self.emit(ControllerEvent::CollectionChanged(self.notes.clone()));
        self.emit_view();
    }

    /// Reports a failed action to the presentation.
    pub fn report_failure(&self, err: ControllerError) {
        self.emit(ControllerEvent::ActionFailed(err));
    }

    /// Applies one inbox message.
    pub fn handle_message(&mut self, message: ControllerMessage) -> ControllerResult<()> {
        match message {
            ControllerMessage::Input(input) => self.handle_input(input),
            ControllerMessage::DebounceFired(expiry) => {
                self.on_debounce(expiry);
                Ok(())
            }
            ControllerMessage::GenerationFinished(outcome) => self.on_generation_finished(outcome),
            ControllerMessage::Shutdown => Ok(()),
        }
    }

    pub fn handle_input(&mut self, input: UserInput) -> ControllerResult<()> {
        match input {
            UserInput::InputChanged(text) => {
                self.input_changed(text);
                Ok(())
            }
            UserInput::Submit(query) => {
                self.submit(&query);
                Ok(())
            }
            UserInput::SelectNote(index) => {
                self.check_index(index)?;
                self.open_note(index);
                Ok(())
            }
            UserInput::CreateNote => self.create_note(),
            UserInput::DeleteNote(index) => self.delete_note(index),
            UserInput::RenameNote(index, title) => self.rename_note(index, &title),
            UserInput::CopyNote(index) => self.copy_note(index),
            UserInput::EditNote(index, note) => self.edit_note(index, note),
        }
    }

    fn input_changed(&mut self, text: String) {
        // Echo of a controller-side write (e.g. after `SearchCleared`).
        if text == self.search_text {
            debug!("event=input_changed module=controller status=ignored reason=unchanged");
            return;
        }

        self.search_text = text;
        self.refresh_view();
        self.emit_view();

        self.clear_search.arm(&self.mailbox);
        if self.search_text.trim().is_empty() {
            self.open_match.cancel();
        } else {
            self.open_match.arm(&self.mailbox);
        }
    }

    fn on_debounce(&mut self, expiry: DebounceExpiry) {
        match expiry.kind {
            DebounceKind::ClearSearch => {
                if self.clear_search.on_expiry(expiry.generation) {
                    // Not routed through `input_changed`: the list keeps its
                    // filtered content and nothing is re-armed.
                    self.search_text.clear();
                    self.emit(ControllerEvent::SearchCleared);
                    debug!("event=search_reset module=controller status=ok");
                }
            }
            DebounceKind::OpenTopMatch => {
                if self.open_match.on_expiry(expiry.generation) {
                    if let Some(&index) = self.view.first() {
                        self.open_note(index);
                    }
                }
            }
        }
    }

    fn submit(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            debug!("event=submit module=controller status=ignored reason=blank_query");
            return;
        }

        self.clear_search.cancel();
        self.open_match.cancel();

        if let Some(err) = &self.generation_blocked {
            info!(
                "event=submit module=controller status=rejected error_code={}",
                err.code()
            );
            self.emit(ControllerEvent::GenerationFailed(err.clone()));
            return;
        }

        let handle = self.generation.submit(query);
        self.emit(ControllerEvent::GenerationStarted {
            query: handle.query,
            token: handle.token,
        });
    }

    fn on_generation_finished(&mut self, outcome: GenerationOutcome) -> ControllerResult<()> {
        let Some(result) = self.generation.resolve(outcome) else {
            return Ok(());
        };

        match result {
            Ok(note) => {
                self.notes.push(note);
                let index = self.notes.len() - 1;
                let saved = self.persist();

                self.clear_search.cancel();
                self.open_match.cancel();
                if !self.search_text.is_empty() {
                    self.search_text.clear();
                    self.emit(ControllerEvent::SearchCleared);
                }
                self.publish_changes();
                self.open_note(index);
                saved
            }
            Err(err) => {
                warn!(
                    "event=generation_apply module=controller status=error error_code={} error={}",
                    err.code(),
                    err
                );
                if err.is_fatal() {
                    self.generation_blocked = Some(err.clone());
                }
                self.emit(ControllerEvent::GenerationFailed(err));
                Ok(())
            }
        }
    }

    fn create_note(&mut self) -> ControllerResult<()> {
        self.notes.push(Note::blank());
        let index = self.notes.len() - 1;
        let saved = self.commit();
        self.open_note(index);
        saved
    }

    fn delete_note(&mut self, index: usize) -> ControllerResult<()> {
        self.check_index(index)?;
        self.notes.remove(index);
        match self.selected {
            Some(selected) if selected == index => {
                self.selected = None;
                self.emit(ControllerEvent::NoteClosed);
            }
            Some(selected) if selected > index => self.selected = Some(selected - 1),
            _ => {}
        }
        self.commit()
    }

    fn rename_note(&mut self, index: usize, title: &str) -> ControllerResult<()> {
        self.check_index(index)?;
        let title = normalize_title(title).ok_or(ControllerError::EmptyTitle)?;
        self.notes[index].title = title;
        self.commit()
    }

    fn copy_note(&mut self, index: usize) -> ControllerResult<()> {
        self.check_index(index)?;
        let copy = Note::copy_of(&self.notes[index]);
        self.notes.push(copy);
        self.commit()
    }

    fn edit_note(&mut self, index: usize, note: Note) -> ControllerResult<()> {
        self.check_index(index)?;
        self.notes[index] = note;
        self.commit()
    }

    /// Saves, then refreshes and publishes; returns the save result.
    fn commit(&mut self) -> ControllerResult<()> {
        let saved = self.persist();
        self.publish_changes();
        saved
    }

    fn persist(&self) -> ControllerResult<()> {
        self.store.save(&self.notes).map_err(|err| {
            warn!(
                "event=persist module=controller status=error count={} error={}",
                self.notes.len(),
                err
            );
            ControllerError::Storage(err)
        })
    }

    fn publish_changes(&mut self) {
        self.refresh_view();
        self.emit(ControllerEvent::CollectionChanged(self.notes.clone()));
        self.emit_view();
    }

    fn refresh_view(&mut self) {
        self.view = matching_indices(&self.notes, &self.search_text);
    }

    fn open_note(&mut self, index: usize) {
        self.selected = Some(index);
        self.emit(ControllerEvent::NoteOpened {
            index,
            note: self.notes[index].clone(),
        });
    }

    fn check_index(&self, index: usize) -> ControllerResult<()> {
        if index < self.notes.len() {
            Ok(())
        } else {
            Err(ControllerError::NoteIndexOutOfRange {
                index,
                len: self.notes.len(),
            })
        }
    }

    fn emit_view(&self) {
        let entries = self
            .view
            .iter()
            .map(|&index| ViewEntry {
                index,
                note: self.notes[index].clone(),
            })
            .collect();
        self.emit(ControllerEvent::ViewFiltered(entries));
    }

    fn emit(&self, event: ControllerEvent) {
        if self.events.send(event).is_err() {
            debug!("event=emit module=controller status=dropped reason=presentation_closed");
        }
    }
}
