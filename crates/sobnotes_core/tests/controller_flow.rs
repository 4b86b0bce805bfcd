use async_trait::async_trait;
use sobnotes_core::{
    ControllerError, ControllerEvent, ControllerMessage, ControllerSettings, ControllerState,
    DebounceKind, GenerationError, GenerationResult, InteractionController, JsonNoteStore, Mailbox,
    Note, NoteGenerator, NoteStore, StorageError, StorageResult, UserInput,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Generator whose per-query results are released by the test.
#[derive(Default)]
struct GatedGenerator {
    gates: Mutex<HashMap<String, oneshot::Receiver<GenerationResult<Note>>>>,
}

impl GatedGenerator {
    fn gate(&self, query: &str) -> oneshot::Sender<GenerationResult<Note>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(query.to_string(), rx);
        tx
    }
}

#[async_trait]
impl NoteGenerator for GatedGenerator {
    async fn generate(&self, query: &str) -> GenerationResult<Note> {
        let gate = self.gates.lock().unwrap().remove(query);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(GenerationError::Transport("gate dropped".to_string()))),
            None => Err(GenerationError::Transport(format!("no gate for {query}"))),
        }
    }
}

/// Generator that always returns the same result and counts calls.
struct FixedGenerator {
    calls: AtomicUsize,
    result: GenerationResult<Note>,
}

impl FixedGenerator {
    fn new(result: GenerationResult<Note>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result,
        }
    }
}

#[async_trait]
impl NoteGenerator for FixedGenerator {
    async fn generate(&self, _query: &str) -> GenerationResult<Note> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Store that loads a fixed collection and refuses every save.
struct ReadOnlyStore {
    notes: Vec<Note>,
}

impl NoteStore for ReadOnlyStore {
    fn load(&self) -> StorageResult<Vec<Note>> {
        Ok(self.notes.clone())
    }

    fn save(&self, _notes: &[Note]) -> StorageResult<()> {
        Err(StorageError::Io {
            path: "read-only".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

struct Harness {
    controller: InteractionController<JsonNoteStore>,
    inbox: mpsc::UnboundedReceiver<ControllerMessage>,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    disk: JsonNoteStore,
    _dir: TempDir,
}

impl Harness {
    fn new(notes: Vec<Note>, generator: Arc<dyn NoteGenerator>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let disk = JsonNoteStore::new(&path);
        disk.save(&notes).unwrap();

        let (mailbox, inbox) = Mailbox::channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let settings = ControllerSettings {
            search_reset: Duration::from_secs(5),
            open_top_match: Duration::from_secs(3),
        };
        let controller = InteractionController::new(
            JsonNoteStore::new(&path),
            generator,
            settings,
            mailbox,
            events_tx,
        )
        .unwrap();

        Self {
            controller,
            inbox,
            events,
            disk,
            _dir: dir,
        }
    }

    fn input(&mut self, input: UserInput) -> Result<(), ControllerError> {
        self.controller.handle_input(input)
    }

    /// Waits for the next inbox message and applies it.
    async fn pump(&mut self) -> &'static str {
        let message = self.inbox.recv().await.unwrap();
        let label = message.label();
        self.controller.handle_message(message).unwrap();
        label
    }

    fn drain_events(&mut self) -> Vec<ControllerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    fn persisted(&self) -> Vec<Note> {
        self.disk.load().unwrap()
    }
}

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.title.as_str()).collect()
}

fn count<F: Fn(&ControllerEvent) -> bool>(events: &[ControllerEvent], pred: F) -> usize {
    events.iter().filter(|event| pred(event)).count()
}

/// Paused-clock timers fire at their deadline, up to timer-wheel rounding.
fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn seed() -> Vec<Note> {
    vec![
        Note::new("Go", "body1"),
        Note::new("Rust", "ownership"),
        Note::with_tags("Golang tips", "", ["go"]),
    ]
}

#[tokio::test(start_paused = true)]
async fn rearm_runs_each_action_once_timed_from_second_input() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));
    let started = Instant::now();

    h.input(UserInput::InputChanged("go".to_string())).unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    h.input(UserInput::InputChanged("go tips".to_string())).unwrap();
    h.drain_events();

    let mut opened_at = None;
    let mut cleared_at = None;
    for _ in 0..4 {
        h.pump().await;
        for event in h.drain_events() {
            match event {
                ControllerEvent::NoteOpened { .. } => {
                    assert!(opened_at.is_none(), "top match opened twice");
                    opened_at = Some(started.elapsed());
                }
                ControllerEvent::SearchCleared => {
                    assert!(cleared_at.is_none(), "search cleared twice");
                    cleared_at = Some(started.elapsed());
                }
                _ => {}
            }
        }
    }

    assert_near(opened_at.unwrap(), Duration::from_secs(5));
    assert_near(cleared_at.unwrap(), Duration::from_secs(7));
    assert_eq!(h.controller.selected(), Some(0));
    assert_eq!(h.controller.state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn search_reset_keeps_filtered_view_and_does_not_rearm() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));

    h.input(UserInput::InputChanged("rust".to_string())).unwrap();
    assert_eq!(h.controller.view_indices(), &[1]);
    assert_eq!(h.controller.state(), ControllerState::Searching);
    h.drain_events();

    // open-top-match at 3s, search reset at 5s
    h.pump().await;
    h.pump().await;

    let events = h.drain_events();
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::SearchCleared)), 1);
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::ViewFiltered(_))), 0);
    assert_eq!(h.controller.search_text(), "");
    assert_eq!(h.controller.view_indices(), &[1]);
    assert_eq!(h.controller.state(), ControllerState::Idle);

    // The presentation echoing its cleared field must not re-enter the search path.
    let clear_generation = h.controller.debouncer(DebounceKind::ClearSearch).generation();
    h.input(UserInput::InputChanged(String::new())).unwrap();
    assert!(h.drain_events().is_empty());
    assert_eq!(
        h.controller.debouncer(DebounceKind::ClearSearch).generation(),
        clear_generation
    );
    assert!(!h.controller.debouncer(DebounceKind::ClearSearch).is_pending());
}

#[tokio::test(start_paused = true)]
async fn emptied_input_arms_reset_but_not_open() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));

    h.input(UserInput::InputChanged("go".to_string())).unwrap();
    h.input(UserInput::InputChanged("   ".to_string())).unwrap();

    assert!(h.controller.debouncer(DebounceKind::ClearSearch).is_pending());
    assert!(!h.controller.debouncer(DebounceKind::OpenTopMatch).is_pending());
    assert_eq!(h.controller.view_indices(), &[0, 1, 2]);

    h.drain_events();
    for _ in 0..3 {
        h.pump().await;
    }
    let events = h.drain_events();
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::NoteOpened { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::SearchCleared)), 1);
}

#[tokio::test]
async fn newer_submit_discards_older_result() {
    let generator = Arc::new(GatedGenerator::default());
    let docker_gate = generator.gate("docker");
    let kubernetes_gate = generator.gate("kubernetes");
    let mut h = Harness::new(vec![Note::new("Go", "body1")], generator);

    h.input(UserInput::Submit("docker".to_string())).unwrap();
    h.input(UserInput::Submit("kubernetes".to_string())).unwrap();
    assert_eq!(h.controller.state(), ControllerState::Generating);
    h.drain_events();

    docker_gate
        .send(Ok(Note::new("docker", "containers")))
        .unwrap();
    assert_eq!(h.pump().await, "generation_finished");
    assert_eq!(titles(h.controller.notes()), vec!["Go"]);
    assert_eq!(h.controller.state(), ControllerState::Generating);
    assert!(h.drain_events().is_empty());

    kubernetes_gate
        .send(Ok(Note::new("kubernetes", "orchestration")))
        .unwrap();
    h.pump().await;

    assert_eq!(titles(h.controller.notes()), vec!["Go", "kubernetes"]);
    assert_eq!(titles(&h.persisted()), vec!["Go", "kubernetes"]);
    assert_eq!(h.controller.state(), ControllerState::Idle);
    assert_eq!(h.controller.selected(), Some(1));

    let events = h.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        ControllerEvent::NoteOpened { index: 1, note } if note.body == "orchestration"
    )));
}

#[tokio::test]
async fn stale_failure_is_ignored_too() {
    let generator = Arc::new(GatedGenerator::default());
    let first = generator.gate("first");
    let second = generator.gate("second");
    let mut h = Harness::new(Vec::new(), generator);

    h.input(UserInput::Submit("first".to_string())).unwrap();
    h.input(UserInput::Submit("second".to_string())).unwrap();
    h.drain_events();

    first
        .send(Err(GenerationError::Transport("timeout".to_string())))
        .unwrap();
    h.pump().await;
    assert!(h.drain_events().is_empty());

    second.send(Ok(Note::new("second", "text"))).unwrap();
    h.pump().await;
    assert_eq!(titles(h.controller.notes()), vec!["second"]);
}

#[tokio::test(start_paused = true)]
async fn submit_cancels_debouncers_and_success_clears_search() {
    let generator = Arc::new(GatedGenerator::default());
    let gate = generator.gate("rust async");
    let mut h = Harness::new(seed(), generator);

    h.input(UserInput::InputChanged("rust async".to_string())).unwrap();
    h.input(UserInput::Submit("  rust async  ".to_string())).unwrap();
    assert!(!h.controller.debouncer(DebounceKind::ClearSearch).is_pending());
    assert!(!h.controller.debouncer(DebounceKind::OpenTopMatch).is_pending());

    let events = h.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        ControllerEvent::GenerationStarted { query, .. } if query == "rust async"
    )));

    gate.send(Ok(Note::new("rust async", "futures"))).unwrap();
    // Superseded timers fire as no-ops before or after the result.
    loop {
        if h.pump().await == "generation_finished" {
            break;
        }
    }

    let events = h.drain_events();
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::SearchCleared)), 1);
    assert!(events.iter().any(|event| matches!(
        event,
        ControllerEvent::ViewFiltered(entries) if entries.len() == 4
    )));
    assert_eq!(h.controller.search_text(), "");
    assert_eq!(h.controller.state(), ControllerState::Idle);
}

#[tokio::test]
async fn blank_submit_is_ignored() {
    let generator = Arc::new(FixedGenerator::new(Ok(Note::new("x", "y"))));
    let mut h = Harness::new(Vec::new(), generator.clone());

    h.input(UserInput::Submit("   ".to_string())).unwrap();
    assert!(h.drain_events().is_empty());
    assert!(h.controller.generation_handle().is_none());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recoverable_failure_surfaces_without_mutation() {
    let generator = Arc::new(FixedGenerator::new(Err(GenerationError::Response(
        "generated content is empty".to_string(),
    ))));
    let mut h = Harness::new(seed(), generator.clone());

    h.input(UserInput::Submit("go".to_string())).unwrap();
    h.pump().await;
    let events = h.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        ControllerEvent::GenerationFailed(GenerationError::Response(_))
    )));
    assert_eq!(h.controller.notes().len(), 3);
    assert_eq!(h.persisted().len(), 3);

    // Recoverable: the user may resubmit.
    h.input(UserInput::Submit("go".to_string())).unwrap();
    h.pump().await;
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn config_failure_blocks_later_submits() {
    let generator = Arc::new(FixedGenerator::new(Err(GenerationError::Config(
        "GIGACHAT_CREDENTIALS is not set".to_string(),
    ))));
    let mut h = Harness::new(Vec::new(), generator.clone());

    h.input(UserInput::Submit("docker".to_string())).unwrap();
    h.pump().await;
    h.drain_events();

    h.input(UserInput::Submit("docker".to_string())).unwrap();
    let events = h.drain_events();
    assert!(matches!(
        events.as_slice(),
        [ControllerEvent::GenerationFailed(GenerationError::Config(_))]
    ));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.state(), ControllerState::Idle);
}

#[tokio::test]
async fn every_mutation_is_persisted() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));

    h.input(UserInput::CreateNote).unwrap();
    assert_eq!(titles(&h.persisted()), vec!["Go", "Rust", "Golang tips", "New note"]);
    assert_eq!(h.controller.selected(), Some(3));

    h.input(UserInput::RenameNote(3, "  Docker  ".to_string()))
        .unwrap();
    assert_eq!(titles(&h.persisted())[3], "Docker");

    h.input(UserInput::CopyNote(1)).unwrap();
    assert_eq!(titles(&h.persisted())[4], "Rust (copy)");

    h.input(UserInput::EditNote(
        0,
        Note::with_tags("Go", "goroutines", ["lang"]),
    ))
    .unwrap();
    assert_eq!(h.persisted()[0].tags, vec!["lang"]);

    h.input(UserInput::DeleteNote(2)).unwrap();
    assert_eq!(
        titles(&h.persisted()),
        vec!["Go", "Rust", "Docker", "Rust (copy)"]
    );
    assert_eq!(h.persisted(), h.controller.notes());
}

#[tokio::test]
async fn delete_updates_selection_by_index() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));

    h.input(UserInput::SelectNote(2)).unwrap();
    h.input(UserInput::DeleteNote(0)).unwrap();
    assert_eq!(h.controller.selected(), Some(1));
    assert_eq!(h.controller.notes()[1].title, "Golang tips");
    h.drain_events();

    h.input(UserInput::DeleteNote(1)).unwrap();
    assert_eq!(h.controller.selected(), None);
    let events = h.drain_events();
    assert_eq!(count(&events, |e| matches!(e, ControllerEvent::NoteClosed)), 1);
}

#[tokio::test]
async fn mutations_refilter_with_current_search_text() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));
    h.input(UserInput::InputChanged("rust".to_string())).unwrap();
    h.drain_events();

    h.input(UserInput::CopyNote(1)).unwrap();
    assert_eq!(h.controller.view_indices(), &[1, 3]);

    let events = h.drain_events();
    let collection_pos = events
        .iter()
        .position(|e| matches!(e, ControllerEvent::CollectionChanged(_)))
        .unwrap();
    let view_pos = events
        .iter()
        .position(|e| matches!(e, ControllerEvent::ViewFiltered(_)))
        .unwrap();
    assert!(collection_pos < view_pos);
}

#[tokio::test]
async fn invalid_inputs_are_rejected_without_side_effects() {
    let mut h = Harness::new(seed(), Arc::new(GatedGenerator::default()));

    let err = h.input(UserInput::DeleteNote(9)).unwrap_err();
    assert!(matches!(
        err,
        ControllerError::NoteIndexOutOfRange { index: 9, len: 3 }
    ));
    let err = h
        .input(UserInput::RenameNote(0, "   ".to_string()))
        .unwrap_err();
    assert!(matches!(err, ControllerError::EmptyTitle));

    assert!(h.drain_events().is_empty());
    assert_eq!(h.persisted(), seed());
}

#[tokio::test]
async fn failed_save_keeps_memory_and_reports_storage_error() {
    let (mailbox, _inbox) = Mailbox::channel();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut controller = InteractionController::new(
        ReadOnlyStore { notes: seed() },
        Arc::new(GatedGenerator::default()),
        ControllerSettings::default(),
        mailbox,
        events_tx,
    )
    .unwrap();

    let err = controller.handle_input(UserInput::CreateNote).unwrap_err();
    assert!(matches!(err, ControllerError::Storage(_)));
    assert_eq!(controller.notes().len(), 4);

    let first = events.try_recv().unwrap();
    assert!(matches!(first, ControllerEvent::CollectionChanged(notes) if notes.len() == 4));
}
