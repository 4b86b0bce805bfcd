//! Terminal front end.
//!
//! # Responsibility
//! - Translate stdin lines into controller inputs.
//! - Render controller events as short status lines.
//! - Keep the last published collection so editor commands can send the
//!   full edited note.
//!
//! # Invariants
//! - No note rules live here; every decision is made by `sobnotes_core`.

use log::warn;
use sobnotes_core::{
    init_logging, parse_tags, AppConfig, ControllerEvent, ControllerHandle, GigaChatClient,
    JsonNoteStore, Note, UserInput,
};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: :new | :open N | :del N | :copy N | :rename N TITLE\n\
                    \x20         :body N TEXT (\\n for line breaks) | :tags N a, b | :gen QUERY | :quit\n\
                    any other line updates the search";

enum Command {
    Input(UserInput),
    Help,
    Quit,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("sobnotes: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let generator = GigaChatClient::new(config.gigachat.clone()).map_err(|err| err.to_string())?;
    let (handle, mut events, join) = ControllerHandle::spawn(
        JsonNoteStore::new(&config.data_file),
        Arc::new(generator),
        config.controller,
    )
    .map_err(|err| err.to_string())?;

    let snapshot: Arc<Mutex<Vec<Note>>> = Arc::default();
    let published = Arc::clone(&snapshot);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let ControllerEvent::CollectionChanged(notes) = &event {
                *published.lock().unwrap_or_else(PoisonError::into_inner) = notes.clone();
            }
            render(&event);
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|err| err.to_string())? {
        let parsed = {
            let notes = snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            parse_command(&line, &notes)
        };
        match parsed {
            Ok(Command::Input(input)) => {
                if !handle.send(input) {
                    warn!("event=cli_send module=cli status=error reason=controller_stopped");
                    break;
                }
            }
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(message) => println!("! {message}"),
        }
    }

    handle.shutdown();
    join.await.map_err(|err| err.to_string())?;
    printer.await.map_err(|err| err.to_string())?;
    Ok(())
}

/// Parses one stdin line. `notes` is the last published collection; editor
/// commands start from the note at that position.
fn parse_command(line: &str, notes: &[Note]) -> Result<Command, String> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Command::Input(UserInput::InputChanged(line.to_string())));
    };

    let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let input = match name {
        "new" => UserInput::CreateNote,
        "open" => UserInput::SelectNote(parse_index(args)?),
        "del" => UserInput::DeleteNote(parse_index(args)?),
        "copy" => UserInput::CopyNote(parse_index(args)?),
        "rename" => {
            let (index, title) = args.trim().split_once(' ').ok_or("usage: :rename N TITLE")?;
            UserInput::RenameNote(parse_index(index)?, title.to_string())
        }
        "body" => {
            let (index, text) = split_index(args).ok_or("usage: :body N TEXT")?;
            let mut note = note_at(notes, index)?;
            note.body = text.replace("\\n", "\n");
            UserInput::EditNote(index, note)
        }
        "tags" => {
            // An index alone clears the tags.
            let (index, raw) = split_index(args)
                .or_else(|| parse_index(args).ok().map(|index| (index, "")))
                .ok_or("usage: :tags N a, b")?;
            let mut note = note_at(notes, index)?;
            note.tags = parse_tags(raw);
            UserInput::EditNote(index, note)
        }
        "gen" if args.trim().is_empty() => return Err("usage: :gen QUERY".to_string()),
        "gen" => UserInput::Submit(args.to_string()),
        "help" => return Ok(Command::Help),
        "quit" | "q" => return Ok(Command::Quit),
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Command::Input(input))
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("expected a note number, got `{}`", raw.trim()))
}

/// Splits `N REST` into a parsed index and the untouched remainder.
fn split_index(args: &str) -> Option<(usize, &str)> {
    let (index, rest) = args.trim_start().split_once(' ')?;
    Some((index.parse().ok()?, rest))
}

fn note_at(notes: &[Note], index: usize) -> Result<Note, String> {
    notes
        .get(index)
        .cloned()
        .ok_or_else(|| format!("no note [{index}]; {} notes loaded", notes.len()))
}

fn render(event: &ControllerEvent) {
    match event {
        ControllerEvent::CollectionChanged(notes) => println!("* {} notes", notes.len()),
        ControllerEvent::ViewFiltered(entries) => {
            for entry in entries {
                if entry.note.tags.is_empty() {
                    println!("  [{}] {}", entry.index, entry.note.title);
                } else {
                    println!(
                        "  [{}] {}  ({})",
                        entry.index,
                        entry.note.title,
                        entry.note.tags.join(", ")
                    );
                }
            }
        }
        ControllerEvent::NoteOpened { index, note } => {
            println!("== [{index}] {} ==\n{}", note.title, note.body);
        }
        ControllerEvent::NoteClosed => println!("(note closed)"),
        ControllerEvent::SearchCleared => println!("(search cleared)"),
        ControllerEvent::GenerationStarted { query, .. } => {
            println!("generating a note for `{query}`...");
        }
        ControllerEvent::GenerationFailed(err) => println!("! {err}"),
        ControllerEvent::ActionFailed(err) => println!("! {err}"),
    }
}
