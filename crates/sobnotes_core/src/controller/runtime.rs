//! Controller event loop and spawn helper.
//!
//! # Responsibility
//! - Drain the controller inbox on one task until shutdown.
//! - Convert failed actions into `ActionFailed` events.
//!
//! # Invariants
//! - The controller is never shared; only its `Mailbox` leaves the loop.

use super::interaction::InteractionController;
use super::message::{ControllerEvent, ControllerMessage, Mailbox, UserInput};
use super::ControllerResult;
use crate::config::ControllerSettings;
use crate::generation::NoteGenerator;
use crate::store::NoteStore;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Runs `controller` against `inbox` until `Shutdown` or channel close.
pub async fn run<S: NoteStore>(
    mut controller: InteractionController<S>,
    mut inbox: mpsc::UnboundedReceiver<ControllerMessage>,
) {
    let started_at = Instant::now();
    info!(
        "event=controller_loop module=controller status=start notes={}",
        controller.notes().len()
    );
    controller.publish_snapshot();

    let mut handled: u64 = 0;
    while let Some(message) = inbox.recv().await {
        if matches!(message, ControllerMessage::Shutdown) {
            break;
        }
        let label = message.label();
        handled += 1;
        if let Err(err) = controller.handle_message(message) {
            warn!(
                "event=controller_action module=controller status=error action={} error={}",
                label, err
            );
            controller.report_failure(err);
        }
    }

    info!(
        "event=controller_loop module=controller status=stop handled={} duration_ms={}",
        handled,
        started_at.elapsed().as_millis()
    );
}

/// Presentation-side handle to a spawned controller loop.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    mailbox: Mailbox,
}

impl ControllerHandle {
    /// Loads the store, spawns the loop on the current runtime and returns
    /// the input handle, the event stream and the loop's join handle.
    ///
    /// # Errors
    /// - Returns `ControllerError::Storage` when the initial load fails.
    pub fn spawn<S>(
        store: S,
        generator: Arc<dyn NoteGenerator>,
        settings: ControllerSettings,
    ) -> ControllerResult<(
        Self,
        mpsc::UnboundedReceiver<ControllerEvent>,
        JoinHandle<()>,
    )>
    where
        S: NoteStore + Send + 'static,
    {
        let (mailbox, inbox) = Mailbox::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller =
            InteractionController::new(store, generator, settings, mailbox.clone(), events_tx)?;
        let join = tokio::spawn(run(controller, inbox));
        Ok((Self { mailbox }, events_rx, join))
    }

    /// Forwards one presentation input. Returns `false` after shutdown.
    pub fn send(&self, input: UserInput) -> bool {
        self.mailbox.post(ControllerMessage::Input(input))
    }

    /// Asks the loop to stop after the messages already queued.
    pub fn shutdown(&self) -> bool {
        self.mailbox.post(ControllerMessage::Shutdown)
    }
}
