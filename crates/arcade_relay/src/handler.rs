//! The seam between the relay plumbing and plugin logic.
//!
//! A [`RelayHandler`] is owned by the worker thread and sees every queued
//! event in order. Its hooks may take as long as they like: the queue lock is
//! not held while they run, so entrypoints and `Exit` never wait on them.

use crate::error::RelayError;
use crate::message::{Event, Message};
use crate::relay::RelayHandle;
use tracing::{info, warn};

/// Plugin logic driven by the worker thread.
///
/// Errors returned from [`on_event`](RelayHandler::on_event) and panics from
/// any hook are caught by the worker, logged and counted; the loop carries on.
pub trait RelayHandler: Send + 'static {
    /// Name used in log lines.
    fn name(&self) -> &str {
        "relay"
    }

    /// Called on the worker thread before the first message.
    fn on_start(&mut self, _relay: &RelayHandle) {}

    /// Called once per decoded event, in enqueue order.
    fn on_event(&mut self, event: &Event, relay: &RelayHandle) -> Result<(), RelayError>;

    /// Called for queued text that is not a known event record.
    fn on_unrecognized(&mut self, message: &Message, _relay: &RelayHandle) {
        warn!(
            seq = message.seq(),
            "⚠️ {}: ignoring unrecognized message {:?}",
            self.name(),
            message.text()
        );
    }

    /// Called when a bounded idle wait elapses with nothing queued.
    fn on_idle(&mut self, _relay: &RelayHandle) {}

    /// Called on the worker thread after the queue drained during shutdown.
    fn on_stop(&mut self, _relay: &RelayHandle) {}
}

/// Handler that writes every event to the log and does nothing else.
#[derive(Debug, Default)]
pub struct LoggingHandler;

impl RelayHandler for LoggingHandler {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_start(&mut self, _relay: &RelayHandle) {
        info!("👋 Hello from the relay thread!");
    }

    fn on_event(&mut self, event: &Event, _relay: &RelayHandle) -> Result<(), RelayError> {
        info!("📨 Relay thread got {}", event);
        Ok(())
    }

    fn on_stop(&mut self, _relay: &RelayHandle) {
        info!("👋 Goodbye from the relay thread!");
    }
}
