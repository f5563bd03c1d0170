//! The relay instance: queue, lifecycle, status flags and callback slots
//! behind one owned object.
//!
//! Every mutation happens under the core lock, and the condition variable
//! paired with that lock is the only thing the worker ever sleeps on.
//! Producers push, notify and return; they never wait on the worker.

use crate::config::WorkerSettings;
use crate::error::RelayError;
use crate::handler::RelayHandler;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::message::{Event, GameVersion, Message, StatusKind};
use crate::queue::MessageQueue;
use crate::registry::{
    CallbackRegistry, CommitCardCallback, CommitOutcome, CommitQrCallback, CommitQrLoginCallback,
    StatusFlags, TouchCardCallback,
};
use crate::worker::{SharedHandler, Worker, WorkerStats, WorkerStatsSnapshot};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// State guarded by the core lock.
#[derive(Debug, Default)]
pub(crate) struct Core {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) queue: MessageQueue,
}

pub(crate) struct Shared {
    core: Mutex<Core>,
    signal: Condvar,
    status: StatusFlags,
    callbacks: CallbackRegistry,
    stats: WorkerStats,
    settings: WorkerSettings,
}

impl Shared {
    fn new(settings: WorkerSettings) -> Self {
        Self {
            core: Mutex::new(Core::default()),
            signal: Condvar::new(),
            status: StatusFlags::new(),
            callbacks: CallbackRegistry::new(),
            stats: WorkerStats::default(),
            settings,
        }
    }

    /// Locks the core. A poisoned lock is recovered: nothing panics while
    /// holding it, and a dead lock would silence the relay for good.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn signal(&self) -> &Condvar {
        &self.signal
    }

    pub(crate) fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub(crate) fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Applies `mutate` and queues `event` in one critical section, then
    /// wakes the worker. Returns `false` once the relay has terminated.
    fn record(&self, event: &Event, mutate: impl FnOnce()) -> bool {
        match Message::encode(event) {
            Ok(text) => self.push(text, mutate),
            Err(e) => {
                error!("❌ Could not encode {}: {}", event, e);
                false
            }
        }
    }

    fn push(&self, text: String, mutate: impl FnOnce()) -> bool {
        let mut core = self.lock();
        let state = core.lifecycle.state();
        if !state.accepts_events() {
            debug!("Relay is {}, dropping {:?}", state, text);
            return false;
        }
        mutate();
        let seq = core.queue.push(text);
        drop(core);
        self.signal.notify_all();
        trace!(seq, "Queued message");
        true
    }
}

/// Cloneable, thread-safe view of a relay for plugin logic.
///
/// Handed to every [`RelayHandler`] hook; may also be cloned out to other
/// threads that need to commit cards or post events.
#[derive(Clone)]
pub struct RelayHandle {
    shared: Arc<Shared>,
}

impl RelayHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Current lifecycle state of the relay this handle points at.
    pub fn state(&self) -> LifecycleState {
        self.shared.lock().lifecycle.state()
    }

    /// Whether the host last reported the card reader as armed.
    pub fn card_reader_armed(&self) -> bool {
        self.shared.status.card_reader_armed()
    }

    /// Whether the host last reported the QR scanner as armed.
    pub fn qr_scanner_armed(&self) -> bool {
        self.shared.status.qr_scanner_armed()
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Messages queued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Hands a card to the host through the registered commit-card callback.
    ///
    /// Runs on the calling thread without holding the core lock, so a slow
    /// host never stalls producers or `Exit`. A call slower than
    /// `worker.commit_warn_ms` is logged as a warning.
    ///
    /// # Arguments
    ///
    /// * `card_number` - Card number as the host expects it
    /// * `chip_id` - Chip id, may be empty
    ///
    /// # Returns
    ///
    /// The host's verdict. `false` when no callback is registered or either
    /// string contains a NUL byte; the host is not called in those cases.
    pub fn commit_card(&self, card_number: &str, chip_id: &str) -> bool {
        let started = Instant::now();
        let outcome = self.shared.callbacks.commit_card(card_number, chip_id);
        self.finish_commit("commit-card", started, outcome)
    }

    /// Submits raw QR bytes to the host. Returns the host's verdict, or
    /// `false` when no commit-qr callback is registered.
    pub fn commit_qr(&self, data: &[u8]) -> bool {
        let started = Instant::now();
        let outcome = self.shared.callbacks.commit_qr(data);
        self.finish_commit("commit-qr", started, Ok(outcome))
    }

    /// Logs in with a card number read from a QR code. Same return rules as
    /// [`RelayHandle::commit_card`].
    pub fn commit_qr_login(&self, card_number: &str) -> bool {
        let started = Instant::now();
        let outcome = self.shared.callbacks.commit_qr_login(card_number);
        self.finish_commit("commit-qr-login", started, outcome)
    }

    /// Queues a free-form event for the worker.
    ///
    /// # Returns
    ///
    /// `true` if the event was queued. Once the relay is `Terminated` nothing
    /// is queued and this returns `false`.
    pub fn post(&self, body: impl Into<String>) -> bool {
        self.shared.record(&Event::Custom { body: body.into() }, || {})
    }

    /// Queues text as-is. Text that is not an event record reaches the
    /// handler through `on_unrecognized`.
    pub fn post_raw(&self, text: impl Into<String>) -> bool {
        self.shared.push(text.into(), || {})
    }

    fn finish_commit(
        &self,
        slot: &str,
        started: Instant,
        outcome: Result<CommitOutcome, RelayError>,
    ) -> bool {
        let elapsed = started.elapsed();
        if elapsed > self.shared.settings.commit_warn() {
            warn!("🐢 Host {} callback took {:?}", slot, elapsed);
        }
        match outcome {
            Ok(CommitOutcome::Unset) => {
                debug!("No {} callback registered, skipping commit", slot);
                false
            }
            Ok(outcome) => {
                debug!("Host {} callback returned {:?}", slot, outcome);
                outcome.accepted()
            }
            Err(e) => {
                warn!("⚠️ Refusing {} commit: {}", slot, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("callbacks", &self.shared.callbacks)
            .finish_non_exhaustive()
    }
}

/// An event relay instance.
///
/// One instance backs the host entrypoints for the whole time the module is
/// loaded. It starts `Uninitialized` (events are buffered), runs a worker
/// between `init` and `exit`, and ignores everything once `Terminated`.
pub struct Relay {
    shared: Arc<Shared>,
    handler: SharedHandler,
}

impl Relay {
    /// Creates an `Uninitialized` relay. No thread is started until
    /// [`Relay::init`].
    ///
    /// # Arguments
    ///
    /// * `settings` - Worker thread name, idle wake interval and commit
    ///   warning threshold
    /// * `handler` - Plugin logic run on the worker thread
    pub fn new(settings: WorkerSettings, handler: impl RelayHandler) -> Self {
        let handler: Box<dyn RelayHandler> = Box::new(handler);
        Self {
            shared: Arc::new(Shared::new(settings)),
            handler: Arc::new(Mutex::new(handler)),
        }
    }

    /// Returns a cloneable handle for threads other than the worker.
    pub fn handle(&self) -> RelayHandle {
        RelayHandle::new(self.shared.clone())
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().lifecycle.state()
    }

    /// Card reader availability as set by `UpdateStatus(1, _)`.
    pub fn card_reader_armed(&self) -> bool {
        self.shared.status.card_reader_armed()
    }

    /// QR scanner availability as set by `UpdateStatus(2, _)`.
    pub fn qr_scanner_armed(&self) -> bool {
        self.shared.status.qr_scanner_armed()
    }

    /// Worker counters so far.
    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Starts the worker thread.
    ///
    /// Events buffered before this call are processed first, in order.
    ///
    /// # Returns
    ///
    /// `true` if the worker was spawned. `false` if the relay was not
    /// `Uninitialized` or the thread could not be spawned; in the latter
    /// case the relay stays `Uninitialized`.
    pub fn init(&self) -> bool {
        let mut core = self.shared.lock();
        if let Err(e) = core.lifecycle.transition_to(LifecycleState::Running) {
            debug!("Init ignored: {}", e);
            return false;
        }

        // Spawned under the lock: the worker's first step is to take it, so
        // no `Exit` can slip in between the transition and the spawn.
        let worker = Worker::new(self.shared.clone(), self.handler.clone());
        let spawned = thread::Builder::new()
            .name(self.shared.settings.thread_name.clone())
            .spawn(move || worker.run());

        match spawned {
            // Detached: the worker's lifetime is tracked through the lifecycle
            // state, not the join handle.
            Ok(_detached) => {
                info!(
                    "🔌 Relay running ({} buffered event(s))",
                    core.queue.len()
                );
                true
            }
            Err(e) => {
                error!("❌ {}", RelayError::WorkerSpawn(e));
                if let Err(e) = core.lifecycle.transition_to(LifecycleState::Uninitialized) {
                    error!("❌ Could not roll back after failed spawn: {}", e);
                }
                false
            }
        }
    }

    /// Frame tick from the host. Intentionally empty; must stay O(1).
    #[inline]
    pub fn update(&self) {}

    /// Asks the worker to drain the queue and stop. Returns immediately;
    /// `false` if the relay was not `Running`.
    pub fn exit(&self) -> bool {
        let mut core = self.shared.lock();
        if let Err(e) = core.lifecycle.transition_to(LifecycleState::Draining) {
            debug!("Exit ignored: {}", e);
            return false;
        }
        let pending = core.queue.len();
        drop(core);
        self.shared.signal.notify_all();
        info!("🛑 Relay draining {} pending event(s)", pending);
        true
    }

    /// Records the game build the loader detected. Unknown ids are queued
    /// like any other but carry no build name.
    pub fn announce_version(&self, version_id: u64) -> bool {
        match GameVersion::from_id(version_id) {
            Some(version) => debug!("Game version {}", version),
            None => debug!("Unrecognized game version id {:#018X}", version_id),
        }
        self.shared.record(&Event::VersionKnown { version_id }, || {})
    }

    /// Stores the host's commit-card callback and queues a confirmation.
    ///
    /// # Arguments
    ///
    /// * `callback` - The host function, or `None` to clear the slot
    ///
    /// # Returns
    ///
    /// `true` if the registration was applied and queued, `false` once the
    /// relay is `Terminated`.
    pub fn register_card_reader(&self, callback: Option<CommitCardCallback>) -> bool {
        let event = Event::CardReaderRegistered {
            present: callback.is_some(),
        };
        self.shared
            .record(&event, || self.shared.callbacks.set_commit_card(callback))
    }

    /// Stores the commit-qr callback. See [`Relay::register_card_reader`].
    pub fn register_qr_scanner(&self, callback: Option<CommitQrCallback>) -> bool {
        let event = Event::QrScannerRegistered {
            present: callback.is_some(),
        };
        self.shared
            .record(&event, || self.shared.callbacks.set_commit_qr(callback))
    }

    /// Stores the commit-qr-login callback. See [`Relay::register_card_reader`].
    pub fn register_qr_login(&self, callback: Option<CommitQrLoginCallback>) -> bool {
        let event = Event::QrLoginRegistered {
            present: callback.is_some(),
        };
        self.shared
            .record(&event, || self.shared.callbacks.set_commit_qr_login(callback))
    }

    /// Sets the flag named by `kind` (1 card reader, 2 QR scanner) and
    /// queues the change. Unknown kinds change no flag but are still queued.
    pub fn update_status(&self, kind: usize, value: bool) -> bool {
        let status = StatusKind::from_raw(kind);
        if status.is_none() {
            debug!("Unknown status kind {}, no flag changed", kind);
        }
        self.shared.record(&Event::StatusChanged { kind, value }, || {
            if let Some(status) = status {
                self.shared.status.set(status, value);
            }
        })
    }

    /// Host-internal raw touch hook. The buffer layout is owned by the host
    /// and unstable, so the relay only notes the call.
    pub fn wait_touch(&self, callback: Option<TouchCardCallback>, touch_data: u64) {
        trace!(
            has_callback = callback.is_some(),
            touch_data,
            "Raw touch event passed through"
        );
    }

    /// Blocks up to `timeout` for the worker to reach `Terminated`.
    ///
    /// # Returns
    ///
    /// `true` if the relay is `Terminated` when this returns. A relay that
    /// was never started never terminates, so this returns `false` after
    /// the full timeout.
    pub fn wait_terminated(&self, timeout: Duration) -> bool {
        let core = self.shared.lock();
        let (core, _) = self
            .shared
            .signal
            .wait_timeout_while(core, timeout, |core| {
                core.lifecycle.state() != LifecycleState::Terminated
            })
            .unwrap_or_else(PoisonError::into_inner);
        core.lifecycle.state() == LifecycleState::Terminated
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.state())
            .field("callbacks", &self.shared.callbacks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::LoggingHandler;

    fn relay() -> Relay {
        Relay::new(WorkerSettings::default(), LoggingHandler)
    }

    #[test]
    fn status_updates_are_visible_after_return() {
        let relay = relay();
        assert!(relay.update_status(1, true));
        assert!(relay.card_reader_armed());
        assert!(!relay.qr_scanner_armed());

        assert!(relay.update_status(2, true));
        assert!(relay.qr_scanner_armed());
    }

    #[test]
    fn unknown_status_kind_changes_no_flag() {
        let relay = relay();
        relay.update_status(99, true);
        assert!(!relay.card_reader_armed());
        assert!(!relay.qr_scanner_armed());
        assert_eq!(relay.handle().pending(), 1);
    }

    #[test]
    fn events_before_init_are_buffered() {
        let relay = relay();
        relay.announce_version(GameVersion::Jpn39.id());
        relay.update_status(1, true);
        assert_eq!(relay.state(), LifecycleState::Uninitialized);
        assert_eq!(relay.handle().pending(), 2);
    }

    #[test]
    fn exit_before_init_is_ignored() {
        let relay = relay();
        assert!(!relay.exit());
        assert_eq!(relay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn update_has_no_side_effects() {
        let relay = relay();
        for _ in 0..1000 {
            relay.update();
        }
        assert_eq!(relay.handle().pending(), 0);
        assert_eq!(relay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn registration_reports_presence() {
        let relay = relay();
        relay.register_card_reader(None);

        let handle = relay.handle();
        assert!(!handle.commit_card("123", ""));
        let message = relay.shared.lock().queue.pop().unwrap();
        assert_eq!(
            message.decode().unwrap(),
            Event::CardReaderRegistered { present: false }
        );
    }

    #[test]
    fn wait_terminated_times_out_when_never_started() {
        let relay = relay();
        assert!(!relay.wait_terminated(Duration::from_millis(20)));
        assert_eq!(relay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn wait_touch_queues_nothing() {
        let relay = relay();
        relay.wait_touch(None, 0xFFFF);
        assert_eq!(relay.handle().pending(), 0);
    }
}
