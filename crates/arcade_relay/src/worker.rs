//! The single consumer thread.
//!
//! Loop shape: take the lock, pop and process messages one at a time with the
//! lock released around each, then either stop (queue empty and `Exit`
//! requested) or sleep on the condition variable until a producer notifies.
//! After `on_stop` the queue is drained once more, and `Terminated` is set
//! in the critical section that found it empty.

use crate::error::RelayError;
use crate::handler::RelayHandler;
use crate::lifecycle::LifecycleState;
use crate::message::Message;
use crate::relay::{Core, RelayHandle, Shared};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Counters kept by the worker, readable from any thread.
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    unrecognized: AtomicU64,
    faults: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    /// Messages taken off the queue, recognized or not
    pub processed: u64,
    /// Messages whose text was not an event record
    pub unrecognized: u64,
    /// Handler errors plus handler panics
    pub faults: u64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            processed: self.processed.load(Ordering::Acquire),
            unrecognized: self.unrecognized.load(Ordering::Acquire),
            faults: self.faults.load(Ordering::Acquire),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::AcqRel);
    }
}

pub(crate) type SharedHandler = Arc<Mutex<Box<dyn RelayHandler>>>;

pub(crate) struct Worker {
    shared: Arc<Shared>,
    handler: SharedHandler,
    handle: RelayHandle,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>, handler: SharedHandler) -> Self {
        let handle = RelayHandle::new(shared.clone());
        Self {
            shared,
            handler,
            handle,
        }
    }

    pub(crate) fn run(self) {
        let handler_slot = self.handler.clone();
        let mut guard = handler_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let handler: &mut dyn RelayHandler = &mut **guard;

        info!("🚀 Relay worker started for handler '{}'", handler.name());
        self.hook("on_start", || handler.on_start(&self.handle));

        let idle_wake = self.shared.settings().idle_wake();
        let mut core = self.shared.lock();
        loop {
            core = self.drain(handler, core);

            if !core.lifecycle.state().keeps_worker_alive() {
                break;
            }

            core = match idle_wake {
                Some(interval) => {
                    let (core, wait) = self
                        .shared
                        .signal()
                        .wait_timeout(core, interval)
                        .unwrap_or_else(PoisonError::into_inner);
                    let idle = wait.timed_out()
                        && core.queue.is_empty()
                        && core.lifecycle.state().keeps_worker_alive();
                    if idle {
                        drop(core);
                        self.hook("on_idle", || handler.on_idle(&self.handle));
                        self.shared.lock()
                    } else {
                        core
                    }
                }
                None => self
                    .shared
                    .signal()
                    .wait(core)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
        drop(core);

        self.hook("on_stop", || handler.on_stop(&self.handle));

        // The state is still Draining while `on_stop` runs, so producers
        // (the hook included) may have queued more. Terminated is only set
        // under the same lock that saw the queue empty.
        let mut core = self.drain(handler, self.shared.lock());

        let stats = self.shared.stats().snapshot();
        info!(
            processed = stats.processed,
            unrecognized = stats.unrecognized,
            faults = stats.faults,
            "🛑 Relay worker stopping"
        );

        if let Err(e) = core.lifecycle.transition_to(LifecycleState::Terminated) {
            error!("❌ Relay worker could not terminate cleanly: {}", e);
        }
        drop(core);
        self.shared.signal().notify_all();
        info!("✅ Relay worker terminated");
    }

    /// Processes queued messages until the queue is empty, releasing the lock
    /// around each one. Returns with the lock held and the queue empty.
    fn drain<'a>(
        &'a self,
        handler: &mut dyn RelayHandler,
        mut core: MutexGuard<'a, Core>,
    ) -> MutexGuard<'a, Core> {
        while let Some(message) = core.queue.pop() {
            drop(core);
            self.process(handler, message);
            core = self.shared.lock();
        }
        core
    }

    fn process(&self, handler: &mut dyn RelayHandler, message: Message) {
        let stats = self.shared.stats();
        WorkerStats::bump(&stats.processed);

        let event = match message.decode() {
            Ok(event) => event,
            Err(e) => {
                WorkerStats::bump(&stats.unrecognized);
                debug!(seq = message.seq(), "Message did not decode: {}", e);
                self.hook("on_unrecognized", || {
                    handler.on_unrecognized(&message, &self.handle)
                });
                return;
            }
        };

        debug!(seq = message.seq(), "Processing {}", event);
        let result = catch_unwind(AssertUnwindSafe(|| handler.on_event(&event, &self.handle)))
            .unwrap_or_else(|payload| Err(RelayError::from_panic(payload)));

        if let Err(e) = result {
            WorkerStats::bump(&stats.faults);
            error!(seq = message.seq(), "❌ Handler failed on {}: {}", event, e);
        }
    }

    /// Runs a handler hook, absorbing panics.
    fn hook(&self, name: &str, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            WorkerStats::bump(&self.shared.stats().faults);
            warn!("⚠️ Handler hook {} panicked: {}", name, RelayError::from_panic(payload));
        }
    }
}
