//! # Arcade Relay
//!
//! A lifecycle-managed, thread-safe event relay between an arcade loader (the
//! host) and plugin logic that reacts to card, QR and status events.
//!
//! The host calls a fixed set of C entrypoints on its own threads. Each one
//! mutates shared state and/or queues a text record, then wakes a single
//! worker thread. The worker drains the queue in FIFO order, hands every event
//! to a [`RelayHandler`], and the handler reports results back to the host
//! through the commit callbacks the host registered.
//!
//! ## Architecture
//!
//! - [`message`] - event records and their text encoding
//! - [`queue`] - the FIFO message queue
//! - [`lifecycle`] - `Uninitialized → Running → Draining → Terminated`
//! - [`registry`] - status flags and host callback slots
//! - [`worker`] - the consumer loop
//! - [`relay`] - the owned instance tying the above together
//! - [`entrypoints`] - the exported C surface
//!
//! ## Writing a plugin
//!
//! ```rust,ignore
//! use arcade_relay::{Event, RelayError, RelayHandle, RelayHandler};
//!
//! #[derive(Default)]
//! struct AutoLogin;
//!
//! impl RelayHandler for AutoLogin {
//!     fn on_event(&mut self, event: &Event, relay: &RelayHandle) -> Result<(), RelayError> {
//!         if let Event::StatusChanged { kind: 1, value: true } = event {
//!             relay.commit_card("00000000000000000001", "");
//!         }
//!         Ok(())
//!     }
//! }
//!
//! arcade_relay::export_relay_plugin!(AutoLogin::default());
//! ```

pub mod config;
pub mod entrypoints;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod worker;

pub use config::{LoggingSettings, RelayConfig, WorkerSettings};
pub use error::RelayError;
pub use handler::{LoggingHandler, RelayHandler};
pub use lifecycle::LifecycleState;
pub use message::{Event, GameVersion, Message, StatusKind};
pub use registry::{
    CommitCardCallback, CommitOutcome, CommitQrCallback, CommitQrLoginCallback,
    TouchCardCallback, TOUCH_DATA_LEN,
};
pub use relay::{Relay, RelayHandle};
pub use worker::WorkerStatsSnapshot;
