//! Shared helpers for relay integration tests.

#![allow(dead_code)]

use arcade_relay::{Event, Message, RelayError, RelayHandle, RelayHandler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Handler that records everything it sees.
///
/// `Custom { body: "fail" }` makes `on_event` return an error and
/// `Custom { body: "panic" }` makes it panic, after recording.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<Event>>>,
    pub unrecognized: Arc<Mutex<Vec<String>>>,
    pub starts: Arc<AtomicUsize>,
    pub idles: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn custom_bodies(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Custom { body } => Some(body),
                _ => None,
            })
            .collect()
    }
}

impl RelayHandler for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_start(&mut self, _relay: &RelayHandle) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_event(&mut self, event: &Event, _relay: &RelayHandle) -> Result<(), RelayError> {
        self.events.lock().unwrap().push(event.clone());
        match event {
            Event::Custom { body } if body == "fail" => {
                Err(RelayError::Handler("asked to fail".to_string()))
            }
            Event::Custom { body } if body == "panic" => panic!("asked to panic"),
            _ => Ok(()),
        }
    }

    fn on_unrecognized(&mut self, message: &Message, _relay: &RelayHandle) {
        self.unrecognized
            .lock()
            .unwrap()
            .push(message.text().to_string());
    }

    fn on_idle(&mut self, _relay: &RelayHandle) {
        self.idles.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stop(&mut self, _relay: &RelayHandle) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub const WAIT: Duration = Duration::from_secs(5);
