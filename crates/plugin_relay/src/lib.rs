use arcade_relay::{
    export_relay_plugin, Event, GameVersion, RelayError, RelayHandle, RelayHandler, StatusKind,
};
use std::time::Instant;
use tracing::{debug, info};

/// Default plugin logic: greets the detected game build and echoes every
/// event the host reports. Commit callbacks are left for real plugins to use.
pub struct GreeterHandler {
    name: String,
    version: Option<GameVersion>,
    events_seen: u64,
    started: Option<Instant>,
}

impl GreeterHandler {
    pub fn new() -> Self {
        Self {
            name: "greeter".to_string(),
            version: None,
            events_seen: 0,
            started: None,
        }
    }

    /// The build announced by `InitVersion`, if a known one arrived.
    pub fn version(&self) -> Option<GameVersion> {
        self.version
    }

    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }
}

impl Default for GreeterHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayHandler for GreeterHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&mut self, _relay: &RelayHandle) {
        self.started = Some(Instant::now());
        info!("👋 GreeterHandler: Hello from the plugin thread!");
    }

    fn on_event(&mut self, event: &Event, relay: &RelayHandle) -> Result<(), RelayError> {
        self.events_seen += 1;
        info!("👋 GreeterHandler: plugin thread says: {}", event);

        match event {
            Event::VersionKnown { .. } => {
                if let Some(version) = event.version() {
                    info!("🎮 GreeterHandler: Hello {} (from plugin)", version);
                    self.version = Some(version);
                }
            }
            Event::StatusChanged { value, .. } => match event.status_kind() {
                Some(StatusKind::CardReader) => {
                    debug!(armed = *value, "Card reader availability changed");
                }
                Some(StatusKind::QrScanner) => {
                    debug!(armed = *value, "QR scanner availability changed");
                }
                None => debug!("Status update for a device this plugin does not know"),
            },
            Event::CardReaderRegistered { present } => {
                debug!(
                    present = *present,
                    armed = relay.card_reader_armed(),
                    "Card reader callback registered"
                );
            }
            Event::QrScannerRegistered { present } | Event::QrLoginRegistered { present } => {
                debug!(
                    present = *present,
                    armed = relay.qr_scanner_armed(),
                    "QR callback registered"
                );
            }
            Event::Custom { .. } => {}
        }
        Ok(())
    }

    fn on_stop(&mut self, _relay: &RelayHandle) {
        let uptime = self.started.map(|s| s.elapsed()).unwrap_or_default();
        info!(
            "👋 GreeterHandler: Goodbye from the plugin thread! Saw {} event(s) in {:?}",
            self.events_seen, uptime
        );
    }
}

export_relay_plugin!(GreeterHandler::new());

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_relay::{Relay, WorkerSettings};

    fn handle() -> RelayHandle {
        Relay::new(WorkerSettings::default(), GreeterHandler::new()).handle()
    }

    #[test]
    fn remembers_known_versions_only() {
        let relay = handle();
        let mut greeter = GreeterHandler::new();

        greeter
            .on_event(&Event::VersionKnown { version_id: 0x42 }, &relay)
            .unwrap();
        assert_eq!(greeter.version(), None);

        greeter
            .on_event(
                &Event::VersionKnown {
                    version_id: GameVersion::Chn00.id(),
                },
                &relay,
            )
            .unwrap();
        assert_eq!(greeter.version(), Some(GameVersion::Chn00));
        assert_eq!(greeter.events_seen(), 2);
    }

    #[test]
    fn accepts_every_event_kind() {
        let relay = handle();
        let mut greeter = GreeterHandler::new();
        let events = [
            Event::CardReaderRegistered { present: true },
            Event::QrScannerRegistered { present: false },
            Event::QrLoginRegistered { present: true },
            Event::StatusChanged { kind: 1, value: true },
            Event::StatusChanged { kind: 2, value: false },
            Event::StatusChanged { kind: 7, value: true },
            Event::Custom { body: "hi".into() },
        ];
        for event in &events {
            assert!(greeter.on_event(event, &relay).is_ok());
        }
        assert_eq!(greeter.events_seen(), events.len() as u64);
    }

    #[test]
    fn exported_relay_runs_a_session() {
        InitVersion(GameVersion::Jpn08.id());
        Init();
        UpdateStatus(1, true);
        Update();
        Exit();

        let relay = exported_relay();
        assert!(relay.wait_terminated(std::time::Duration::from_secs(5)));
        assert!(relay.card_reader_armed());
        assert_eq!(relay.stats().processed, 2);
        assert_eq!(relay.stats().faults, 0);
    }
}
