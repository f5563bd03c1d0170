//! Calls the generated C entrypoints exactly as a host would.
//!
//! The exported relay is a process-wide singleton, so the whole session runs
//! in a single test.

use arcade_relay::{
    CommitCardCallback, CommitQrCallback, CommitQrLoginCallback, Event, GameVersion,
    LifecycleState, RelayError, RelayHandle, RelayHandler,
};
use std::ffi::{c_char, CStr};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

static SEEN: Mutex<Vec<Event>> = Mutex::new(Vec::new());
static HOST_CARDS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static HOST_QR: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
static HOST_LOGINS: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Answers every armed device with a commit, like a virtual reader would.
struct VirtualReader;

impl RelayHandler for VirtualReader {
    fn name(&self) -> &str {
        "virtual-reader"
    }

    fn on_event(&mut self, event: &Event, relay: &RelayHandle) -> Result<(), RelayError> {
        SEEN.lock().unwrap().push(event.clone());
        match event {
            Event::CardReaderRegistered { present: true } if relay.card_reader_armed() => {
                relay.commit_card("00000000000000000001", "00000000000000000000000000000001");
            }
            Event::StatusChanged { kind: 2, value: true } => {
                relay.commit_qr(b"BNTTCNID1");
                relay.commit_qr_login("123");
            }
            _ => {}
        }
        Ok(())
    }
}

arcade_relay::export_relay_plugin!(VirtualReader);

unsafe extern "C" fn host_commit_card(card: *const c_char, _chip: *const c_char) -> bool {
    HOST_CARDS
        .lock()
        .unwrap()
        .push(CStr::from_ptr(card).to_string_lossy().into_owned());
    true
}

unsafe extern "C" fn host_commit_qr(data: *const u8, len: usize) -> bool {
    HOST_QR
        .lock()
        .unwrap()
        .push(std::slice::from_raw_parts(data, len).to_vec());
    true
}

unsafe extern "C" fn host_commit_qr_login(card: *const c_char) -> bool {
    HOST_LOGINS
        .lock()
        .unwrap()
        .push(CStr::from_ptr(card).to_string_lossy().into_owned());
    false
}

fn seen_len() -> usize {
    SEEN.lock().unwrap().len()
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn host_session() {
    // Frame ticks before anything else exist must be harmless.
    Update();

    UpdateStatus(1, true);
    InitVersion(GameVersion::Jpn39.id());
    InitCardReader(Some(host_commit_card as CommitCardCallback));
    assert_eq!(exported_relay().state(), LifecycleState::Uninitialized);
    assert!(exported_relay().card_reader_armed());

    Init();
    Init();
    for _ in 0..100 {
        Update();
    }
    assert!(wait_for(|| !HOST_CARDS.lock().unwrap().is_empty()));
    assert_eq!(seen_len(), 3);
    assert_eq!(*HOST_CARDS.lock().unwrap(), vec!["00000000000000000001".to_string()]);

    InitQRScanner(Some(host_commit_qr as CommitQrCallback));
    InitQRLogin(Some(host_commit_qr_login as CommitQrLoginCallback));
    UpdateStatus(99, true);
    UpdateStatus(2, true);
    WaitTouch(None, 0);
    assert!(wait_for(|| !HOST_LOGINS.lock().unwrap().is_empty()));
    assert_eq!(seen_len(), 7);
    assert!(exported_relay().qr_scanner_armed());
    assert_eq!(*HOST_QR.lock().unwrap(), vec![b"BNTTCNID1".to_vec()]);
    assert_eq!(*HOST_LOGINS.lock().unwrap(), vec!["123".to_string()]);

    assert_eq!(
        *SEEN.lock().unwrap(),
        vec![
            Event::StatusChanged { kind: 1, value: true },
            Event::VersionKnown { version_id: GameVersion::Jpn39.id() },
            Event::CardReaderRegistered { present: true },
            Event::QrScannerRegistered { present: true },
            Event::QrLoginRegistered { present: true },
            Event::StatusChanged { kind: 99, value: true },
            Event::StatusChanged { kind: 2, value: true },
        ]
    );

    Exit();
    Exit();
    assert!(exported_relay().wait_terminated(Duration::from_secs(2)));

    // Everything after termination is ignored.
    UpdateStatus(1, false);
    InitCardReader(None);
    Init();
    assert!(exported_relay().card_reader_armed());
    assert_eq!(exported_relay().state(), LifecycleState::Terminated);
    assert_eq!(seen_len(), 7);
}
