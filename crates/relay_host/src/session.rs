//! Scripted game session and the host-side commit callbacks.

use crate::loader::PluginEntrypoints;
use arcade_relay::{CommitCardCallback, CommitQrCallback, CommitQrLoginCallback, StatusKind};
use std::ffi::{c_char, CStr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

static CARDS_COMMITTED: AtomicU64 = AtomicU64::new(0);
static QR_COMMITTED: AtomicU64 = AtomicU64::new(0);
static QR_LOGINS_COMMITTED: AtomicU64 = AtomicU64::new(0);

fn lossy(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    // SAFETY: the plugin passes NUL-terminated strings that live for the call.
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}

unsafe extern "C" fn host_commit_card(card_number: *const c_char, chip_id: *const c_char) -> bool {
    CARDS_COMMITTED.fetch_add(1, Ordering::Relaxed);
    info!(
        "💳 Host received card {} (chip {:?})",
        lossy(card_number),
        lossy(chip_id)
    );
    true
}

unsafe extern "C" fn host_commit_qr(data: *const u8, len: usize) -> bool {
    QR_COMMITTED.fetch_add(1, Ordering::Relaxed);
    let bytes = if data.is_null() {
        &[][..]
    } else {
        std::slice::from_raw_parts(data, len)
    };
    info!("📷 Host received {} byte(s) of QR data", bytes.len());
    true
}

unsafe extern "C" fn host_commit_qr_login(card_number: *const c_char) -> bool {
    QR_LOGINS_COMMITTED.fetch_add(1, Ordering::Relaxed);
    info!("📷 Host received QR login for card {}", lossy(card_number));
    true
}

/// Commits the plugin made back into the host during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCommits {
    pub cards: u64,
    pub qr: u64,
    pub qr_logins: u64,
}

impl HostCommits {
    pub fn snapshot() -> Self {
        Self {
            cards: CARDS_COMMITTED.load(Ordering::Relaxed),
            qr: QR_COMMITTED.load(Ordering::Relaxed),
            qr_logins: QR_LOGINS_COMMITTED.load(Ordering::Relaxed),
        }
    }
}

/// What the scripted session does.
#[derive(Debug, Clone)]
pub struct SessionScript {
    pub game_version: u64,
    pub frames: u32,
    pub frame_interval: Duration,
    pub exit_grace: Duration,
    pub card_reader: bool,
    pub qr_scanner: bool,
}

/// Drives the plugin the way the loader does: version, `Init`, callback
/// registration, device arming, a run of frames, disarming, `Exit`.
pub fn run_session(plugin: &dyn PluginEntrypoints, script: &SessionScript) -> HostCommits {
    info!("🎮 Announcing game version {:#018X}", script.game_version);
    plugin.init_version(script.game_version);
    plugin.init();

    if script.card_reader {
        plugin.init_card_reader(Some(host_commit_card as CommitCardCallback));
        plugin.update_status(StatusKind::CardReader.raw(), true);
    }
    if script.qr_scanner {
        plugin.init_qr_scanner(Some(host_commit_qr as CommitQrCallback));
        plugin.init_qr_login(Some(host_commit_qr_login as CommitQrLoginCallback));
        plugin.update_status(StatusKind::QrScanner.raw(), true);
    }

    let started = Instant::now();
    for _ in 0..script.frames {
        plugin.update();
        if !script.frame_interval.is_zero() {
            thread::sleep(script.frame_interval);
        }
    }
    debug!("Ran {} frame(s) in {:?}", script.frames, started.elapsed());

    plugin.wait_touch(None, 0);
    if script.card_reader {
        plugin.update_status(StatusKind::CardReader.raw(), false);
    }
    if script.qr_scanner {
        plugin.update_status(StatusKind::QrScanner.raw(), false);
    }

    info!("🛑 Exit pressed");
    plugin.exit();
    thread::sleep(script.exit_grace);

    HostCommits::snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_relay::TouchCardCallback;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedPlugin {
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedPlugin {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PluginEntrypoints for ScriptedPlugin {
        fn init(&self) {
            self.record("Init");
        }
        fn update(&self) {
            self.record("Update");
        }
        fn exit(&self) {
            self.record("Exit");
        }
        fn init_version(&self, game_version: u64) {
            self.record(format!("InitVersion({:#X})", game_version));
        }
        fn init_card_reader(&self, callback: Option<CommitCardCallback>) {
            self.record(format!("InitCardReader({})", callback.is_some()));
        }
        fn init_qr_scanner(&self, callback: Option<CommitQrCallback>) {
            self.record(format!("InitQRScanner({})", callback.is_some()));
        }
        fn init_qr_login(&self, callback: Option<CommitQrLoginCallback>) {
            self.record(format!("InitQRLogin({})", callback.is_some()));
        }
        fn update_status(&self, kind: usize, status: bool) {
            self.record(format!("UpdateStatus({}, {})", kind, status));
        }
        fn wait_touch(&self, _callback: Option<TouchCardCallback>, _touch_data: u64) {
            self.record("WaitTouch");
        }
    }

    fn script(card_reader: bool, qr_scanner: bool) -> SessionScript {
        SessionScript {
            game_version: 0x49F6_43AD_B6B1_8705,
            frames: 2,
            frame_interval: Duration::ZERO,
            exit_grace: Duration::ZERO,
            card_reader,
            qr_scanner,
        }
    }

    #[test]
    fn full_session_call_order() {
        let plugin = ScriptedPlugin::default();
        run_session(&plugin, &script(true, true));

        assert_eq!(
            plugin.calls(),
            vec![
                "InitVersion(0x49F643ADB6B18705)",
                "Init",
                "InitCardReader(true)",
                "UpdateStatus(1, true)",
                "InitQRScanner(true)",
                "InitQRLogin(true)",
                "UpdateStatus(2, true)",
                "Update",
                "Update",
                "WaitTouch",
                "UpdateStatus(1, false)",
                "UpdateStatus(2, false)",
                "Exit",
            ]
        );
    }

    #[test]
    fn devices_can_be_left_out() {
        let plugin = ScriptedPlugin::default();
        run_session(&plugin, &script(false, false));

        let calls = plugin.calls();
        assert!(!calls
            .iter()
            .any(|c| c.starts_with("InitCardReader") || c.starts_with("InitQR")));
        assert!(!calls.iter().any(|c| c.starts_with("UpdateStatus")));
        assert_eq!(calls.last().map(String::as_str), Some("Exit"));
    }

    #[test]
    fn host_callbacks_count_commits() {
        let before = HostCommits::snapshot();
        let card = std::ffi::CString::new("123").unwrap();
        unsafe {
            assert!(host_commit_card(card.as_ptr(), std::ptr::null()));
            assert!(host_commit_qr(std::ptr::null(), 0));
            assert!(host_commit_qr_login(card.as_ptr()));
        }
        let after = HostCommits::snapshot();
        assert!(after.cards > before.cards);
        assert!(after.qr > before.qr);
        assert!(after.qr_logins > before.qr_logins);
    }
}
