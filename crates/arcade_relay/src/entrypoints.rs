//! Host entrypoint surface.
//!
//! The loader resolves a fixed set of unmangled C symbols from the plugin
//! library. [`export_relay_plugin!`](crate::export_relay_plugin) generates
//! them over a single lazily built [`Relay`]; every generated function runs
//! inside [`guard`], so nothing unwinds into the host.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::handler::RelayHandler;
use crate::logging::setup_logging;
use crate::relay::Relay;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

/// Builds the relay behind the exported symbols: loads configuration,
/// installs logging, wraps `handler`.
pub fn bootstrap(handler: impl RelayHandler) -> Relay {
    let config = RelayConfig::load_or_default();
    setup_logging(&config.logging);
    info!(
        "🔌 Arcade relay v{} loaded with handler '{}'",
        env!("CARGO_PKG_VERSION"),
        handler.name()
    );
    Relay::new(config.worker, handler)
}

/// Runs one entrypoint body, absorbing any panic.
pub fn guard<R>(entrypoint: &str, body: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(
                "❌ Entrypoint {} panicked: {}",
                entrypoint,
                RelayError::from_panic(payload)
            );
            None
        }
    }
}

/// Exports the host entrypoints (`Init`, `Update`, `Exit`, `InitVersion`,
/// `InitCardReader`, `InitQRScanner`, `InitQRLogin`, `UpdateStatus`,
/// `WaitTouch`) from the invoking crate.
///
/// The argument is an expression producing the [`RelayHandler`]; it is
/// evaluated once, on the first entrypoint call.
///
/// ```rust,ignore
/// struct MyHandler;
///
/// impl arcade_relay::RelayHandler for MyHandler {
///     fn on_event(
///         &mut self,
///         event: &arcade_relay::Event,
///         relay: &arcade_relay::RelayHandle,
///     ) -> Result<(), arcade_relay::RelayError> {
///         Ok(())
///     }
/// }
///
/// arcade_relay::export_relay_plugin!(MyHandler);
/// ```
#[macro_export]
macro_rules! export_relay_plugin {
    ($handler:expr) => {
        static __ARCADE_RELAY: ::std::sync::OnceLock<$crate::Relay> = ::std::sync::OnceLock::new();

        /// The relay behind the exported symbols, built on first use.
        #[allow(dead_code)]
        pub fn exported_relay() -> &'static $crate::Relay {
            __ARCADE_RELAY.get_or_init(|| $crate::entrypoints::bootstrap($handler))
        }

        /// Called once when the game starts.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn Init() {
            $crate::entrypoints::guard("Init", || {
                exported_relay().init();
            });
        }

        /// Called every frame.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn Update() {
            if let Some(relay) = __ARCADE_RELAY.get() {
                relay.update();
            }
        }

        /// Called when the exit button is pressed.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn Exit() {
            $crate::entrypoints::guard("Exit", || {
                exported_relay().exit();
            });
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn InitVersion(game_version: u64) {
            $crate::entrypoints::guard("InitVersion", || {
                exported_relay().announce_version(game_version);
            });
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn InitCardReader(touch: Option<$crate::CommitCardCallback>) {
            $crate::entrypoints::guard("InitCardReader", || {
                exported_relay().register_card_reader(touch);
            });
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn InitQRScanner(scan: Option<$crate::CommitQrCallback>) {
            $crate::entrypoints::guard("InitQRScanner", || {
                exported_relay().register_qr_scanner(scan);
            });
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn InitQRLogin(login: Option<$crate::CommitQrLoginCallback>) {
            $crate::entrypoints::guard("InitQRLogin", || {
                exported_relay().register_qr_login(login);
            });
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn UpdateStatus(kind: usize, status: bool) {
            $crate::entrypoints::guard("UpdateStatus", || {
                exported_relay().update_status(kind, status);
            });
        }

        /// Low-level touch hook; prefer `InitCardReader`/`InitQRLogin`.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn WaitTouch(callback: Option<$crate::TouchCardCallback>, touch_data: u64) {
            $crate::entrypoints::guard("WaitTouch", || {
                exported_relay().wait_touch(callback, touch_data);
            });
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_passes_values_through() {
        assert_eq!(guard("Test", || 7), Some(7));
    }

    #[test]
    fn guard_absorbs_panics() {
        let result: Option<()> = guard("Test", || panic!("host must not see this"));
        assert_eq!(result, None);
    }
}
