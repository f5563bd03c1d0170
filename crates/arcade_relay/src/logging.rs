//! Logging system setup.
//!
//! The relay lives inside somebody else's process, so the subscriber is
//! installed with `try_init`: a host that already owns the global subscriber
//! keeps it, and our events flow into it instead.

use crate::config::LoggingSettings;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a tracing subscriber built from `config`.
///
/// Respects `RUST_LOG` when set. Returns `true` if this call installed the
/// global subscriber, `false` if one was already in place.
pub fn setup_logging(config: &LoggingSettings) -> bool {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!("🔧 Logging initialized with level: {}", log_level);
    } else {
        debug!("Global subscriber already installed, keeping it");
    }
    installed
}
