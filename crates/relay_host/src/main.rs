//! # Arcade Relay Host
//!
//! Stand-in for the arcade loader during plugin development. Loads a relay
//! plugin library, resolves its entrypoints and drives one scripted session.
//!
//! ```bash
//! relay-host target/debug/libplugin_relay.so --game-version JPN39 --frames 120
//! ```

mod cli;
mod loader;
mod session;

use arcade_relay::{logging::setup_logging, LoggingSettings};
use cli::CliArgs;
use loader::RelayPlugin;
use session::{run_session, SessionScript};
use tracing::{error, info};

fn main() {
    if let Err(e) = run() {
        error!("❌ Host failed: {:#}", e);
        eprintln!("relay-host: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse()?;

    setup_logging(&LoggingSettings {
        level: args.log_level.clone(),
        json_format: args.json_logs,
    });

    let plugin = RelayPlugin::load(&args.plugin_path)?;
    let script = SessionScript {
        game_version: args.game_version,
        frames: args.frames,
        frame_interval: args.frame_interval,
        exit_grace: args.exit_grace,
        card_reader: args.card_reader,
        qr_scanner: args.qr_scanner,
    };

    let commits = run_session(&plugin, &script);
    info!(
        cards = commits.cards,
        qr = commits.qr,
        qr_logins = commits.qr_logins,
        "📊 Session for {} finished",
        plugin.path().display()
    );
    Ok(())
}
