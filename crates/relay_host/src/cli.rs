//! Command-line interface for the development host.

use crate::loader::HostError;
use arcade_relay::GameVersion;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the plugin library to load
    pub plugin_path: PathBuf,
    /// Game version id announced through `InitVersion`
    pub game_version: u64,
    /// Number of `Update` frames to run between setup and `Exit`
    pub frames: u32,
    /// Delay between frames
    pub frame_interval: Duration,
    /// Time granted to the plugin after `Exit` before unloading
    pub exit_grace: Duration,
    /// Whether to register and arm the card reader
    pub card_reader: bool,
    /// Whether to register and arm the QR scanner
    pub qr_scanner: bool,
    /// Log level for the host's own output
    pub log_level: String,
    /// Whether to output host logs in JSON format
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("Arcade Relay Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads a relay plugin and drives it through a scripted game session")
        .arg(
            Arg::new("plugin")
                .value_name("LIBRARY")
                .help("Path to the plugin library (.dll / .so / .dylib)")
                .required(true),
        )
        .arg(
            Arg::new("game-version")
                .short('g')
                .long("game-version")
                .value_name("VERSION")
                .help("Build to announce: JPN00, JPN08, JPN39, CHN00 or a 0x-prefixed id")
                .default_value("JPN39"),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .value_name("COUNT")
                .help("Number of Update frames to run")
                .value_parser(clap::value_parser!(u32))
                .default_value("300"),
        )
        .arg(
            Arg::new("frame-ms")
                .long("frame-ms")
                .value_name("MILLIS")
                .help("Milliseconds between frames")
                .value_parser(clap::value_parser!(u64))
                .default_value("16"),
        )
        .arg(
            Arg::new("exit-grace-ms")
                .long("exit-grace-ms")
                .value_name("MILLIS")
                .help("Milliseconds to wait after Exit before unloading")
                .value_parser(clap::value_parser!(u64))
                .default_value("500"),
        )
        .arg(
            Arg::new("no-card-reader")
                .long("no-card-reader")
                .help("Do not register or arm the card reader")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-qr")
                .long("no-qr")
                .help("Do not register or arm the QR scanner")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parses a build name or a hexadecimal version id.
pub fn parse_game_version(text: &str) -> Result<u64, HostError> {
    if let Some(version) = GameVersion::from_name(text) {
        return Ok(version.id());
    }
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .ok_or_else(|| HostError::InvalidVersion(text.to_string()))
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> anyhow::Result<Self> {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_matches(&command().try_get_matches_from(args)?)
    }

    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let plugin_path = matches
            .get_one::<String>("plugin")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("plugin path is required"))?;
        let game_version = matches
            .get_one::<String>("game-version")
            .map(|v| parse_game_version(v))
            .transpose()?
            .unwrap_or(GameVersion::Jpn39.id());

        Ok(Self {
            plugin_path,
            game_version,
            frames: matches.get_one::<u32>("frames").copied().unwrap_or(300),
            frame_interval: Duration::from_millis(
                matches.get_one::<u64>("frame-ms").copied().unwrap_or(16),
            ),
            exit_grace: Duration::from_millis(
                matches.get_one::<u64>("exit-grace-ms").copied().unwrap_or(500),
            ),
            card_reader: !matches.get_flag("no-card-reader"),
            qr_scanner: !matches.get_flag("no-qr"),
            log_level: matches
                .get_one::<String>("log-level")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
            json_logs: matches.get_flag("json-logs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["relay-host", "plugin.dll"]).unwrap();
        assert_eq!(args.plugin_path, PathBuf::from("plugin.dll"));
        assert_eq!(args.game_version, GameVersion::Jpn39.id());
        assert_eq!(args.frames, 300);
        assert_eq!(args.frame_interval, Duration::from_millis(16));
        assert_eq!(args.exit_grace, Duration::from_millis(500));
        assert!(args.card_reader);
        assert!(args.qr_scanner);
        assert_eq!(args.log_level, "info");
        assert!(!args.json_logs);
    }

    #[test]
    fn overrides() {
        let args = CliArgs::try_parse_from([
            "relay-host",
            "libplugin_relay.so",
            "--game-version",
            "chn00",
            "--frames",
            "5",
            "--frame-ms",
            "0",
            "--no-qr",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.game_version, GameVersion::Chn00.id());
        assert_eq!(args.frames, 5);
        assert_eq!(args.frame_interval, Duration::ZERO);
        assert!(args.card_reader);
        assert!(!args.qr_scanner);
        assert!(args.json_logs);
    }

    #[test]
    fn plugin_path_is_required() {
        assert!(CliArgs::try_parse_from(["relay-host"]).is_err());
    }

    #[test]
    fn game_versions_by_name_or_id() {
        assert_eq!(parse_game_version("JPN00").unwrap(), GameVersion::Jpn00.id());
        assert_eq!(parse_game_version("0x0").unwrap(), 0);
        assert_eq!(
            parse_game_version("0x67C0F3042746D488").unwrap(),
            GameVersion::Jpn08.id()
        );
        assert!(matches!(
            parse_game_version("JPN99"),
            Err(HostError::InvalidVersion(_))
        ));
        assert!(parse_game_version("0xZZ").is_err());
    }
}
