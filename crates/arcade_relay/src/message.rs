//! Event records exchanged between the entrypoints and the worker.
//!
//! Every record travels as text: the entrypoint serializes an [`Event`] to
//! JSON, the worker decodes it again. Text that does not decode is still a
//! valid [`Message`], it just reaches the handler as unrecognized.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Game builds the loader can announce through `InitVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameVersion {
    Jpn00,
    Jpn08,
    Jpn39,
    Chn00,
}

impl GameVersion {
    /// Identifier the loader sends when it failed to detect the build.
    pub const UNKNOWN_ID: u64 = 0x0000_0000_0000_0000;

    pub const ALL: [GameVersion; 4] = [
        GameVersion::Jpn00,
        GameVersion::Jpn08,
        GameVersion::Jpn39,
        GameVersion::Chn00,
    ];

    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            0x4C07_3559_66D8_15FB => Some(GameVersion::Jpn00),
            0x67C0_F304_2746_D488 => Some(GameVersion::Jpn08),
            0x49F6_43AD_B6B1_8705 => Some(GameVersion::Jpn39),
            0xA7EE_39F2_CC2C_57C8 => Some(GameVersion::Chn00),
            _ => None,
        }
    }

    pub fn id(self) -> u64 {
        match self {
            GameVersion::Jpn00 => 0x4C07_3559_66D8_15FB,
            GameVersion::Jpn08 => 0x67C0_F304_2746_D488,
            GameVersion::Jpn39 => 0x49F6_43AD_B6B1_8705,
            GameVersion::Chn00 => 0xA7EE_39F2_CC2C_57C8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameVersion::Jpn00 => "JPN00",
            GameVersion::Jpn08 => "JPN08",
            GameVersion::Jpn39 => "JPN39",
            GameVersion::Chn00 => "CHN00",
        }
    }

    /// Parses a build name such as `"JPN39"` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device whose availability `UpdateStatus` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    CardReader,
    QrScanner,
}

impl StatusKind {
    pub fn from_raw(kind: usize) -> Option<Self> {
        match kind {
            1 => Some(StatusKind::CardReader),
            2 => Some(StatusKind::QrScanner),
            _ => None,
        }
    }

    pub fn raw(self) -> usize {
        match self {
            StatusKind::CardReader => 1,
            StatusKind::QrScanner => 2,
        }
    }
}

/// One event reported by the host (or posted by plugin logic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The loader identified the running game build.
    VersionKnown { version_id: u64 },
    /// The commit-card slot was (re)registered; `present` is false for null.
    CardReaderRegistered { present: bool },
    QrScannerRegistered { present: bool },
    QrLoginRegistered { present: bool },
    /// A status flag update, with the host's raw kind value.
    StatusChanged { kind: usize, value: bool },
    /// Free-form text posted by plugin logic.
    Custom { body: String },
}

impl Event {
    pub fn version(&self) -> Option<GameVersion> {
        match self {
            Event::VersionKnown { version_id } => GameVersion::from_id(*version_id),
            _ => None,
        }
    }

    pub fn status_kind(&self) -> Option<StatusKind> {
        match self {
            Event::StatusChanged { kind, .. } => StatusKind::from_raw(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::VersionKnown { version_id } => match GameVersion::from_id(*version_id) {
                Some(version) => write!(f, "InitVersion {}", version),
                None => write!(f, "InitVersion unknown id {:#018X}", version_id),
            },
            Event::CardReaderRegistered { present } => {
                write!(f, "InitCardReader callback={}", present)
            }
            Event::QrScannerRegistered { present } => {
                write!(f, "InitQRScanner callback={}", present)
            }
            Event::QrLoginRegistered { present } => write!(f, "InitQRLogin callback={}", present),
            Event::StatusChanged { kind, value } => {
                write!(f, "UpdateStatus type={} status={}", kind, value)
            }
            Event::Custom { body } => write!(f, "custom: {}", body),
        }
    }
}

/// A queued text record with its enqueue sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    seq: u64,
    text: String,
}

impl Message {
    pub fn new(seq: u64, text: String) -> Self {
        Self { seq, text }
    }

    pub fn encode(event: &Event) -> Result<String, RelayError> {
        serde_json::to_string(event).map_err(RelayError::Encode)
    }

    pub fn decode(&self) -> Result<Event, RelayError> {
        serde_json::from_str(&self.text).map_err(RelayError::MalformedMessage)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
