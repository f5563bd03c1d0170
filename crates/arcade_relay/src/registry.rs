//! Status flags and host callback slots.
//!
//! The two availability flags are plain atomics. Each callback slot is an
//! `ArcSwapOption`, so a reader always loads a complete function pointer,
//! either the one before a re-registration or the one after it.

use crate::error::RelayError;
use crate::message::StatusKind;
use arc_swap::ArcSwapOption;
use std::ffi::{c_char, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Host callback that inserts a card: `(card_number, chip_id) -> accepted`.
pub type CommitCardCallback =
    unsafe extern "C" fn(card_number: *const c_char, chip_id: *const c_char) -> bool;

/// Host callback that submits raw QR bytes.
pub type CommitQrCallback = unsafe extern "C" fn(data: *const u8, len: usize) -> bool;

/// Host callback that logs in with a card number read from a QR code.
pub type CommitQrLoginCallback = unsafe extern "C" fn(card_number: *const c_char) -> bool;

/// Length of the opaque buffer the host passes to its raw touch callback.
pub const TOUCH_DATA_LEN: usize = 168;

/// Host-internal raw touch callback. The buffer layout is host-defined.
pub type TouchCardCallback =
    unsafe extern "C" fn(a: i32, b: i32, data: *mut u8, touch_data: u64);

/// Result of invoking a callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The host callback returned `true`.
    Accepted,
    /// The host callback returned `false`.
    Rejected,
    /// Nothing registered; no call was made.
    Unset,
}

impl CommitOutcome {
    fn from_host(accepted: bool) -> Self {
        if accepted {
            CommitOutcome::Accepted
        } else {
            CommitOutcome::Rejected
        }
    }

    pub fn accepted(self) -> bool {
        matches!(self, CommitOutcome::Accepted)
    }
}

/// Card reader and QR scanner availability, as last reported by the host.
#[derive(Debug, Default)]
pub struct StatusFlags {
    card_reader_armed: AtomicBool,
    qr_scanner_armed: AtomicBool,
}

impl StatusFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, kind: StatusKind, value: bool) {
        let flag = match kind {
            StatusKind::CardReader => &self.card_reader_armed,
            StatusKind::QrScanner => &self.qr_scanner_armed,
        };
        flag.store(value, Ordering::Release);
    }

    pub fn get(&self, kind: StatusKind) -> bool {
        match kind {
            StatusKind::CardReader => self.card_reader_armed(),
            StatusKind::QrScanner => self.qr_scanner_armed(),
        }
    }

    pub fn card_reader_armed(&self) -> bool {
        self.card_reader_armed.load(Ordering::Acquire)
    }

    pub fn qr_scanner_armed(&self) -> bool {
        self.qr_scanner_armed.load(Ordering::Acquire)
    }
}

/// The three host-supplied commit slots.
///
/// The registry never owns the functions behind the pointers and never
/// retries a rejected commit.
#[derive(Default)]
pub struct CallbackRegistry {
    commit_card: ArcSwapOption<CommitCardCallback>,
    commit_qr: ArcSwapOption<CommitQrCallback>,
    commit_qr_login: ArcSwapOption<CommitQrLoginCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the commit-card slot. `None` clears it.
    pub fn set_commit_card(&self, callback: Option<CommitCardCallback>) {
        self.commit_card.store(callback.map(Arc::new));
    }

    /// Replaces the commit-qr slot. `None` clears it.
    pub fn set_commit_qr(&self, callback: Option<CommitQrCallback>) {
        self.commit_qr.store(callback.map(Arc::new));
    }

    /// Replaces the commit-qr-login slot. `None` clears it.
    pub fn set_commit_qr_login(&self, callback: Option<CommitQrLoginCallback>) {
        self.commit_qr_login.store(callback.map(Arc::new));
    }

    pub fn has_commit_card(&self) -> bool {
        self.commit_card.load().is_some()
    }

    pub fn has_commit_qr(&self) -> bool {
        self.commit_qr.load().is_some()
    }

    pub fn has_commit_qr_login(&self) -> bool {
        self.commit_qr_login.load().is_some()
    }

    /// Calls the commit-card slot, if set.
    ///
    /// The slot is loaded once, so a concurrent re-registration is seen
    /// either entirely before or entirely after this call.
    ///
    /// # Arguments
    ///
    /// * `card_number` - Passed to the host as a NUL-terminated string
    /// * `chip_id` - Passed to the host as a NUL-terminated string
    ///
    /// # Returns
    ///
    /// The [`CommitOutcome`], or [`RelayError::InvalidText`] if either string
    /// contains a NUL byte. The host is not called in that case.
    pub fn commit_card(&self, card_number: &str, chip_id: &str) -> Result<CommitOutcome, RelayError> {
        let Some(callback) = self.commit_card.load_full() else {
            return Ok(CommitOutcome::Unset);
        };
        let card_number = to_c_string(card_number)?;
        let chip_id = to_c_string(chip_id)?;
        // SAFETY: the host registered this pointer for exactly this signature;
        // both strings outlive the call.
        let accepted = unsafe { (*callback)(card_number.as_ptr(), chip_id.as_ptr()) };
        Ok(CommitOutcome::from_host(accepted))
    }

    /// Calls the commit-qr slot with a pointer and length into `data`.
    pub fn commit_qr(&self, data: &[u8]) -> CommitOutcome {
        let Some(callback) = self.commit_qr.load_full() else {
            return CommitOutcome::Unset;
        };
        // SAFETY: pointer and length describe `data`, which outlives the call.
        let accepted = unsafe { (*callback)(data.as_ptr(), data.len()) };
        CommitOutcome::from_host(accepted)
    }

    /// Calls the commit-qr-login slot. Refuses interior NUL like
    /// [`CallbackRegistry::commit_card`].
    pub fn commit_qr_login(&self, card_number: &str) -> Result<CommitOutcome, RelayError> {
        let Some(callback) = self.commit_qr_login.load_full() else {
            return Ok(CommitOutcome::Unset);
        };
        let card_number = to_c_string(card_number)?;
        // SAFETY: see `commit_card`.
        let accepted = unsafe { (*callback)(card_number.as_ptr()) };
        Ok(CommitOutcome::from_host(accepted))
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("commit_card", &self.has_commit_card())
            .field("commit_qr", &self.has_commit_qr())
            .field("commit_qr_login", &self.has_commit_qr_login())
            .finish()
    }
}

fn to_c_string(text: &str) -> Result<CString, RelayError> {
    CString::new(text).map_err(|_| RelayError::InvalidText(text.to_string()))
}
