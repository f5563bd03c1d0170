//! Dynamic loading of a relay plugin library.

use arcade_relay::{
    CommitCardCallback, CommitQrCallback, CommitQrLoginCallback, TouchCardCallback,
};
use libloading::Library;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Library loading error for {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Plugin does not export '{symbol}': {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("Invalid game version '{0}' (expected a build name or a 0x-prefixed id)")]
    InvalidVersion(String),
}

/// The host-facing entrypoints of a plugin, as the loader calls them.
pub trait PluginEntrypoints {
    fn init(&self);
    fn update(&self);
    fn exit(&self);
    fn init_version(&self, game_version: u64);
    fn init_card_reader(&self, callback: Option<CommitCardCallback>);
    fn init_qr_scanner(&self, callback: Option<CommitQrCallback>);
    fn init_qr_login(&self, callback: Option<CommitQrLoginCallback>);
    fn update_status(&self, kind: usize, status: bool);
    fn wait_touch(&self, callback: Option<TouchCardCallback>, touch_data: u64);
}

/// A loaded plugin library with every entrypoint resolved.
///
/// The library is never unloaded: the plugin's worker finishes on its own
/// thread after `Exit`, possibly after this struct is gone.
pub struct RelayPlugin {
    path: PathBuf,
    init: unsafe extern "C" fn(),
    update: unsafe extern "C" fn(),
    exit: unsafe extern "C" fn(),
    init_version: unsafe extern "C" fn(u64),
    init_card_reader: unsafe extern "C" fn(Option<CommitCardCallback>),
    init_qr_scanner: unsafe extern "C" fn(Option<CommitQrCallback>),
    init_qr_login: unsafe extern "C" fn(Option<CommitQrLoginCallback>),
    update_status: unsafe extern "C" fn(usize, bool),
    wait_touch: unsafe extern "C" fn(Option<TouchCardCallback>, u64),
    _library: ManuallyDrop<Library>,
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, HostError> {
    // SAFETY: the caller names the symbol with the signature the plugin
    // exports it under.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|source| HostError::MissingSymbol {
            symbol: name,
            source,
        })
}

impl RelayPlugin {
    pub fn load(path: &Path) -> Result<Self, HostError> {
        info!("🔄 Loading plugin from: {}", path.display());

        // SAFETY: loading runs the library's initializers; the path is a
        // plugin the user asked for.
        let library = unsafe { Library::new(path) }.map_err(|source| HostError::Library {
            path: path.to_path_buf(),
            source,
        })?;

        let plugin = Self {
            path: path.to_path_buf(),
            init: symbol(&library, "Init")?,
            update: symbol(&library, "Update")?,
            exit: symbol(&library, "Exit")?,
            init_version: symbol(&library, "InitVersion")?,
            init_card_reader: symbol(&library, "InitCardReader")?,
            init_qr_scanner: symbol(&library, "InitQRScanner")?,
            init_qr_login: symbol(&library, "InitQRLogin")?,
            update_status: symbol(&library, "UpdateStatus")?,
            wait_touch: symbol(&library, "WaitTouch")?,
            _library: ManuallyDrop::new(library),
        };

        info!("✅ Resolved all entrypoints of {}", plugin.path.display());
        Ok(plugin)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// SAFETY (all calls below): the pointers were resolved from a library that
// is still loaded, with the signatures the plugin exports.
impl PluginEntrypoints for RelayPlugin {
    fn init(&self) {
        unsafe { (self.init)() }
    }

    fn update(&self) {
        unsafe { (self.update)() }
    }

    fn exit(&self) {
        unsafe { (self.exit)() }
    }

    fn init_version(&self, game_version: u64) {
        unsafe { (self.init_version)(game_version) }
    }

    fn init_card_reader(&self, callback: Option<CommitCardCallback>) {
        unsafe { (self.init_card_reader)(callback) }
    }

    fn init_qr_scanner(&self, callback: Option<CommitQrCallback>) {
        unsafe { (self.init_qr_scanner)(callback) }
    }

    fn init_qr_login(&self, callback: Option<CommitQrLoginCallback>) {
        unsafe { (self.init_qr_login)(callback) }
    }

    fn update_status(&self, kind: usize, status: bool) {
        unsafe { (self.update_status)(kind, status) }
    }

    fn wait_touch(&self, callback: Option<TouchCardCallback>, touch_data: u64) {
        unsafe { (self.wait_touch)(callback, touch_data) }
    }
}
