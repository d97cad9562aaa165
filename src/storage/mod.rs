pub mod identity_store;
pub mod sighting_store;
pub mod watchlist_store;

pub use identity_store::{FileIdentityStore, Identity, IdentityStore, MemoryIdentityStore};
pub use sighting_store::{FileSightingStore, MemorySightingStore, Sighting, SightingStore};
pub use watchlist_store::{
    FileWatchlistStore, MemoryWatchlistStore, Severity, WatchlistEntry, WatchlistStore,
    WatchlistType,
};

use crate::common::error::{EngineError, Result};
use directories::ProjectDirs;
use rand::RngCore;
use std::path::PathBuf;

/// Random 128-bit record id, hex-encoded.
pub fn new_record_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Base data directory when the config does not override it.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "facewatch", "FaceWatch")
        .ok_or_else(|| EngineError::Storage("Failed to get project dirs".into()))?;
    Ok(dirs.data_dir().to_path_buf())
}
