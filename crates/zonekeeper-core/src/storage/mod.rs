mod config;
pub mod database;

pub use config::{Config, ProfileConfig, SessionConfig, SyncConfig};
pub use database::{Database, SessionRecord};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StorageError;

/// Returns `~/.config/zonekeeper[-dev]/` based on ZONEKEEPER_ENV.
///
/// Set ZONEKEEPER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ZONEKEEPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("zonekeeper-dev")
    } else {
        base_dir.join("zonekeeper")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Get/set of opaque named blobs.
pub trait BlobStore: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(key.to_string(), value.to_vec());
        self.writes += 1;
        Ok(())
    }
}

/// Lets a caller keep a handle on a store it hands to a synchronizer.
impl<S: BlobStore> BlobStore for Arc<Mutex<S>> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.lock().unwrap_or_else(PoisonError::into_inner).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.lock().unwrap_or_else(PoisonError::into_inner).set(key, value)
    }
}
