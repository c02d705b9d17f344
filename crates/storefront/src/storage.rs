//! Persistent key-value storage for session and cart state.
//!
//! The state containers keep everything they need to survive a restart in a
//! small string-keyed store: tokens, the guest marker, and the serialized
//! shopping cart. Each container is the only writer of its own keys, so the
//! boundary stays a plain `get`/`set`/`remove` with no transactions.
//!
//! Two backends are provided: [`FileStore`] persists to a single JSON map
//! file with replace-on-write so a crash never leaves a half-written map,
//! and [`MemoryStore`] holds everything in memory for tests and embedders
//! that bring their own persistence.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

/// Storage keys used by the state containers.
pub mod keys {
    /// Bearer token for the catalog service.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token issued alongside the access token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Literal `"true"` while a guest session is active, absent otherwise.
    pub const GUEST_MODE: &str = "guest_mode";
    /// Serialized shopping cart envelope.
    pub const SHOPPING_CART: &str = "shopping_cart";
}

/// Errors that can occur when accessing the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file could not be serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String-keyed persistent storage.
///
/// Values are opaque strings; callers serialize structured data themselves.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` and its value. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FileStore
// =============================================================================

/// Key-value store backed by a single JSON map file.
///
/// The whole map lives in memory and is rewritten on every mutation via a
/// sibling temp file and an atomic rename, so readers never observe a
/// partially written map. A write failure leaves the in-memory map ahead of
/// the file; the next successful write catches the file up.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a store backed by the file at `path`.
    ///
    /// A missing file yields an empty store. A file that exists but does not
    /// parse as a JSON string map is treated as empty with a warning; the
    /// next write replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "state file is not a JSON string map, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory key-value store.
///
/// Nothing survives the process; used by tests and by embedders that only
/// want a session-scoped cart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
