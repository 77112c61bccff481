//! Session storage backends
//!
//! The session manager talks to a string-keyed store through the
//! [`SessionStore`] trait. Production code uses [`FileStore`], which keeps one
//! file per key under a data directory and survives restarts. [`MemoryStore`]
//! backs tests.

use async_trait::async_trait;
use medicopilot_core::{storage_error, ErrorContext, MediError, MediResult};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Durable, async, string-keyed storage.
///
/// Implementations must make each call atomic on its own; the session manager
/// holds no lock of its own, so concurrent callers get last-writer-wins
/// semantics with no ordering beyond per-call atomicity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> MediResult<Option<String>>;

    /// Store `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: &str) -> MediResult<()>;

    /// Remove the value stored under `key`. Removing a missing key is a no-op.
    async fn delete(&self, key: &str) -> MediResult<()>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> MediResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> MediResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> MediResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// File-backed store: one file per key under a data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> MediResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| MediError::Storage {
            message: format!("Failed to create session directory {:?}: {}", dir, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("file_store")
                .with_operation("create_dir")
                .with_suggestion("Check that the session data directory is writable"),
        })?;

        debug!("Opened session store at {:?}", dir);
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> MediResult<PathBuf> {
        // Keys are internal constants, but never let one escape the directory.
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(storage_error!(
                format!("Invalid session key: {:?}", key),
                "file_store"
            ));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self, key: &str) -> MediResult<Option<String>> {
        let path = self.key_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MediError::Storage {
                message: format!("Failed to read session key {}: {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("file_store").with_operation("get"),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> MediResult<()> {
        let path = self.key_path(key)?;
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| MediError::Storage {
                message: format!("Failed to write session key {}: {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("file_store")
                    .with_operation("set")
                    .with_suggestion("Check that the session data directory is writable"),
            })
    }

    async fn delete(&self, key: &str) -> MediResult<()> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediError::Storage {
                message: format!("Failed to delete session key {}: {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("file_store").with_operation("delete"),
            }),
        }
    }
}
