//! Blob store backends for the durable queue key.
//!
//! Two implementations of the [`BlobStore`] port ship with the engine: an
//! in-memory map for tests and ephemeral use, and a file-backed store that
//! writes each key as one file with an atomic tmp-write + rename.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use offsync_core::BlobStore;
use offsync_domain::{EngineError, Result};
use parking_lot::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// In-memory blob store. Contents do not survive the process.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// File-backed blob store: one file per key under a root directory.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are engine-configured, not user input; flatten separators so
        // a dotted key stays a single file name.
        let name: String =
            key.chars().map(|c| if c == '/' || c == '\\' { '_' } else { c }).collect();
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| EngineError::Storage(e.to_string()))?;
        }

        // Write to a temporary file first for atomicity
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        file.write_all(bytes).await.map_err(|e| EngineError::Storage(e.to_string()))?;
        file.sync_all().await.map_err(|e| EngineError::Storage(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &path).await.map_err(|e| EngineError::Storage(e.to_string()))?;

        debug!(key = key, bytes = bytes.len(), "Wrote blob");
        Ok(())
    }
}
