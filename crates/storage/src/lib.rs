//! Storage system for the flagship governance engine
//!
//! This crate provides:
//! - the get/put `Storage` trait with file and memory implementations
//! - JSON helpers over any `Storage`
//! - `TxStore`, the transactional state store every balance and status
//!   mutation runs through

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub mod memory_storage;
pub mod transaction;

pub use memory_storage::MemoryStorage;
pub use transaction::TxStore;

/// Storage-related errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err.to_string())
    }
}

impl From<StorageError> for flagship_common::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::KeyNotFound(key) => flagship_common::Error::not_found(key),
            other => flagship_common::Error::internal(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage options
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Flush file contents to disk before returning from `put`
    pub sync_write: bool,
    /// Create missing directories on write
    pub create_dirs: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            sync_write: true,
            create_dirs: true,
        }
    }
}

/// Byte-level key/value store the governance snapshot and member list live in
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Replace the value at `key`
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Read the value at `key`, `KeyNotFound` if it was never written
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;
}

/// JSON encoding over any `Storage`.
///
/// Values are written compactly: the governance snapshot is rewritten on
/// every transaction and grows with history.
#[async_trait]
pub trait JsonStorage: Storage {
    async fn put_json<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.put(key, &bytes).await
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<T> {
        let bytes = self.get(key).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::DeserializationError(format!("{}: {}", key, e)))
    }

    /// Like `get_json`, but `None` when the key has never been written
    async fn get_json_opt<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get_json(key).await {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<T: Storage + ?Sized> JsonStorage for T {}

/// One file per key under a data directory
pub struct FileStorage {
    root: PathBuf,
    options: StorageOptions,
}

impl FileStorage {
    /// Open a data directory, creating it when `create_dirs` is set
    pub fn open(root: impl Into<PathBuf>, options: Option<StorageOptions>) -> StorageResult<Self> {
        let root = root.into();
        let options = options.unwrap_or_default();

        if options.create_dirs {
            std::fs::create_dir_all(&root).map_err(|e| {
                StorageError::IoError(format!("cannot create data directory {}: {}", root.display(), e))
            })?;
        }
        debug!(root = %root.display(), sync_write = options.sync_write, "Opened file storage");

        Ok(FileStorage { root, options })
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_of(key);

        if self.options.create_dirs {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::IoError(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        // Write beside the target and rename so readers never see a torn file.
        let mut staged = path.clone().into_os_string();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);

        let mut file = tokio::fs::File::create(&staged).await?;
        file.write_all(data).await?;
        if self.options.sync_write {
            file.sync_all().await?;
        }
        drop(file);

        tokio::fs::rename(&staged, &path).await.map_err(|e| {
            StorageError::IoError(format!("cannot move {} into place: {}", key, e))
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        match tokio::fs::read(self.path_of(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Roster {
        name: String,
        seats: u32,
    }

    #[tokio::test]
    async fn test_file_storage_replaces_atomically() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path(), None).unwrap();

        storage.put("governance/state", b"first").await.unwrap();
        storage.put("governance/state", b"second").await.unwrap();

        assert_eq!(storage.get("governance/state").await.unwrap(), b"second");
        assert!(dir.path().join("governance").join("state").exists());
        assert!(!dir.path().join("governance").join("state.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_storage_missing_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("fresh"), None).unwrap();

        assert!(dir.path().join("fresh").is_dir());
        assert!(matches!(
            storage.get("governance/members").await,
            Err(StorageError::KeyNotFound(key)) if key == "governance/members"
        ));
    }

    #[test]
    fn test_file_storage_open_reports_unusable_root() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = FileStorage::open(blocker.join("data"), None);
        assert!(matches!(result, Err(StorageError::IoError(_))));
    }

    #[tokio::test]
    async fn test_json_storage_is_compact() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path(), None).unwrap();
        let roster = Roster { name: "board".to_string(), seats: 7 };

        storage.put_json("roster", &roster).await.unwrap();
        let raw = storage.get("roster").await.unwrap();
        assert!(!raw.contains(&b'\n'));

        let loaded: Roster = storage.get_json("roster").await.unwrap();
        assert_eq!(loaded, roster);
        let missing: Option<Roster> = storage.get_json_opt("absent").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_json_storage_reports_corrupt_value() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path(), None).unwrap();
        storage.put("roster", b"{not json").await.unwrap();

        let result = storage.get_json_opt::<Roster>("roster").await;
        assert!(matches!(result, Err(StorageError::DeserializationError(_))));
    }

    #[test]
    fn test_storage_error_maps_to_common() {
        let err: flagship_common::Error = StorageError::KeyNotFound("state".to_string()).into();
        assert_eq!(err.kind(), flagship_common::ErrorKind::NotFound);

        let err: flagship_common::Error = StorageError::IoError("disk full".to_string()).into();
        assert_eq!(err.kind(), flagship_common::ErrorKind::Internal);
    }
}
