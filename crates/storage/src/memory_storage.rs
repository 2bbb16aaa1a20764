//! Volatile `Storage` for tests and throwaway managers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Storage, StorageError, StorageResult};

/// Keys and bytes held in process memory; nothing survives a restart
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        self.entries.write().await.insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonStorage;

    #[tokio::test]
    async fn test_put_overwrites_previous_value() {
        let storage = MemoryStorage::new();
        storage.put("governance/state", b"round one").await.unwrap();
        storage.put("governance/state", b"round two").await.unwrap();

        assert_eq!(storage.get("governance/state").await.unwrap(), b"round two");
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let storage = MemoryStorage::new();

        assert!(matches!(
            storage.get("governance/members").await,
            Err(StorageError::KeyNotFound(key)) if key == "governance/members"
        ));
        let members: Option<Vec<String>> = storage.get_json_opt("governance/members").await.unwrap();
        assert!(members.is_none());
    }

    #[tokio::test]
    async fn test_json_values_shared_between_handles() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let writer = storage.clone();

        writer
            .put_json("governance/members", &vec!["ana".to_string(), "ben".to_string()])
            .await
            .unwrap();

        let members: Vec<String> = storage.get_json("governance/members").await.unwrap();
        assert_eq!(members, vec!["ana", "ben"]);
    }
}
