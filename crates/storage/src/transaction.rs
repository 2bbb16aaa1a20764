//! Transactional state store.
//!
//! A `TxStore` owns one typed state value. Every mutation runs inside
//! [`TxStore::transaction`], which holds the write lock for the whole
//! read-check-write sequence, works on a draft copy and only replaces the
//! committed state when the closure succeeds and the snapshot (if any) has
//! been persisted. A failed closure or a failed snapshot write leaves the
//! committed state untouched.
//!
//! Every commit clones and rewrites the whole state, so commit cost grows
//! with the amount of recorded history.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{JsonStorage, Storage, StorageError, StorageResult};

/// Typed state guarded by a single transactional lock
pub struct TxStore<T> {
    state: RwLock<T>,
    storage: Option<Arc<dyn Storage>>,
    key: String,
}

impl<T> TxStore<T>
where
    T: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// A store that lives only in memory
    pub fn in_memory() -> Self {
        Self::with_state(T::default())
    }

    /// A memory-only store seeded with `state`
    pub fn with_state(state: T) -> Self {
        Self {
            state: RwLock::new(state),
            storage: None,
            key: String::new(),
        }
    }

    /// Open a store persisted under `key`, reloading the last committed snapshot
    pub async fn open(storage: Arc<dyn Storage>, key: impl Into<String>) -> StorageResult<Self> {
        let key = key.into();
        let state = match storage.get_json_opt::<T>(&key).await? {
            Some(state) => {
                info!("Loaded committed state from {}", key);
                state
            }
            None => {
                info!("No committed state at {}, starting empty", key);
                T::default()
            }
        };

        Ok(Self {
            state: RwLock::new(state),
            storage: Some(storage),
            key,
        })
    }

    /// Run `f` atomically against the state.
    ///
    /// Concurrent transactions are serialized. The result of `f` is returned
    /// only after the new state is committed.
    pub async fn transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StorageError>,
    {
        let mut committed = self.state.write().await;
        let mut draft = committed.clone();

        let result = f(&mut draft)?;

        if let Some(storage) = &self.storage {
            storage.put_json(&self.key, &draft).await?;
            debug!("Persisted snapshot {}", self.key);
        }

        *committed = draft;
        Ok(result)
    }

    /// Run a read-only view over the committed state
    pub async fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Clone of the committed state
    pub async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        balance: u64,
        debits: Vec<u64>,
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Insufficient,
        Storage(String),
    }

    impl From<StorageError> for TestError {
        fn from(err: StorageError) -> Self {
            TestError::Storage(err.to_string())
        }
    }

    fn debit(state: &mut Counter, amount: u64) -> Result<(), TestError> {
        if state.balance < amount {
            return Err(TestError::Insufficient);
        }
        state.balance -= amount;
        state.debits.push(amount);
        Ok(())
    }

    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn put(&self, key: &str, _data: &[u8]) -> StorageResult<()> {
            Err(StorageError::IoError(format!("read-only: {}", key)))
        }
        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::KeyNotFound(key.to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_closure_leaves_state_unchanged() {
        let store = TxStore::with_state(Counter { balance: 10, debits: vec![] });

        let result = store
            .transaction(|state| {
                state.debits.push(99);
                debit(state, 50)
            })
            .await;

        assert_eq!(result, Err(TestError::Insufficient));
        assert_eq!(store.snapshot().await, Counter { balance: 10, debits: vec![] });
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_state_unchanged() {
        let store: TxStore<Counter> = TxStore::open(Arc::new(FailingStorage), "state").await.unwrap();

        let result = store
            .transaction(|state| {
                state.balance = 500;
                Ok::<_, TestError>(())
            })
            .await;

        assert!(matches!(result, Err(TestError::Storage(_))));
        assert_eq!(store.read(|s| s.balance).await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

        let store: TxStore<Counter> = TxStore::open(storage.clone(), "ledger/state").await.unwrap();
        store
            .transaction(|state| {
                state.balance = 40;
                debit(state, 15)
            })
            .await
            .unwrap();

        let reopened: TxStore<Counter> = TxStore::open(storage, "ledger/state").await.unwrap();
        assert_eq!(reopened.snapshot().await, Counter { balance: 25, debits: vec![15] });
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let store = Arc::new(TxStore::with_state(Counter { balance: 100, debits: vec![] }));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.transaction(|state| debit(state, 20)).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        let state = store.snapshot().await;
        assert_eq!(succeeded, 5);
        assert_eq!(state.balance, 0);
        assert_eq!(state.debits.len(), 5);
    }
}
