//! A deferred-write wrapper buffering all writes in memory for the duration of one batch
//! derivation. Reads consult the overlay first and fall through to the underlying storage,
//! populating the overlay on the way back. Nothing reaches the underlying storage until
//! [`DeferredStorage::commit`]; dropping the wrapper without committing discards the overlay,
//! so an aborted derivation leaves no orphaned tree nodes behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::storage_trait::{DbKey, DbValue, Storage};
use crate::{StorageError, StorageResult};

#[cfg(test)]
#[path = "deferred_storage_test.rs"]
mod deferred_storage_test;

pub struct DeferredStorage {
    storage: Arc<dyn Storage>,
    overlay: Mutex<HashMap<DbKey, DbValue>>,
}

impl DeferredStorage {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage, overlay: Mutex::new(HashMap::new()) }
    }

    /// Flushes every buffered write to the underlying storage. Buffered facts are immutable and
    /// content-addressed, so the flush order does not matter and a partially flushed crash is
    /// safe to repeat.
    pub async fn commit(&self) -> StorageResult<()> {
        let updates: Vec<(DbKey, DbValue)> =
            self.overlay.lock().expect("Poisoned overlay lock").drain().collect();
        self.storage.mset(updates).await
    }
}

#[async_trait]
impl Storage for DeferredStorage {
    async fn set_value(&self, key: DbKey, value: DbValue) -> StorageResult<()> {
        self.overlay.lock().expect("Poisoned overlay lock").insert(key, value);
        Ok(())
    }

    async fn get_value(&self, key: &DbKey) -> StorageResult<Option<DbValue>> {
        if let Some(value) = self.overlay.lock().expect("Poisoned overlay lock").get(key) {
            return Ok(Some(value.clone()));
        }
        let Some(value) = self.storage.get_value(key).await? else {
            return Ok(None);
        };
        self.overlay.lock().expect("Poisoned overlay lock").insert(key.clone(), value.clone());
        Ok(Some(value))
    }

    async fn del_value(&self, _key: &DbKey) -> StorageResult<()> {
        Err(StorageError::DeleteUnsupported)
    }
}
