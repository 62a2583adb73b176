//! A read-through LRU cache over a backing storage, for immutable items only.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;

use crate::storage_trait::{DbKey, DbValue, Storage};
use crate::{StorageError, StorageResult};

#[cfg(test)]
#[path = "cached_storage_test.rs"]
mod cached_storage_test;

pub struct CachedStorage {
    storage: Arc<dyn Storage>,
    cache: Mutex<LruCache<DbKey, DbValue>>,
}

impl CachedStorage {
    pub fn new(storage: Arc<dyn Storage>, max_size: NonZeroUsize) -> Self {
        Self { storage, cache: Mutex::new(LruCache::new(max_size)) }
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn set_value(&self, key: DbKey, value: DbValue) -> StorageResult<()> {
        self.cache.lock().expect("Poisoned cache lock").put(key.clone(), value.clone());
        self.storage.set_value(key, value).await
    }

    async fn get_value(&self, key: &DbKey) -> StorageResult<Option<DbValue>> {
        if let Some(value) = self.cache.lock().expect("Poisoned cache lock").get(key) {
            return Ok(Some(value.clone()));
        }
        let Some(value) = self.storage.get_value(key).await? else {
            return Ok(None);
        };
        self.cache.lock().expect("Poisoned cache lock").put(key.clone(), value.clone());
        Ok(Some(value))
    }

    async fn del_value(&self, _key: &DbKey) -> StorageResult<()> {
        Err(StorageError::DeleteUnsupported)
    }
}
