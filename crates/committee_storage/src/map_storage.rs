//! In-memory storage over a hash map, the default backend and the test double.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::storage_trait::{DbKey, DbValue, Storage};
use crate::StorageResult;

#[cfg(test)]
#[path = "map_storage_test.rs"]
mod map_storage_test;

#[derive(Debug, Default)]
pub struct MapStorage {
    map: RwLock<HashMap<DbKey, DbValue>>,
}

impl MapStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().expect("Poisoned storage lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the current contents, for inspection in tests and offline tools.
    pub fn snapshot(&self) -> HashMap<DbKey, DbValue> {
        self.map.read().expect("Poisoned storage lock").clone()
    }
}

#[async_trait]
impl Storage for MapStorage {
    async fn set_value(&self, key: DbKey, value: DbValue) -> StorageResult<()> {
        self.map.write().expect("Poisoned storage lock").insert(key, value);
        Ok(())
    }

    async fn get_value(&self, key: &DbKey) -> StorageResult<Option<DbValue>> {
        Ok(self.map.read().expect("Poisoned storage lock").get(key).cloned())
    }

    async fn del_value(&self, key: &DbKey) -> StorageResult<()> {
        self.map.write().expect("Poisoned storage lock").remove(key);
        Ok(())
    }

    async fn setnx_value(&self, key: DbKey, value: DbValue) -> StorageResult<bool> {
        let mut map = self.map.write().expect("Poisoned storage lock");
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, value);
        Ok(true)
    }
}
