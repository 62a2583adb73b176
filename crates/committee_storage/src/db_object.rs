//! Database objects and facts. A fact is a DB object whose key is derived from the hash of its
//! value; once written it is immutable, which makes all fact writes idempotent and commutative.

use async_trait::async_trait;

use crate::hash::{Digest, HashFunction};
use crate::storage_trait::{DbKey, DbKeyPrefix, DbValue, Storage};
use crate::StorageResult;

pub trait DBObject: Sized {
    fn serialize(&self) -> DbValue;

    fn deserialize(value: &DbValue) -> StorageResult<Self>;

    /// Prefix of this object family's keys in the database.
    fn prefix() -> DbKeyPrefix;

    fn db_key(suffix: &[u8]) -> DbKey {
        Self::prefix().to_db_key(suffix)
    }
}

#[async_trait]
pub trait Fact: DBObject + Send + Sync {
    /// The content hash that addresses this fact.
    async fn hash(&self, hasher: &dyn HashFunction) -> StorageResult<Digest>;

    /// The storage key of the fact with the given content hash: `prefix:{hex_digest}`.
    fn fact_key(hash: &Digest) -> DbKey {
        Self::db_key(hash.to_hex().as_bytes())
    }

    /// Writes the fact and returns its content hash.
    async fn set_fact(
        &self,
        storage: &dyn Storage,
        hasher: &dyn HashFunction,
    ) -> StorageResult<Digest> {
        let hash = self.hash(hasher).await?;
        storage.set_value(Self::fact_key(&hash), self.serialize()).await?;
        Ok(hash)
    }

    async fn get_fact(storage: &dyn Storage, hash: &Digest) -> StorageResult<Option<Self>> {
        match storage.get_value(&Self::fact_key(hash)).await? {
            Some(value) => Ok(Some(Self::deserialize(&value)?)),
            None => Ok(None),
        }
    }
}
