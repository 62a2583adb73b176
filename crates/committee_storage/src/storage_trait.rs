//! The base storage interface: an async mapping from opaque byte keys to opaque byte values,
//! with batch operations, optional set-if-absent, and int/str conveniences for the small mutable
//! records the committee keeps.

use async_trait::async_trait;

use crate::{StorageError, StorageResult};

#[cfg(test)]
#[path = "storage_trait_test.rs"]
mod storage_trait_test;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbKey(pub Vec<u8>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbValue(pub Vec<u8>);

impl From<&str> for DbKey {
    fn from(key: &str) -> Self {
        Self(key.as_bytes().to_vec())
    }
}

/// The domain prefix of a key family, e.g. `merkle_node` or `vault_state`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DbKeyPrefix(pub &'static str);

impl DbKeyPrefix {
    pub fn to_db_key(self, suffix: &[u8]) -> DbKey {
        DbKey([self.0.as_bytes(), b":", suffix].concat())
    }
}

/// The suffix of `key`, if it belongs to the given prefix family.
pub fn try_extract_suffix_from_db_key<'a>(key: &'a DbKey, prefix: &DbKeyPrefix) -> Option<&'a [u8]> {
    let prefixed = [prefix.0.as_bytes(), b":"].concat();
    key.0.strip_prefix(prefixed.as_slice())
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn set_value(&self, key: DbKey, value: DbValue) -> StorageResult<()>;

    async fn get_value(&self, key: &DbKey) -> StorageResult<Option<DbValue>>;

    async fn del_value(&self, key: &DbKey) -> StorageResult<()>;

    /// Sets the value only if the key is absent; returns whether the write happened.
    async fn setnx_value(&self, _key: DbKey, _value: DbValue) -> StorageResult<bool> {
        Err(StorageError::SetnxUnsupported)
    }

    async fn mset(&self, updates: Vec<(DbKey, DbValue)>) -> StorageResult<()> {
        for (key, value) in updates {
            self.set_value(key, value).await?;
        }
        Ok(())
    }

    async fn mget(&self, keys: &[DbKey]) -> StorageResult<Vec<Option<DbValue>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_value(key).await?);
        }
        Ok(values)
    }

    async fn set_int(&self, key: DbKey, value: i64) -> StorageResult<()> {
        self.set_value(key, DbValue(value.to_string().into_bytes())).await
    }

    async fn get_int(&self, key: &DbKey) -> StorageResult<Option<i64>> {
        match self.get_value(key).await? {
            None => Ok(None),
            Some(value) => parse_ascii(&value)?
                .parse()
                .map(Some)
                .map_err(|error| StorageError::MalformedValue(format!("not a decimal integer: {error}"))),
        }
    }

    async fn set_str(&self, key: DbKey, value: &str) -> StorageResult<()> {
        self.set_value(key, DbValue(value.as_bytes().to_vec())).await
    }

    async fn get_str(&self, key: &DbKey) -> StorageResult<Option<String>> {
        match self.get_value(key).await? {
            None => Ok(None),
            Some(value) => Ok(Some(parse_ascii(&value)?.to_owned())),
        }
    }
}

fn parse_ascii(value: &DbValue) -> StorageResult<&str> {
    std::str::from_utf8(&value.0)
        .map_err(|error| StorageError::MalformedValue(format!("not valid UTF-8: {error}")))
}
