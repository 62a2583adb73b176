use std::num::NonZeroUsize;
use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use super::CachedStorage;
use crate::map_storage::MapStorage;
use crate::storage_trait::{DbKey, DbValue, Storage};
use crate::StorageError;

fn value(byte: u8) -> DbValue {
    DbValue(vec![byte])
}

#[tokio::test]
async fn writes_reach_the_backing_storage() {
    let backing = Arc::new(MapStorage::new());
    let cached = CachedStorage::new(backing.clone(), NonZeroUsize::new(2).unwrap());

    cached.set_value(DbKey::from("a"), value(1)).await.unwrap();
    assert_eq!(backing.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    assert_eq!(cached.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
}

#[tokio::test]
async fn reads_are_served_from_the_cache_after_a_miss() {
    let backing = Arc::new(MapStorage::new());
    backing.set_value(DbKey::from("a"), value(1)).await.unwrap();
    let cached = CachedStorage::new(backing.clone(), NonZeroUsize::new(2).unwrap());

    assert_eq!(cached.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    // Items are immutable, so the cached copy keeps being served even after the backing store
    // forgets it.
    backing.del_value(&DbKey::from("a")).await.unwrap();
    assert_eq!(cached.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    assert_eq!(cached.get_value(&DbKey::from("missing")).await.unwrap(), None);
}

#[tokio::test]
async fn eviction_falls_back_to_the_backing_storage() {
    let backing = Arc::new(MapStorage::new());
    let cached = CachedStorage::new(backing.clone(), NonZeroUsize::new(1).unwrap());

    cached.set_value(DbKey::from("a"), value(1)).await.unwrap();
    cached.set_value(DbKey::from("b"), value(2)).await.unwrap();
    // "a" was evicted from the cache but survives in the backing storage.
    assert_eq!(cached.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
}

#[tokio::test]
async fn delete_is_unsupported() {
    let cached = CachedStorage::new(Arc::new(MapStorage::new()), NonZeroUsize::new(1).unwrap());
    assert_matches!(
        cached.del_value(&DbKey::from("a")).await,
        Err(StorageError::DeleteUnsupported)
    );
}
