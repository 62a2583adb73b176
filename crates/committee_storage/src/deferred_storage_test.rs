use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::DeferredStorage;
use crate::map_storage::MapStorage;
use crate::storage_trait::{DbKey, DbValue, Storage};

fn value(byte: u8) -> DbValue {
    DbValue(vec![byte])
}

#[tokio::test]
async fn writes_are_buffered_until_commit() {
    let backing = Arc::new(MapStorage::new());
    let deferred = DeferredStorage::new(backing.clone());

    deferred.set_value(DbKey::from("a"), value(1)).await.unwrap();
    deferred.set_value(DbKey::from("b"), value(2)).await.unwrap();
    // Visible through the overlay, invisible underneath.
    assert_eq!(deferred.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    assert!(backing.is_empty());

    deferred.commit().await.unwrap();
    assert_eq!(backing.len(), 2);
    assert_eq!(backing.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    assert_eq!(backing.get_value(&DbKey::from("b")).await.unwrap(), Some(value(2)));
}

#[tokio::test]
async fn dropping_without_commit_discards_the_overlay() {
    let backing = Arc::new(MapStorage::new());
    {
        let deferred = DeferredStorage::new(backing.clone());
        deferred.set_value(DbKey::from("a"), value(1)).await.unwrap();
    }
    assert!(backing.is_empty());
}

#[tokio::test]
async fn reads_fall_through_and_populate_the_overlay() {
    let backing = Arc::new(MapStorage::new());
    backing.set_value(DbKey::from("a"), value(1)).await.unwrap();
    let deferred = DeferredStorage::new(backing.clone());

    assert_eq!(deferred.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    // The miss populated the overlay; later reads do not depend on the backing storage.
    backing.del_value(&DbKey::from("a")).await.unwrap();
    assert_eq!(deferred.get_value(&DbKey::from("a")).await.unwrap(), Some(value(1)));
    assert_eq!(deferred.get_value(&DbKey::from("missing")).await.unwrap(), None);
}

#[tokio::test]
async fn commit_is_idempotent_on_an_empty_overlay() {
    let backing = Arc::new(MapStorage::new());
    let deferred = DeferredStorage::new(backing.clone());
    deferred.set_value(DbKey::from("a"), value(1)).await.unwrap();
    deferred.commit().await.unwrap();
    deferred.commit().await.unwrap();
    assert_eq!(backing.len(), 1);
}
