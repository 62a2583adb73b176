use pretty_assertions::assert_eq;

use super::MapStorage;
use crate::storage_trait::{DbKey, DbValue, Storage};

#[tokio::test]
async fn set_get_delete() {
    let storage = MapStorage::new();
    let key = DbKey::from("key");
    assert_eq!(storage.get_value(&key).await.unwrap(), None);

    storage.set_value(key.clone(), DbValue(b"value".to_vec())).await.unwrap();
    assert_eq!(storage.get_value(&key).await.unwrap(), Some(DbValue(b"value".to_vec())));
    assert_eq!(storage.len(), 1);

    storage.set_value(key.clone(), DbValue(b"other".to_vec())).await.unwrap();
    assert_eq!(storage.get_value(&key).await.unwrap(), Some(DbValue(b"other".to_vec())));

    storage.del_value(&key).await.unwrap();
    assert_eq!(storage.get_value(&key).await.unwrap(), None);
    assert!(storage.is_empty());
    // Deleting a missing key is a no-op.
    storage.del_value(&key).await.unwrap();
}

#[tokio::test]
async fn setnx_writes_only_when_absent() {
    let storage = MapStorage::new();
    let key = DbKey::from("key");
    assert!(storage.setnx_value(key.clone(), DbValue(b"first".to_vec())).await.unwrap());
    assert!(!storage.setnx_value(key.clone(), DbValue(b"second".to_vec())).await.unwrap());
    assert_eq!(storage.get_value(&key).await.unwrap(), Some(DbValue(b"first".to_vec())));
}
