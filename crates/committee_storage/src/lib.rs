//! Key-value storage abstractions for the committee: an opaque byte-oriented [`Storage`] trait,
//! content-addressed [`Fact`] objects, and the in-memory, cached and deferred-write backends.
//!
//! [`Storage`]: storage_trait::Storage
//! [`Fact`]: db_object::Fact

pub mod cached_storage;
pub mod db_object;
pub mod deferred_storage;
pub mod hash;
pub mod map_storage;
pub mod storage_trait;
#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Malformed value in storage: {0}")]
    MalformedValue(String),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("This storage does not implement setnx.")]
    SetnxUnsupported,
    #[error("This storage handles only immutable items and does not implement delete.")]
    DeleteUnsupported,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of the (possibly pooled) node-hash computation. Transient from the committee's point
/// of view: the batch derivation is retried.
#[derive(thiserror::Error, Debug)]
#[error("Hash computation failed: {0}")]
pub struct HashError(pub String);
