//! The Pedersen hash is the dominant cost of a batch derivation, so it runs on blocking worker
//! threads, bounded by a semaphore sized from the `HASH_WORKERS` configuration key. The tree's
//! parallel recursion keeps the pool busy; everything else in the service stays on the
//! cooperative runtime.

use std::sync::Arc;

use async_trait::async_trait;
use committee_storage::hash::{Digest, HashFunction};
use committee_storage::HashError;
use starkex_crypto::pedersen::pedersen_hash_func;
use tokio::sync::Semaphore;
use tokio::task;

#[cfg(test)]
#[path = "hash_workers_test.rs"]
mod hash_workers_test;

pub struct PedersenHashWorkers {
    permits: Arc<Semaphore>,
}

impl PedersenHashWorkers {
    pub fn new(workers: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(workers)) }
    }
}

#[async_trait]
impl HashFunction for PedersenHashWorkers {
    async fn hash(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|error| HashError(format!("hash worker pool closed: {error}")))?;
        let (left, right) = (left.0, right.0);
        let digest = task::spawn_blocking(move || pedersen_hash_func(&left, &right))
            .await
            .map_err(|error| HashError(format!("hash worker failed: {error}")))?
            .map_err(|error| HashError(error.to_string()))?;
        Ok(Digest(digest))
    }
}
