//! The Pedersen node-hash behind the generic [`HashFunction`] interface.

use async_trait::async_trait;
use committee_storage::hash::{Digest, HashFunction};
use committee_storage::HashError;
use starkex_crypto::pedersen::pedersen_hash_func;

/// Computes the Pedersen hash inline, on the calling task. The committee service wraps the same
/// computation in a blocking-worker pool; this direct form serves tools and tests.
#[derive(Debug, Default)]
pub struct PedersenHashFunction;

#[async_trait]
impl HashFunction for PedersenHashFunction {
    async fn hash(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError> {
        pedersen_hash_func(&left.0, &right.0)
            .map(Digest)
            .map_err(|error| HashError(error.to_string()))
    }
}
