//! Test doubles shared by the storage and tree test suites.

use async_trait::async_trait;
use sha2::{Digest as _, Sha256};

use crate::hash::{Digest, HashFunction};
use crate::HashError;

/// A cheap stand-in for the Pedersen hash: `sha256(left || right)`.
#[derive(Debug, Default)]
pub struct Sha256HashFunction;

#[async_trait]
impl HashFunction for Sha256HashFunction {
    async fn hash(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError> {
        let mut hasher = Sha256::new();
        hasher.update(left.0);
        hasher.update(right.0);
        Ok(Digest(hasher.finalize().into()))
    }
}
