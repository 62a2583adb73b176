//! The member's claim signer: a local Ethereum key signing the 32-byte availability-claim
//! digest. The resulting 65-byte `r || s || v` signature is what the settlement contract
//! `ecrecover`s, and the member's address is its public identifier towards the gateway.
//!
//! The nonce derivation is deterministic (RFC 6979), so re-deriving a previously signed batch
//! reproduces the identical signature.

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

#[cfg(test)]
#[path = "signer_test.rs"]
mod signer_test;

#[derive(thiserror::Error, Debug)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("Failed to sign the claim: {0}")]
    Signing(String),
}

pub struct ClaimSigner {
    signer: PrivateKeySigner,
}

impl ClaimSigner {
    pub fn new(private_key_hex: &str) -> Result<Self, SignerError> {
        let signer = private_key_hex
            .trim()
            .parse()
            .map_err(|error: alloy::signers::local::LocalSignerError| {
                SignerError::InvalidPrivateKey(error.to_string())
            })?;
        Ok(Self { signer })
    }

    /// The member's public identifier.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs the claim digest, returning the 0x-prefixed hex of `r || s || v` with
    /// `v ∈ {27, 28}`.
    pub fn sign_claim(&self, claim_hash: &[u8; 32]) -> Result<String, SignerError> {
        let signature = self
            .signer
            .sign_hash_sync(&B256::from(*claim_hash))
            .map_err(|error| SignerError::Signing(error.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}
