//! The 32-byte hash digest facts and Merkle nodes are addressed by, and the async node-hash
//! interface the trees consume.

use std::fmt;

use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::HashError;

/// Number of bytes in a hash digest.
pub const HASH_BYTES: usize = 32;

/// The 32-byte big-endian encoding of a field element. The high four bits are always zero
/// because the field prime is below `2^252`.
///
/// Serializes to unprefixed lowercase hex, the form roots take on the wire and in storage.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; HASH_BYTES]);

impl Digest {
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parses the unprefixed 64-character lowercase hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        if hex_str.len() != 2 * HASH_BYTES || hex_str.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(format!("Expected {} lowercase hex characters, got: {hex_str:?}.", 2 * HASH_BYTES));
        }
        let bytes = hex::decode(hex_str).map_err(|error| error.to_string())?;
        Ok(Self(bytes.try_into().expect("Length was checked above")))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(D::Error::custom)
    }
}

/// The binary digest hash combining two child digests into a parent digest.
///
/// Implementations may dispatch to a worker pool; a failed dispatch surfaces as a [`HashError`].
#[async_trait]
pub trait HashFunction: Send + Sync {
    async fn hash(&self, left: &Digest, right: &Digest) -> Result<Digest, HashError>;
}
