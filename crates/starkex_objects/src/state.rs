//! The two leaf-fact families of the authenticated state: vault states in the vault tree and
//! order states in the order tree.

use async_trait::async_trait;
use committee_storage::db_object::{DBObject, Fact};
use committee_storage::hash::{Digest, HashFunction, HASH_BYTES};
use committee_storage::storage_trait::{DbKeyPrefix, DbValue};
use committee_storage::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use starkex_crypto::FieldElement;

use crate::serde_utils::u64_as_str;
use crate::StateError;

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

/// Exclusive upper bound on balances and fulfilled amounts.
pub const MAX_AMOUNT: u64 = 1 << 63;

fn u64_digest(value: u64) -> Digest {
    let mut bytes = [0_u8; HASH_BYTES];
    bytes[HASH_BYTES - 8..].copy_from_slice(&value.to_be_bytes());
    Digest(bytes)
}

/// The state of one vault: who owns how much of which token.
///
/// Normalized so that the representation of a given balance sheet is unique: an empty vault has
/// a zero stark key and token, and a non-empty vault must name both. The invariants hold for
/// deserialized values too, so no unnormalized leaf ever gets hashed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVaultState")]
pub struct VaultStateFact {
    pub stark_key: FieldElement,
    pub token: FieldElement,
    #[serde(with = "u64_as_str")]
    pub balance: u64,
}

impl VaultStateFact {
    pub fn new(stark_key: FieldElement, token: FieldElement, balance: u64) -> Result<Self, StateError> {
        if balance >= MAX_AMOUNT {
            return Err(StateError::OutOfRangeBalance(balance));
        }
        if balance == 0 {
            return Ok(Self { stark_key: FieldElement::zero(), token: FieldElement::zero(), balance });
        }
        if stark_key.is_zero() {
            return Err(StateError::NonEmptyVaultWithEmptyStarkKey);
        }
        if token.is_zero() {
            return Err(StateError::NonEmptyVaultWithEmptyToken);
        }
        Ok(Self { stark_key, token, balance })
    }

    pub fn empty() -> Self {
        Self { stark_key: FieldElement::zero(), token: FieldElement::zero(), balance: 0 }
    }
}

#[derive(Deserialize)]
struct RawVaultState {
    stark_key: FieldElement,
    token: FieldElement,
    #[serde(with = "u64_as_str")]
    balance: u64,
}

impl TryFrom<RawVaultState> for VaultStateFact {
    type Error = StateError;

    fn try_from(raw: RawVaultState) -> Result<Self, Self::Error> {
        Self::new(raw.stark_key, raw.token, raw.balance)
    }
}

impl DBObject for VaultStateFact {
    fn serialize(&self) -> DbValue {
        DbValue(serde_json::to_vec(self).expect("Serializing a vault state cannot fail"))
    }

    fn deserialize(value: &DbValue) -> StorageResult<Self> {
        serde_json::from_slice(&value.0)
            .map_err(|error| StorageError::MalformedValue(format!("vault state: {error}")))
    }

    fn prefix() -> DbKeyPrefix {
        DbKeyPrefix("vault_state")
    }
}

#[async_trait]
impl Fact for VaultStateFact {
    /// `H(H(stark_key, token), balance)`.
    async fn hash(&self, hasher: &dyn HashFunction) -> StorageResult<Digest> {
        let key_and_token = hasher
            .hash(&Digest(self.stark_key.to_bytes_be()), &Digest(self.token.to_bytes_be()))
            .await?;
        Ok(hasher.hash(&key_and_token, &u64_digest(self.balance)).await?)
    }
}

/// The fulfilled amount of one order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOrderState")]
pub struct OrderStateFact {
    #[serde(with = "u64_as_str")]
    pub fulfilled_amount: u64,
}

impl OrderStateFact {
    pub fn new(fulfilled_amount: u64) -> Result<Self, StateError> {
        if fulfilled_amount >= MAX_AMOUNT {
            return Err(StateError::OutOfRangeFulfilledAmount(fulfilled_amount));
        }
        Ok(Self { fulfilled_amount })
    }

    pub fn empty() -> Self {
        Self { fulfilled_amount: 0 }
    }
}

#[derive(Deserialize)]
struct RawOrderState {
    #[serde(with = "u64_as_str")]
    fulfilled_amount: u64,
}

impl TryFrom<RawOrderState> for OrderStateFact {
    type Error = StateError;

    fn try_from(raw: RawOrderState) -> Result<Self, Self::Error> {
        Self::new(raw.fulfilled_amount)
    }
}

impl DBObject for OrderStateFact {
    fn serialize(&self) -> DbValue {
        DbValue(serde_json::to_vec(self).expect("Serializing an order state cannot fail"))
    }

    fn deserialize(value: &DbValue) -> StorageResult<Self> {
        serde_json::from_slice(&value.0)
            .map_err(|error| StorageError::MalformedValue(format!("order state: {error}")))
    }

    fn prefix() -> DbKeyPrefix {
        DbKeyPrefix("order_state")
    }
}

#[async_trait]
impl Fact for OrderStateFact {
    /// The 32-byte big-endian fulfilled amount, used directly; order leaves are not
    /// Pedersen-hashed.
    async fn hash(&self, _hasher: &dyn HashFunction) -> StorageResult<Digest> {
        Ok(u64_digest(self.fulfilled_amount))
    }
}
