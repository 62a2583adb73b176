//! Wire objects exchanged with the availability gateway.

use std::collections::HashMap;
use std::fmt;

use committee_storage::hash::Digest;
use serde::{Deserialize, Serialize};

use crate::state::{OrderStateFact, VaultStateFact};

#[cfg(test)]
#[path = "availability_test.rs"]
mod availability_test;

/// Identifier of an L2 batch. The id `-1` denotes the initial empty state.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BatchId(pub i64);

impl BatchId {
    pub const GENESIS: BatchId = BatchId(-1);

    pub fn next(self) -> BatchId {
        BatchId(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The information describing a state update: the leaves that change relative to
/// `prev_batch_id`, and the roots the operator claims they produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Vault id to new vault state, for the changed vaults only.
    pub vaults: HashMap<u64, VaultStateFact>,
    /// Order id to new order state, for the changed orders only.
    pub orders: HashMap<u64, OrderStateFact>,
    /// Expected vault root after the update.
    pub vault_root: Digest,
    /// Expected order root after the update.
    pub order_root: Digest,
    pub prev_batch_id: BatchId,
}

/// The gateway's answer to `get_batch_data`; `update` is null while the batch does not exist
/// yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDataResponse {
    pub update: Option<StateUpdate>,
}

/// One committee member's signature over one batch's availability claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeSignature {
    pub batch_id: BatchId,
    pub signature: String,
    /// The member's public identifier, used by the gateway to attribute the signature.
    pub member_key: String,
    /// The claim being signed, for the gateway to cross-check expectations.
    pub claim_hash: String,
}
