//! The StarkEx state objects the committee attests to: the two leaf-fact families of the
//! authenticated state, the state-update and signature wire objects, and the availability claim
//! binding the state commitments to a sequence number.

pub mod availability;
pub mod availability_claim;
pub mod hashing;
pub mod serde_utils;
pub mod state;

/// Validation failures of state leaves. These guard the canonical leaf forms: a rejected leaf
/// never reaches hashing or storage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Balance {0} is out of range.")]
    OutOfRangeBalance(u64),
    #[error("A non empty vault cannot have an empty stark key.")]
    NonEmptyVaultWithEmptyStarkKey,
    #[error("A non empty vault cannot have an empty token.")]
    NonEmptyVaultWithEmptyToken,
    #[error("Fulfilled amount {0} is out of range.")]
    OutOfRangeFulfilledAmount(u64),
}
