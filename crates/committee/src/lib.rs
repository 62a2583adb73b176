//! A data-availability committee member service. For every new batch the operator produces, the
//! member fetches the state update, independently recomputes the authenticated-state roots from
//! its own trusted history, signs the availability claim, and submits the signature to the
//! availability gateway.

pub mod committee;
pub mod config;
pub mod custom_validation;
pub mod hash_workers;
pub mod signer;

pub use committee::{Committee, CommitteeBatchInfo, CommitteeError, CommitteeResult, StopSignal};
pub use config::{CommitteeConfig, ConfigError};
