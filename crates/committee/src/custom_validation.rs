//! Third-party validation hook, applied to every state update before the member signs it.

use async_trait::async_trait;
use starkex_objects::availability::{BatchId, StateUpdate};

/// A predicate third parties can supply to veto state updates. A `false` answer is treated as a
/// transient failure: the batch is retried, never skipped.
#[async_trait]
pub trait CustomValidator: Send + Sync {
    async fn is_valid(&self, state_update: &StateUpdate, batch_id: BatchId) -> bool;
}

/// The default hook: every update passes.
#[derive(Debug, Default)]
pub struct AcceptAll;

#[async_trait]
impl CustomValidator for AcceptAll {
    async fn is_valid(&self, _state_update: &StateUpdate, _batch_id: BatchId) -> bool {
        true
    }
}
