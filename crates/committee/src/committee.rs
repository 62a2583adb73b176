//! The committee batch loop: a deterministic state machine that advances through batch ids,
//! derives the new state roots from the previously trusted batch, signs the availability claim,
//! submits the signature, and durably persists its progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use committee_gateway_client::{AvailabilityGateway, GatewayClientError};
use committee_storage::deferred_storage::DeferredStorage;
use committee_storage::hash::{Digest, HashFunction};
use committee_storage::storage_trait::{DbKey, DbValue, Storage};
use committee_storage::StorageError;
use futures::try_join;
use serde::{Deserialize, Serialize};
use starkex_merkle::{MerkleError, MerkleTree};
use starkex_objects::availability::{BatchId, CommitteeSignature, StateUpdate};
use starkex_objects::availability_claim::hash_availability_claim;
use starkex_objects::state::{OrderStateFact, VaultStateFact};
use tracing::{error, info, warn};

use crate::config::CommitteeConfig;
use crate::custom_validation::CustomValidator;
use crate::signer::{ClaimSigner, SignerError};

#[cfg(test)]
#[path = "committee_test.rs"]
mod committee_test;

fn next_batch_id_key() -> DbKey {
    DbKey::from("committee_next_batch_id")
}

fn committee_batch_info_key(batch_id: BatchId) -> DbKey {
    DbKey(format!("committee_batch_info:{batch_id}").into_bytes())
}

/// The roots and sequence number of a validated batch. Written once per batch and never
/// updated; the entry of batch `-1` describes the initial empty state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeBatchInfo {
    pub vaults_root: Digest,
    pub orders_root: Digest,
    pub sequence_number: i64,
}

impl CommitteeBatchInfo {
    fn to_db_value(&self) -> DbValue {
        DbValue(serde_json::to_vec(self).expect("Serializing batch info cannot fail"))
    }

    fn from_db_value(value: &DbValue) -> Result<Self, StorageError> {
        serde_json::from_slice(&value.0)
            .map_err(|error| StorageError::MalformedValue(format!("batch info: {error}")))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CommitteeError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    #[error(transparent)]
    GatewayClient(#[from] GatewayClientError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("Prev batch not found for batch_id {0}.")]
    MissingPrevBatchInfo(BatchId),
    #[error("{tree} root mismatch for batch {batch_id}: expected {expected}, computed {computed}.")]
    RootMismatch { tree: &'static str, batch_id: BatchId, expected: Digest, computed: Digest },
    #[error("Third party validation failed for batch {0}.")]
    CustomValidationFailed(BatchId),
    #[error(
        "validate_orders is enabled, but the configured trades height {configured} differs from \
         the availability gateway's ({gateway}). The order root was computed against the wrong \
         height and the claim would not be approved, so there is no point in signing."
    )]
    TradesHeightMismatch { configured: usize, gateway: usize },
    #[error("Sequence number {0} is outside the signable range.")]
    InvalidSequenceNumber(i64),
}

pub type CommitteeResult<T> = Result<T, CommitteeError>;

/// A handle that asks the loop to stop. The flag is examined at the top of each iteration; an
/// in-flight iteration runs to completion.
#[derive(Clone)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub struct Committee {
    storage: Arc<dyn Storage>,
    merkle_storage: Arc<dyn Storage>,
    hasher: Arc<dyn HashFunction>,
    availability_gateway: Arc<dyn AvailabilityGateway>,
    validator: Arc<dyn CustomValidator>,
    signer: ClaimSigner,
    vaults_merkle_height: usize,
    orders_merkle_height: usize,
    polling_interval: Duration,
    validate_orders: bool,
    stopped: Arc<AtomicBool>,
}

impl Committee {
    pub fn new(
        config: &CommitteeConfig,
        private_key: &str,
        storage: Arc<dyn Storage>,
        merkle_storage: Arc<dyn Storage>,
        hasher: Arc<dyn HashFunction>,
        availability_gateway: Arc<dyn AvailabilityGateway>,
        validator: Arc<dyn CustomValidator>,
    ) -> CommitteeResult<Self> {
        if config.validate_orders {
            info!("Full validation mode enabled: validating both vaults and orders.");
        } else {
            info!("Validating only vault data-availability.");
        }
        Ok(Self {
            storage,
            merkle_storage,
            hasher,
            availability_gateway,
            validator,
            signer: ClaimSigner::new(private_key)?,
            vaults_merkle_height: config.vaults_merkle_height,
            orders_merkle_height: config.orders_merkle_height,
            polling_interval: config.polling_interval,
            validate_orders: config.validate_orders,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn stop_signal(&self) -> StopSignal {
        StopSignal(self.stopped.clone())
    }

    /// Computes and stores the batch info of the initial empty state: both trees fully empty,
    /// sequence number `-1`.
    async fn compute_initial_batch_info(&self) -> CommitteeResult<()> {
        let deferred = Arc::new(DeferredStorage::new(self.merkle_storage.clone()));
        let scoped: Arc<dyn Storage> = deferred.clone();
        let empty_vault_fact = VaultStateFact::empty();
        let empty_order_fact = OrderStateFact::empty();
        let (vaults_tree, orders_tree) = try_join!(
            MerkleTree::empty_tree(
                self.vaults_merkle_height,
                scoped.clone(),
                self.hasher.clone(),
                &empty_vault_fact,
            ),
            MerkleTree::empty_tree(
                self.orders_merkle_height,
                scoped.clone(),
                self.hasher.clone(),
                &empty_order_fact,
            ),
        )?;
        deferred.commit().await?;

        let initial_batch_info = CommitteeBatchInfo {
            vaults_root: vaults_tree.root(),
            orders_root: orders_tree.root(),
            sequence_number: -1,
        };
        self.storage
            .set_value(committee_batch_info_key(BatchId::GENESIS), initial_batch_info.to_db_value())
            .await?;
        Ok(())
    }

    async fn batch_info(&self, batch_id: BatchId) -> CommitteeResult<Option<CommitteeBatchInfo>> {
        match self.storage.get_value(&committee_batch_info_key(batch_id)).await? {
            None => Ok(None),
            Some(value) => Ok(Some(CommitteeBatchInfo::from_db_value(&value)?)),
        }
    }

    /// Verifies data availability of one batch by recomputing the roots for it on top of the
    /// trusted predecessor, stores the new batch info, and returns the signature and claim hash
    /// to submit.
    ///
    /// All tree facts are derived inside a deferred-write cache that only flushes once the
    /// recomputed roots match the operator's claim, so a mismatch persists nothing.
    pub async fn validate_data_availability(
        &self,
        batch_id: BatchId,
        state_update: &StateUpdate,
        validate_orders: bool,
    ) -> CommitteeResult<(String, String)> {
        let prev_batch_info = self
            .batch_info(state_update.prev_batch_id)
            .await?
            .ok_or(CommitteeError::MissingPrevBatchInfo(state_update.prev_batch_id))?;

        info!("Processing batch {batch_id}");
        info!("Using batch {} as reference", state_update.prev_batch_id);

        let deferred = Arc::new(DeferredStorage::new(self.merkle_storage.clone()));
        let scoped: Arc<dyn Storage> = deferred.clone();

        let compute_vault_root = || async {
            let tree = MerkleTree::new(
                prev_batch_info.vaults_root,
                self.vaults_merkle_height,
                scoped.clone(),
                self.hasher.clone(),
            )?;
            let modifications: Vec<(u64, VaultStateFact)> =
                state_update.vaults.iter().map(|(id, vault)| (*id, vault.clone())).collect();
            CommitteeResult::Ok(tree.update(modifications).await?.root())
        };
        let compute_order_root = || async {
            let tree = MerkleTree::new(
                prev_batch_info.orders_root,
                self.orders_merkle_height,
                scoped.clone(),
                self.hasher.clone(),
            )?;
            let modifications: Vec<(u64, OrderStateFact)> =
                state_update.orders.iter().map(|(id, order)| (*id, order.clone())).collect();
            CommitteeResult::Ok(tree.update(modifications).await?.root())
        };

        let check = |tree: &'static str, expected: Digest, computed: Digest| {
            if computed == expected {
                Ok(())
            } else {
                Err(CommitteeError::RootMismatch { tree, batch_id, expected, computed })
            }
        };

        if validate_orders {
            let (vault_root, order_root) = try_join!(compute_vault_root(), compute_order_root())?;
            check("vault", state_update.vault_root, vault_root)?;
            check("order", state_update.order_root, order_root)?;
            info!("Verified vault root: 0x{}", state_update.vault_root);
            info!("Verified order root: 0x{}", state_update.order_root);
        } else {
            let vault_root = compute_vault_root().await?;
            check("vault", state_update.vault_root, vault_root)?;
            info!("Verified vault root: 0x{}", state_update.vault_root);
            info!("Blindly signing order root: 0x{}", state_update.order_root);
        }
        deferred.commit().await?;

        let batch_info = CommitteeBatchInfo {
            vaults_root: state_update.vault_root,
            orders_root: state_update.order_root,
            sequence_number: prev_batch_info.sequence_number + 1,
        };
        self.storage
            .set_value(committee_batch_info_key(batch_id), batch_info.to_db_value())
            .await?;

        let trades_height = self.trades_height(validate_orders).await?;

        info!("Signing batch with sequence number {}", batch_info.sequence_number);
        let sequence_number = u64::try_from(batch_info.sequence_number)
            .map_err(|_| CommitteeError::InvalidSequenceNumber(batch_info.sequence_number))?;
        let claim_hash = hash_availability_claim(
            &batch_info.vaults_root,
            self.vaults_merkle_height,
            &batch_info.orders_root,
            trades_height,
            sequence_number,
        );
        let signature = self.signer.sign_claim(&claim_hash)?;
        Ok((signature, hex::encode(claim_hash)))
    }

    /// The order-tree height to sign against. Normally the configured one; a gateway exposing
    /// `order_tree_height` overrides it, which is only sound when the order root is taken on
    /// trust from that same gateway. Gateways without the endpoint answer with an HTTP error,
    /// meaning no override.
    async fn trades_height(&self, validate_orders: bool) -> CommitteeResult<usize> {
        info!("Trying to fetch trades height from the availability gateway");
        match self.availability_gateway.order_tree_height().await {
            Ok(gateway_height) => {
                info!(
                    "Trades height received from the availability gateway is {gateway_height}. \
                     The trades height which is defined in the config is {}.",
                    self.orders_merkle_height
                );
                if gateway_height != self.orders_merkle_height && validate_orders {
                    return Err(CommitteeError::TradesHeightMismatch {
                        configured: self.orders_merkle_height,
                        gateway: gateway_height,
                    });
                }
                Ok(gateway_height)
            }
            Err(GatewayClientError::BadStatus { .. }) => Ok(self.orders_merkle_height),
            Err(error) => Err(error.into()),
        }
    }

    /// One pass over the current batch id: fetch, validate, sign, submit, advance. Returns the
    /// batch id the next iteration should work on.
    async fn run_one_iteration(&self, next_batch_id: BatchId) -> CommitteeResult<BatchId> {
        let Some(state_update) =
            self.availability_gateway.get_batch_data(next_batch_id).await?
        else {
            info!("Waiting for batch {next_batch_id}");
            tokio::time::sleep(self.polling_interval).await;
            return Ok(next_batch_id);
        };

        if !self.validator.is_valid(&state_update, next_batch_id).await {
            return Err(CommitteeError::CustomValidationFailed(next_batch_id));
        }

        let (signature, claim_hash) = self
            .validate_data_availability(next_batch_id, &state_update, self.validate_orders)
            .await?;
        self.availability_gateway
            .send_signature(CommitteeSignature {
                batch_id: next_batch_id,
                signature,
                member_key: self.signer.address().to_string(),
                claim_hash,
            })
            .await?;

        let advanced = next_batch_id.next();
        self.storage.set_int(next_batch_id_key(), advanced.0).await?;
        Ok(advanced)
    }

    /// On the very first run there is no progress pointer: compute the genesis batch info and
    /// point at batch 0.
    async fn initialize(&self) -> CommitteeResult<BatchId> {
        match self.storage.get_int(&next_batch_id_key()).await? {
            Some(value) => Ok(BatchId(value)),
            None => {
                self.compute_initial_batch_info().await?;
                self.storage.set_int(next_batch_id_key(), 0).await?;
                Ok(BatchId(0))
            }
        }
    }

    /// The batch loop. Every failure within an iteration is logged and retried with the same
    /// batch id after `polling_interval`; nothing but a successful submission advances the
    /// pointer. Initialization failures are fatal: if the member cannot even establish its
    /// genesis state, there is nothing sensible to retry.
    pub async fn run(&self) -> CommitteeResult<()> {
        let mut next_batch_id = self.initialize().await?;
        info!("Committee member started; next batch id is {next_batch_id}.");

        while !self.stopped.load(Ordering::Relaxed) {
            next_batch_id = match self.run_one_iteration(next_batch_id).await {
                Ok(batch_id) => batch_id,
                Err(error) => {
                    log_iteration_error(&error, next_batch_id);
                    tokio::time::sleep(self.polling_interval).await;
                    next_batch_id
                }
            };
        }
        info!("Committee member stopped.");
        Ok(())
    }
}

/// Data-integrity and protocol failures log at ERROR so operators notice a malicious or
/// bug-ridden operator; everything else is transient noise.
fn log_iteration_error(error: &CommitteeError, batch_id: BatchId) {
    match error {
        CommitteeError::RootMismatch { .. }
        | CommitteeError::MissingPrevBatchInfo(_)
        | CommitteeError::TradesHeightMismatch { .. }
        | CommitteeError::InvalidSequenceNumber(_)
        | CommitteeError::GatewayClient(GatewayClientError::SignatureNotAccepted { .. }) => {
            error!("Failed to process batch {batch_id}: {error}");
        }
        CommitteeError::Storage(_)
        | CommitteeError::Merkle(_)
        | CommitteeError::GatewayClient(_)
        | CommitteeError::Signer(_)
        | CommitteeError::CustomValidationFailed(_) => {
            warn!("Got an error while processing batch {batch_id}: {error}");
        }
    }
}
