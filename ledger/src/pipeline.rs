//! # Docket Pipeline
//!
//! SELECT -> BUILD -> SIGN -> COMMIT. One build cycle drains up to a
//! docketful of transactions from a register's mempool, assembles the
//! docket, gets it signed by the designated validator's wallet, writes it
//! durably, and only then touches the mempool.
//!
//! ## The one rule that matters
//!
//! Nothing destructive happens before the durable write confirms. The
//! mempool is *peeked*, never popped; a failure at any stage (signing,
//! timeout, write exhaustion) discards the in-memory docket and leaves
//! every transaction exactly where it was. The retry story is therefore
//! trivial: just build again.
//!
//! ## Concurrency
//!
//! At most one build per register is in flight, enforced by the entry's
//! `try_lock` build slot -- a second trigger gets `BuildInProgress`
//! immediately instead of queueing. Intake keeps running during a build;
//! transactions accepted mid-build simply miss this docket and catch the
//! next one. Builds on different registers never serialize against each
//! other.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::clients::{PeerClient, RegisterClient, ValidatorInfo, WalletClient};
use crate::config::{
    COLLABORATOR_TIMEOUT, MAX_TRANSACTIONS_PER_DOCKET, SIGNING_ALGORITHM, WRITE_RETRY_ATTEMPTS,
    WRITE_RETRY_BACKOFF,
};
use crate::docket::{Docket, DocketSignature};
use crate::registry::{RegisterDirectory, RegisterEntry};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Build-cycle failures. `Signing` and `Write` are guaranteed
/// non-destructive: the mempool is untouched and the next build starts
/// clean.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("register {0} does not exist")]
    UnknownRegister(String),

    #[error("register {0} is not active")]
    RegisterNotActive(String),

    #[error("a build is already in flight for this register")]
    BuildInProgress,

    #[error("no active validators available for this register")]
    NoActiveValidators,

    #[error("docket signing failed: {0}")]
    Signing(String),

    #[error("durable docket write failed: {0}")]
    Write(String),

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Configuration & outcomes
// ---------------------------------------------------------------------------

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Batch ceiling per docket.
    pub max_transactions_per_docket: usize,

    /// Deadline for each peer/wallet/register call. Expiry counts as a
    /// failure of that stage.
    pub collaborator_timeout: Duration,

    /// Durable-write attempts before giving up.
    pub write_retry_attempts: u32,

    /// Base backoff between write attempts; doubles each retry.
    pub write_retry_backoff: Duration,

    /// This node's validator identity. Preferred as the designated signer
    /// when it appears in the active set.
    pub local_validator_id: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_docket: MAX_TRANSACTIONS_PER_DOCKET,
            collaborator_timeout: COLLABORATOR_TIMEOUT,
            write_retry_attempts: WRITE_RETRY_ATTEMPTS,
            write_retry_backoff: WRITE_RETRY_BACKOFF,
            local_validator_id: None,
        }
    }
}

/// Result of a build trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The mempool was empty. Nothing happened, nothing failed.
    NoPendingTransactions,
    /// A docket was durably committed.
    Committed(CommittedDocket),
}

/// Summary of a committed docket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedDocket {
    pub docket_number: u64,
    pub merkle_root: String,
    pub previous_docket_hash: String,
    pub transaction_count: usize,
    pub transaction_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// DocketPipeline
// ---------------------------------------------------------------------------

/// Drives build cycles against the injected collaborators.
pub struct DocketPipeline {
    directory: Arc<RegisterDirectory>,
    peers: Arc<dyn PeerClient>,
    wallet: Arc<dyn WalletClient>,
    register_client: Arc<dyn RegisterClient>,
    config: PipelineConfig,
}

impl DocketPipeline {
    pub fn new(
        directory: Arc<RegisterDirectory>,
        peers: Arc<dyn PeerClient>,
        wallet: Arc<dyn WalletClient>,
        register_client: Arc<dyn RegisterClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            directory,
            peers,
            wallet,
            register_client,
            config,
        }
    }

    /// Runs one full build cycle for a register.
    pub async fn build_docket(&self, register_id: &str) -> Result<BuildOutcome, PipelineError> {
        let entry = self
            .directory
            .get(register_id)
            .ok_or_else(|| PipelineError::UnknownRegister(register_id.to_string()))?;

        if !entry.is_active() {
            return Err(PipelineError::RegisterNotActive(register_id.to_string()));
        }

        // Claim the build slot or bail. Holding it for the whole cycle is
        // what makes docket numbering gap-free.
        let _slot = entry
            .build_slot
            .try_lock()
            .map_err(|_| PipelineError::BuildInProgress)?;

        // SELECT: non-destructive snapshot in drain order.
        let batch = entry.mempool.peek(self.config.max_transactions_per_docket);
        if batch.is_empty() {
            debug!(register_id, "mempool empty, skipping build");
            return Ok(BuildOutcome::NoPendingTransactions);
        }

        // The chain mutex is held until commit so the tip we link against
        // is the tip we advance.
        let mut tip = entry.chain.lock().await;
        let docket_number = tip.docket_number + 1;

        // BUILD.
        let mut docket = Docket::build(register_id, docket_number, &tip.docket_hash, &batch)
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        info!(
            register_id,
            docket_number,
            transactions = docket.transaction_count(),
            merkle_root = %docket.merkle_root,
            "docket assembled"
        );

        // SIGN. Failure of any flavor discards the docket; the peeked
        // transactions were never removed.
        let signature = match self.sign_docket(register_id, &docket).await {
            Ok(sig) => sig,
            Err(e) => {
                docket.mark_failed();
                warn!(register_id, docket_number, error = %e, "docket discarded at signing");
                return Err(e);
            }
        };
        docket.attach_signature(signature);

        // COMMIT.
        if let Err(e) = self.write_with_retries(register_id, &docket).await {
            docket.mark_failed();
            error!(register_id, docket_number, error = %e, "docket discarded at write");
            return Err(e);
        }
        docket.mark_committed();

        // Durably written: now, and only now, advance the tip and purge.
        tip.docket_number = docket_number;
        tip.docket_hash = docket.hash_hex();
        entry.record_committed(&docket.transaction_ids);
        let removed = entry.mempool.remove_committed(&docket.transaction_ids);

        info!(
            register_id,
            docket_number,
            committed = docket.transaction_count(),
            removed,
            pending = entry.mempool.len(),
            tip_hash = %tip.docket_hash,
            "docket committed"
        );

        Ok(BuildOutcome::Committed(CommittedDocket {
            docket_number,
            merkle_root: docket.merkle_root.clone(),
            previous_docket_hash: docket.previous_docket_hash.clone(),
            transaction_count: docket.transaction_count(),
            transaction_ids: docket.transaction_ids.clone(),
        }))
    }

    /// Sweeps every active register once. Used by the scheduled build
    /// loop; per-register failures are logged and do not stop the sweep.
    pub async fn sweep_active_registers(&self) -> usize {
        let mut committed = 0;
        for register_id in self.directory.active_register_ids() {
            match self.build_docket(&register_id).await {
                Ok(BuildOutcome::Committed(_)) => committed += 1,
                Ok(BuildOutcome::NoPendingTransactions) => {}
                Err(e) => warn!(register_id = %register_id, error = %e, "sweep build failed"),
            }
        }
        committed
    }

    /// QuorumSigner stage: find the designated validator, ask its wallet
    /// to sign the docket digest.
    async fn sign_docket(
        &self,
        register_id: &str,
        docket: &Docket,
    ) -> Result<DocketSignature, PipelineError> {
        let validators = timeout(
            self.config.collaborator_timeout,
            self.peers.active_validators(register_id),
        )
        .await
        .map_err(|_| PipelineError::Signing("peer query timed out".to_string()))?
        .map_err(|e| PipelineError::Signing(format!("peer query failed: {e}")))?;

        let designated = self
            .designated_validator(&validators)
            .ok_or(PipelineError::NoActiveValidators)?;

        debug!(
            register_id,
            validator = %designated.validator_id,
            "designated validator selected"
        );

        let digest = docket.signing_digest();
        let wallet_signature = timeout(
            self.config.collaborator_timeout,
            self.wallet.sign(&designated.validator_id, &digest),
        )
        .await
        .map_err(|_| PipelineError::Signing("wallet signing timed out".to_string()))?
        .map_err(|e| PipelineError::Signing(format!("wallet refused: {e}")))?;

        Ok(DocketSignature {
            signature: wallet_signature.signature,
            public_key: wallet_signature.public_key,
            signed_by: designated.validator_id.clone(),
            algorithm: SIGNING_ALGORITHM.to_string(),
        })
    }

    /// Designated validator: the locally configured identity if it is in
    /// the active set, otherwise the active validator with the highest
    /// reputation.
    fn designated_validator<'a>(
        &self,
        validators: &'a [ValidatorInfo],
    ) -> Option<&'a ValidatorInfo> {
        let active: Vec<&ValidatorInfo> = validators.iter().filter(|v| v.is_active).collect();

        if let Some(local_id) = &self.config.local_validator_id {
            if let Some(local) = active.iter().find(|v| &v.validator_id == local_id) {
                return Some(*local);
            }
        }

        active.into_iter().max_by(|a, b| {
            a.reputation_score
                .total_cmp(&b.reputation_score)
                .then_with(|| b.validator_id.cmp(&a.validator_id))
        })
    }

    /// RegisterWriter stage: bounded exponential backoff around the
    /// idempotent durable write.
    async fn write_with_retries(
        &self,
        register_id: &str,
        docket: &Docket,
    ) -> Result<(), PipelineError> {
        let mut backoff = self.config.write_retry_backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.config.write_retry_attempts {
            let result = timeout(
                self.config.collaborator_timeout,
                self.register_client.write_docket(register_id, docket),
            )
            .await;

            match result {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => last_error = "write not acknowledged".to_string(),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = "write timed out".to_string(),
            }

            if attempt < self.config.write_retry_attempts {
                debug!(
                    register_id,
                    docket_number = docket.docket_number,
                    attempt,
                    error = %last_error,
                    "docket write failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(PipelineError::Write(format!(
            "exhausted {} attempts: {last_error}",
            self.config.write_retry_attempts
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
