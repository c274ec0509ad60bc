//! # Dockets
//!
//! A docket is an ordered batch of committed transactions: the unit of
//! durable append on a register's chain. Each docket carries a Merkle root
//! over its transactions' payload hashes, a link to the previous docket's
//! hash, and (once signed) the designated validator's signature.
//!
//! ## What binds what
//!
//! - The **Merkle root** binds the transaction set and its order.
//! - The **signing digest** binds the root, the docket number, and the
//!   chain link; it is what the validator wallet signs.
//! - The **docket hash** binds the number, the chain link, and the root,
//!   and deliberately excludes the signature -- the next docket must be
//!   able to reference this one's hash before anyone signed it, and a
//!   re-signed docket with identical content is the same docket.
//!
//! All digests here bind the lowercase-hex string forms of hashes, the same
//! convention transactions use for their signing digest. One convention,
//! zero decode-can't-fail edge cases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::hash::{digest_from_hex, merkle_root, sha256, sha256_hex};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from docket assembly.
#[derive(Debug, Error)]
pub enum DocketError {
    #[error("transaction {0} carries a malformed payload hash")]
    InvalidLeafHash(String),

    #[error("cannot build a docket from zero transactions")]
    EmptyTransactionSet,
}

// ---------------------------------------------------------------------------
// DocketStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a docket.
///
/// `Building` -> `Signed` -> `Committed` on the happy path; any failure
/// after assembly marks it `Failed` and the docket is discarded (its
/// transactions stay in the mempool, untouched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocketStatus {
    /// Assembled, not yet signed.
    Building,
    /// Carries a validator signature, not yet durably written.
    Signed,
    /// Durably written. Terminal.
    Committed,
    /// Signing or write failed. Terminal; the docket is discarded.
    Failed,
}

impl fmt::Display for DocketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "Building"),
            Self::Signed => write!(f, "Signed"),
            Self::Committed => write!(f, "Committed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// DocketSignature
// ---------------------------------------------------------------------------

/// The designated validator's signature over a docket's signing digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocketSignature {
    /// Hex-encoded Ed25519 signature over [`Docket::signing_digest`].
    pub signature: String,

    /// Hex-encoded public key of the signing wallet.
    pub public_key: String,

    /// Validator id that produced the signature.
    pub signed_by: String,

    /// Signature scheme name.
    pub algorithm: String,
}

// ---------------------------------------------------------------------------
// Docket
// ---------------------------------------------------------------------------

/// An ordered batch of transactions bound for a register's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Docket {
    /// The register whose chain this docket extends.
    pub register_id: String,

    /// Position in the chain. Docket #1 links to the genesis sentinel.
    pub docket_number: u64,

    /// Hash of the previous docket (or the genesis sentinel), lowercase hex.
    pub previous_docket_hash: String,

    /// Merkle root over the transactions' payload hashes, lowercase hex.
    pub merkle_root: String,

    /// Transaction ids in docket order (the Merkle leaf order).
    pub transaction_ids: Vec<String>,

    /// Assembly time.
    pub created_at: DateTime<Utc>,

    /// The designated validator's signature, once signed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validator_signature: Option<DocketSignature>,

    /// Lifecycle state.
    pub status: DocketStatus,
}

impl Docket {
    /// Assembles a docket from an ordered transaction slice.
    ///
    /// Leaves are the transactions' payload hashes, decoded from hex, in
    /// the order given -- which is the mempool drain order and must not be
    /// reordered between here and commit. The caller guarantees the
    /// transactions already passed intake; a malformed payload hash at this
    /// point means corrupted pool state and fails the build.
    pub fn build(
        register_id: &str,
        docket_number: u64,
        previous_docket_hash: &str,
        transactions: &[Transaction],
    ) -> Result<Self, DocketError> {
        if transactions.is_empty() {
            return Err(DocketError::EmptyTransactionSet);
        }

        let mut leaves = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let leaf = digest_from_hex(&tx.payload_hash)
                .ok_or_else(|| DocketError::InvalidLeafHash(tx.transaction_id.clone()))?;
            leaves.push(leaf);
        }

        Ok(Self {
            register_id: register_id.to_string(),
            docket_number,
            previous_docket_hash: previous_docket_hash.to_string(),
            merkle_root: hex::encode(merkle_root(&leaves)),
            transaction_ids: transactions
                .iter()
                .map(|tx| tx.transaction_id.clone())
                .collect(),
            created_at: Utc::now(),
            validator_signature: None,
            status: DocketStatus::Building,
        })
    }

    /// The digest the validator wallet signs:
    /// `sha256(merkle_root || docket_number_le || previous_docket_hash)`.
    ///
    /// Covers the content AND the chain position, so a signature cannot be
    /// replayed onto a docket at a different height or on a forked chain.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(136);
        buf.extend_from_slice(self.merkle_root.as_bytes());
        buf.extend_from_slice(&self.docket_number.to_le_bytes());
        buf.extend_from_slice(self.previous_docket_hash.as_bytes());
        sha256(&buf)
    }

    /// The chain-link hash of this docket, lowercase hex.
    ///
    /// `sha256(docket_number_le || previous_docket_hash || merkle_root)`,
    /// excluding the signature. This is the value the NEXT docket stores as
    /// its `previous_docket_hash`.
    pub fn hash_hex(&self) -> String {
        sha256_hex(
            &[
                &self.docket_number.to_le_bytes()[..],
                self.previous_docket_hash.as_bytes(),
                self.merkle_root.as_bytes(),
            ]
            .concat(),
        )
    }

    /// Number of transactions carried.
    pub fn transaction_count(&self) -> usize {
        self.transaction_ids.len()
    }

    /// Attaches the validator signature and advances to `Signed`.
    pub fn attach_signature(&mut self, signature: DocketSignature) {
        self.validator_signature = Some(signature);
        self.status = DocketStatus::Signed;
    }

    /// Marks the docket durably committed.
    pub fn mark_committed(&mut self) {
        self.status = DocketStatus::Committed;
    }

    /// Marks the docket failed. The docket is dead at this point; its
    /// transactions live on in the mempool.
    pub fn mark_failed(&mut self) {
        self.status = DocketStatus::Failed;
    }

    /// Recomputes the Merkle root from the given transactions and checks it
    /// against the stored root. Used by verification tooling; expects the
    /// same transactions in the same order as the build.
    pub fn verify_merkle_root(&self, transactions: &[Transaction]) -> Result<bool, DocketError> {
        let mut leaves = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let leaf = digest_from_hex(&tx.payload_hash)
                .ok_or_else(|| DocketError::InvalidLeafHash(tx.transaction_id.clone()))?;
            leaves.push(leaf);
        }
        Ok(hex::encode(merkle_root(&leaves)) == self.merkle_root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
