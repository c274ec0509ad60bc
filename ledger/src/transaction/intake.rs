//! Transaction intake: the validation gate in front of every mempool.
//!
//! Checks run in a fixed order, governance first, then lifecycle, then
//! cryptography, then bookkeeping. The order is part of the contract: a
//! forbidden transaction class is reported as forbidden even if its
//! signature is also garbage, because the client fixes different things
//! depending on which reason comes back.
//!
//! Everything here recomputes server-side. Client-claimed hashes and ids
//! are claims to verify, never facts to trust.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::authorization::RegisterPolicy;
use crate::config::SIGNING_ALGORITHM;
use crate::crypto::keys::{LedgerPublicKey, LedgerSignature};
use crate::mempool::MempoolError;
use crate::registry::RegisterDirectory;

use super::builder::Transaction;
use super::types::TransactionStatus;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every way intake can say no.
///
/// `Forbidden` and `CapacityExceeded` are not validation failures -- the
/// node maps them to their own HTTP classes (403 and 429). The rest are
/// validation rejections reported in-band with `is_valid: false`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("transaction class is not permitted on this register")]
    Forbidden,

    #[error("register {0} does not exist")]
    UnknownRegister(String),

    #[error("register {0} is not active")]
    RegisterNotActive(String),

    #[error("transaction expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("transaction carries no signatures")]
    MissingSignature,

    #[error("signature from {0} is not decodable")]
    MalformedSignature(String),

    #[error("no attached signature verifies against the signing digest")]
    InvalidSignature,

    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("payload hash does not match the received payload bytes")]
    PayloadHashMismatch,

    #[error("transaction id does not match the transaction content")]
    IdMismatch,

    #[error("transaction {0} was already submitted")]
    Duplicate(String),

    #[error("register mempool is full")]
    CapacityExceeded,
}

// ---------------------------------------------------------------------------
// SubmitReceipt
// ---------------------------------------------------------------------------

/// What the submitter gets back on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub is_valid: bool,
    pub added: bool,
    pub transaction_id: String,
    pub register_id: String,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TransactionIntake
// ---------------------------------------------------------------------------

/// Validates submitted transactions and enqueues the survivors.
pub struct TransactionIntake {
    directory: Arc<RegisterDirectory>,
    policy: Arc<dyn RegisterPolicy>,
}

impl TransactionIntake {
    pub fn new(directory: Arc<RegisterDirectory>, policy: Arc<dyn RegisterPolicy>) -> Self {
        Self { directory, policy }
    }

    /// Runs the full validation gauntlet and, on success, enqueues the
    /// transaction with status `Validated`.
    ///
    /// Rejection leaves no trace: nothing is enqueued, no state changes.
    pub fn submit(&self, mut tx: Transaction) -> Result<SubmitReceipt, IntakeError> {
        let entry = self
            .directory
            .get(&tx.register_id)
            .ok_or_else(|| IntakeError::UnknownRegister(tx.register_id.clone()))?;

        // Governance veto, before any validation spends cycles.
        let register = entry.snapshot();
        if !self.policy.can_submit(&register, &tx) {
            warn!(
                register_id = %tx.register_id,
                blueprint_id = %tx.blueprint_id,
                "submission forbidden by register policy"
            );
            return Err(IntakeError::Forbidden);
        }

        if !register.is_active() {
            return Err(IntakeError::RegisterNotActive(tx.register_id.clone()));
        }

        if tx.is_expired_at(Utc::now()) {
            return Err(IntakeError::Expired(tx.expires_at));
        }

        self.verify_signatures(&tx)?;

        // The payload hash is a claim. Recompute from the exact received
        // bytes; the payload is never re-serialized on the way.
        if tx.payload.hash_hex() != tx.payload_hash {
            debug!(transaction_id = %tx.transaction_id, "payload hash mismatch");
            return Err(IntakeError::PayloadHashMismatch);
        }

        if tx.compute_id() != tx.transaction_id {
            debug!(transaction_id = %tx.transaction_id, "content hash mismatch");
            return Err(IntakeError::IdMismatch);
        }

        if entry.is_committed(&tx.transaction_id) {
            return Err(IntakeError::Duplicate(tx.transaction_id));
        }

        tx.status = TransactionStatus::Validated;
        let transaction_id = tx.transaction_id.clone();
        let register_id = tx.register_id.clone();

        entry.mempool.add(tx).map_err(|e| match e {
            MempoolError::Duplicate(id) => IntakeError::Duplicate(id),
            MempoolError::CapacityExceeded(_) => IntakeError::CapacityExceeded,
        })?;

        let added_at = Utc::now();
        info!(
            register_id = %register_id,
            transaction_id = %transaction_id,
            pending = entry.mempool.len(),
            "transaction accepted"
        );

        Ok(SubmitReceipt {
            is_valid: true,
            added: true,
            transaction_id,
            register_id,
            added_at,
        })
    }

    /// Signature rule: at least one signature present; every attached
    /// signature must be structurally sound (supported algorithm, decodable
    /// hex); at least one must cryptographically verify.
    ///
    /// Malformed attachments fail the whole submission rather than being
    /// skipped -- a client that attaches garbage should hear about it, not
    /// sail through because a second signature happened to verify.
    fn verify_signatures(&self, tx: &Transaction) -> Result<(), IntakeError> {
        if tx.signatures.is_empty() {
            return Err(IntakeError::MissingSignature);
        }

        let digest = tx.signing_digest();
        let mut any_valid = false;

        for sig in &tx.signatures {
            if !sig.algorithm.eq_ignore_ascii_case(SIGNING_ALGORITHM) {
                return Err(IntakeError::UnsupportedAlgorithm(sig.algorithm.clone()));
            }

            let public_key = LedgerPublicKey::from_hex(&sig.public_key)
                .map_err(|_| IntakeError::MalformedSignature(sig.public_key.clone()))?;
            let signature = LedgerSignature::from_hex(&sig.signature_value)
                .map_err(|_| IntakeError::MalformedSignature(sig.public_key.clone()))?;

            if public_key.verify(&digest, &signature) {
                any_valid = true;
            }
        }

        if any_valid {
            Ok(())
        } else {
            Err(IntakeError::InvalidSignature)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{AllowAll, DenyAll};
    use crate::crypto::keys::LedgerKeypair;
    use crate::register::{Register, RegisterStatus};
    use crate::transaction::signing::sign_transaction;
    use crate::transaction::types::TransactionSignature;
    use crate::transaction::{RawPayload, TransactionBuilder};

    fn directory_with(id: &str, status: RegisterStatus) -> Arc<RegisterDirectory> {
        let directory = Arc::new(RegisterDirectory::new());
        directory.insert(Register {
            register_id: id.to_string(),
            name: "test".to_string(),
            description: String::new(),
            owners: vec![],
            status,
            created_at: Utc::now(),
        });
        directory
    }

    fn intake_for(directory: Arc<RegisterDirectory>) -> TransactionIntake {
        TransactionIntake::new(directory, Arc::new(AllowAll))
    }

    fn signed_tx(register_id: &str, keypair: &LedgerKeypair) -> Transaction {
        let payload =
            RawPayload::from_string(r#"{"sku":"A-17","qty": 2}"#.to_string()).unwrap();
        let mut tx = TransactionBuilder::new(register_id, payload)
            .blueprint("bp-orders")
            .action("reserve")
            .priority(3)
            .build();
        sign_transaction(&mut tx, keypair);
        tx
    }

    #[test]
    fn accepts_a_well_formed_transaction() {
        let directory = directory_with("reg", RegisterStatus::Active);
        let intake = intake_for(directory.clone());
        let keypair = LedgerKeypair::generate();
        let tx = signed_tx("reg", &keypair);
        let id = tx.transaction_id.clone();

        let receipt = intake.submit(tx).unwrap();

        assert!(receipt.is_valid);
        assert!(receipt.added);
        assert_eq!(receipt.transaction_id, id);

        let entry = directory.get("reg").unwrap();
        assert!(entry.mempool.contains(&id));
        assert_eq!(
            entry.mempool.peek(1)[0].status,
            TransactionStatus::Validated
        );
    }

    #[test]
    fn rejects_unknown_register() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let tx = signed_tx("other-reg", &LedgerKeypair::generate());
        assert_eq!(
            intake.submit(tx),
            Err(IntakeError::UnknownRegister("other-reg".to_string()))
        );
    }

    #[test]
    fn rejects_inactive_register() {
        let directory = directory_with("reg", RegisterStatus::AwaitingAttestations);
        let intake = intake_for(directory);
        let tx = signed_tx("reg", &LedgerKeypair::generate());
        assert_eq!(
            intake.submit(tx),
            Err(IntakeError::RegisterNotActive("reg".to_string()))
        );
    }

    #[test]
    fn policy_veto_wins_over_everything_else() {
        let directory = directory_with("reg", RegisterStatus::AwaitingAttestations);
        let intake = TransactionIntake::new(directory, Arc::new(DenyAll));
        // Not even signed, register not even active: still Forbidden.
        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        let tx = TransactionBuilder::new("reg", payload).build();
        assert_eq!(intake.submit(tx), Err(IntakeError::Forbidden));
    }

    #[test]
    fn rejects_expired_transaction() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();

        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        let created = Utc::now() - chrono::Duration::hours(2);
        let mut tx = TransactionBuilder::new("reg", payload)
            .created_at(created)
            .expires_at(created + chrono::Duration::hours(1))
            .build();
        sign_transaction(&mut tx, &keypair);

        assert!(matches!(intake.submit(tx), Err(IntakeError::Expired(_))));
    }

    #[test]
    fn rejects_unsigned_transaction() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        let tx = TransactionBuilder::new("reg", payload).build();
        assert_eq!(intake.submit(tx), Err(IntakeError::MissingSignature));
    }

    #[test]
    fn rejects_tampered_payload() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);

        // Swap the payload after hashing and signing.
        tx.payload = RawPayload::from_string(r#"{"sku":"A-17","qty":99}"#.to_string()).unwrap();

        assert_eq!(intake.submit(tx), Err(IntakeError::PayloadHashMismatch));
    }

    #[test]
    fn rejects_forged_id() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);

        // Re-point the id and re-sign so the signature check passes; the
        // content recomputation must still catch the forgery.
        tx.transaction_id = "ab".repeat(32);
        tx.signatures.clear();
        sign_transaction(&mut tx, &keypair);

        assert_eq!(intake.submit(tx), Err(IntakeError::IdMismatch));
    }

    #[test]
    fn rejects_wrong_key_signature() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);

        // Replace the signature with one from an unrelated key over an
        // unrelated message.
        let imposter = LedgerKeypair::generate();
        tx.signatures = vec![TransactionSignature {
            public_key: imposter.public_key().to_hex(),
            signature_value: imposter.sign(b"something else").to_hex(),
            algorithm: SIGNING_ALGORITHM.to_string(),
        }];

        assert_eq!(intake.submit(tx), Err(IntakeError::InvalidSignature));
    }

    #[test]
    fn rejects_unsupported_algorithm() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);
        tx.signatures[0].algorithm = "secp256k1".to_string();

        assert_eq!(
            intake.submit(tx),
            Err(IntakeError::UnsupportedAlgorithm("secp256k1".to_string()))
        );
    }

    #[test]
    fn algorithm_match_is_case_insensitive() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);
        tx.signatures[0].algorithm = "ed25519".to_string();

        assert!(intake.submit(tx).is_ok());
    }

    #[test]
    fn rejects_malformed_signature_even_with_a_valid_one_present() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);
        tx.signatures.push(TransactionSignature {
            public_key: "zz-not-hex".to_string(),
            signature_value: "ff".repeat(64),
            algorithm: SIGNING_ALGORITHM.to_string(),
        });

        assert!(matches!(
            intake.submit(tx),
            Err(IntakeError::MalformedSignature(_))
        ));
    }

    #[test]
    fn one_valid_signature_among_wrong_key_ones_suffices() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let mut tx = signed_tx("reg", &keypair);

        // A well-formed signature from the wrong key does not verify, but
        // also does not invalidate the submission.
        let bystander = LedgerKeypair::generate();
        tx.signatures.push(TransactionSignature {
            public_key: bystander.public_key().to_hex(),
            signature_value: bystander.sign(b"unrelated").to_hex(),
            algorithm: SIGNING_ALGORITHM.to_string(),
        });

        assert!(intake.submit(tx).is_ok());
    }

    #[test]
    fn rejects_duplicate_submission() {
        let intake = intake_for(directory_with("reg", RegisterStatus::Active));
        let keypair = LedgerKeypair::generate();
        let tx = signed_tx("reg", &keypair);
        let id = tx.transaction_id.clone();

        intake.submit(tx.clone()).unwrap();
        assert_eq!(intake.submit(tx), Err(IntakeError::Duplicate(id)));
    }

    #[test]
    fn rejects_already_committed_transaction() {
        let directory = directory_with("reg", RegisterStatus::Active);
        let intake = intake_for(directory.clone());
        let keypair = LedgerKeypair::generate();
        let tx = signed_tx("reg", &keypair);
        let id = tx.transaction_id.clone();

        directory.get("reg").unwrap().record_committed(&[id.clone()]);

        assert_eq!(intake.submit(tx), Err(IntakeError::Duplicate(id)));
    }

    #[test]
    fn full_mempool_applies_backpressure() {
        let directory = Arc::new(RegisterDirectory::with_mempool_capacity(1));
        directory.insert(Register {
            register_id: "reg".to_string(),
            name: "tiny".to_string(),
            description: String::new(),
            owners: vec![],
            status: RegisterStatus::Active,
            created_at: Utc::now(),
        });
        let intake = intake_for(directory);
        let keypair = LedgerKeypair::generate();

        intake.submit(signed_tx("reg", &keypair)).unwrap();

        let payload = RawPayload::from_string(r#"{"other":true}"#.to_string()).unwrap();
        let mut second = TransactionBuilder::new("reg", payload).build();
        sign_transaction(&mut second, &keypair);

        assert_eq!(intake.submit(second), Err(IntakeError::CapacityExceeded));
    }
}
