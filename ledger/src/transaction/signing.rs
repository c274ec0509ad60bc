//! Transaction signing.
//!
//! Signing happens after construction: the digest covers the content-derived
//! transaction id and the payload hash, so the signature is only meaningful
//! once both are fixed. Multiple parties may sign the same transaction;
//! signatures accumulate rather than replace.

use crate::config::SIGNING_ALGORITHM;
use crate::crypto::keys::LedgerKeypair;

use super::builder::Transaction;
use super::types::TransactionSignature;

/// Signs the transaction's digest with the given keypair and attaches the
/// resulting signature.
///
/// Does NOT recompute the transaction id or payload hash -- if the caller
/// mutated content fields after `build()`, the signature will simply fail
/// verification at intake, which is the correct outcome.
pub fn sign_transaction(tx: &mut Transaction, keypair: &LedgerKeypair) {
    let digest = tx.signing_digest();
    let signature = keypair.sign(&digest);

    tx.signatures.push(TransactionSignature {
        public_key: keypair.public_key().to_hex(),
        signature_value: signature.to_hex(),
        algorithm: SIGNING_ALGORITHM.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{LedgerPublicKey, LedgerSignature};
    use crate::transaction::payload::RawPayload;
    use crate::transaction::builder::TransactionBuilder;

    fn sample_tx() -> Transaction {
        let payload = RawPayload::from_string(r#"{"op":"mint","qty":5}"#.to_string()).unwrap();
        TransactionBuilder::new("reg-assets", payload)
            .blueprint("bp-assets")
            .action("mint")
            .build()
    }

    #[test]
    fn attaches_a_verifiable_signature() {
        let keypair = LedgerKeypair::generate();
        let mut tx = sample_tx();

        sign_transaction(&mut tx, &keypair);

        assert_eq!(tx.signatures.len(), 1);
        let sig = &tx.signatures[0];
        assert_eq!(sig.algorithm, SIGNING_ALGORITHM);

        let pk = LedgerPublicKey::from_hex(&sig.public_key).unwrap();
        let signature = LedgerSignature::from_hex(&sig.signature_value).unwrap();
        assert!(pk.verify(&tx.signing_digest(), &signature));
    }

    #[test]
    fn multiple_signers_accumulate() {
        let alice = LedgerKeypair::generate();
        let bob = LedgerKeypair::generate();
        let mut tx = sample_tx();

        sign_transaction(&mut tx, &alice);
        sign_transaction(&mut tx, &bob);

        assert_eq!(tx.signatures.len(), 2);
        assert_ne!(tx.signatures[0].public_key, tx.signatures[1].public_key);
    }

    #[test]
    fn signing_does_not_change_the_id() {
        let keypair = LedgerKeypair::generate();
        let mut tx = sample_tx();
        let id_before = tx.transaction_id.clone();

        sign_transaction(&mut tx, &keypair);

        assert_eq!(tx.transaction_id, id_before);
        assert_eq!(tx.compute_id(), id_before);
    }

    #[test]
    fn signature_breaks_if_payload_hash_changes_afterward() {
        let keypair = LedgerKeypair::generate();
        let mut tx = sample_tx();
        sign_transaction(&mut tx, &keypair);

        // Tamper after signing.
        tx.payload_hash = "ab".repeat(32);

        let sig = &tx.signatures[0];
        let pk = LedgerPublicKey::from_hex(&sig.public_key).unwrap();
        let signature = LedgerSignature::from_hex(&sig.signature_value).unwrap();
        assert!(!pk.verify(&tx.signing_digest(), &signature));
    }
}
