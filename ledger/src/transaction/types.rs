//! Core type definitions for ledger transactions.
//!
//! These types form the vocabulary of every transaction submitted to a
//! register. Kept small and `Copy`-friendly where possible to avoid heap
//! allocations on the hot validation path.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction.
///
/// Transactions are `Pending` when first submitted, `Validated` once intake
/// has accepted them into the mempool, `Rejected` if any validation check
/// fails, and `Included` once a committed docket carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionStatus {
    /// Freshly constructed, not yet through intake.
    #[default]
    Pending,
    /// Accepted by intake and waiting in the mempool.
    Validated,
    /// Failed a validation check. Terminal.
    Rejected,
    /// Carried by a committed docket. Terminal.
    Included,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Validated => write!(f, "Validated"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Included => write!(f, "Included"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionSignature
// ---------------------------------------------------------------------------

/// A submitter signature attached to a transaction.
///
/// The signed message is the transaction's signing digest
/// (`SHA256(transaction_id bytes || payload_hash bytes)`), so a valid
/// signature binds both the identity and the exact payload content.
///
/// `algorithm` is carried as a free string and validated at intake rather
/// than as an enum: an unknown algorithm must surface as a structured
/// rejection reason, not as a deserialization error the client can't read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSignature {
    /// Hex-encoded Ed25519 public key of the signer.
    pub public_key: String,

    /// Hex-encoded Ed25519 signature over the signing digest.
    pub signature_value: String,

    /// Signature scheme name. Only `"Ed25519"` is accepted
    /// (case-insensitive).
    pub algorithm: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(TransactionStatus::Pending.to_string(), "Pending");
        assert_eq!(TransactionStatus::Included.to_string(), "Included");
    }

    #[test]
    fn status_default_is_pending() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
    }

    #[test]
    fn status_serde_roundtrip() {
        let statuses = vec![
            TransactionStatus::Pending,
            TransactionStatus::Validated,
            TransactionStatus::Rejected,
            TransactionStatus::Included,
        ];
        for s in statuses {
            let json = serde_json::to_string(&s).unwrap();
            let recovered: TransactionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(s, recovered);
        }
    }

    #[test]
    fn signature_wire_format_is_camel_case() {
        let sig = TransactionSignature {
            public_key: "aa".repeat(32),
            signature_value: "bb".repeat(64),
            algorithm: "Ed25519".to_string(),
        };
        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.contains("publicKey"));
        assert!(json.contains("signatureValue"));
        assert!(json.contains("algorithm"));
    }
}
