//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] enforces a disciplined construction flow:
//! set the fields, call `.build()`, and get back an unsigned
//! [`Transaction`] with a deterministic id derived from its contents.
//!
//! The builder does not sign -- that happens in [`super::signing`]. The
//! separation keeps construction testable without key material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::RawPayload;
use super::types::{TransactionSignature, TransactionStatus};
use crate::crypto::hash::{sha256, sha256_hex};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transaction bound for a register.
///
/// The `transaction_id` is the SHA-256 hash of [`Transaction::content_bytes`],
/// which covers every content field but no signatures. The id is therefore
/// stable across signing: compute it before the transaction is signed and it
/// will not change afterward.
///
/// # Canonical Byte Format
///
/// `content_bytes` deterministically concatenates: register id, blueprint id,
/// action id, payload hash (string fields null-separated), then created-at
/// and expires-at as little-endian millisecond timestamps and the priority as
/// a little-endian u32. JSON/serde is intentionally avoided because field
/// ordering is not guaranteed across serialization formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Content-derived id: `hex(sha256(content_bytes))`.
    pub transaction_id: String,

    /// The register this transaction is destined for.
    pub register_id: String,

    /// The blueprint (schema/contract) the payload conforms to.
    pub blueprint_id: String,

    /// The action within the blueprint this transaction invokes.
    pub action_id: String,

    /// The payload as the exact JSON text the client sent. Hashed
    /// byte-for-byte, never re-serialized.
    pub payload: RawPayload,

    /// Client-claimed SHA-256 of the payload bytes, lowercase hex.
    /// Intake recomputes and compares -- a mismatch is a rejection.
    pub payload_hash: String,

    /// Submitter signatures. At least one must verify for intake to
    /// accept the transaction.
    pub signatures: Vec<TransactionSignature>,

    /// Creation time. Part of the id, so backdating changes the id.
    pub created_at: DateTime<Utc>,

    /// Hard deadline: intake rejects the transaction at or after this
    /// instant.
    pub expires_at: DateTime<Utc>,

    /// Mempool ordering priority. Higher drains first.
    pub priority: u32,

    /// Free-form client annotations. Not hashed, not signed, not
    /// interpreted by the platform.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<serde_json::Value>,

    /// Lifecycle state. Defaults to `Pending` when absent on the wire.
    #[serde(default)]
    pub status: TransactionStatus,
}

impl Transaction {
    /// Canonical byte representation for id computation.
    ///
    /// String fields are null-separated, integers fixed-width
    /// little-endian. Excluded: `transaction_id`, `signatures`,
    /// `metadata`, `status`.
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.extend_from_slice(self.register_id.as_bytes());
        buf.push(0x00);

        buf.extend_from_slice(self.blueprint_id.as_bytes());
        buf.push(0x00);

        buf.extend_from_slice(self.action_id.as_bytes());
        buf.push(0x00);

        buf.extend_from_slice(self.payload_hash.as_bytes());
        buf.push(0x00);

        // Millisecond timestamps, little-endian i64.
        buf.extend_from_slice(&self.created_at.timestamp_millis().to_le_bytes());
        buf.extend_from_slice(&self.expires_at.timestamp_millis().to_le_bytes());

        buf.extend_from_slice(&self.priority.to_le_bytes());

        buf
    }

    /// Computes the transaction id from the current field values.
    ///
    /// `hex(sha256(content_bytes))` -- deterministic and independent of
    /// signature state.
    pub fn compute_id(&self) -> String {
        sha256_hex(&self.content_bytes())
    }

    /// The digest submitters sign: `sha256(transaction_id || payload_hash)`
    /// over the two hex strings' ASCII bytes.
    ///
    /// Binding the payload hash into the digest means a signature can never
    /// be moved onto a transaction with different payload content, even if
    /// someone forged a colliding id.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(self.transaction_id.len() + self.payload_hash.len());
        buf.extend_from_slice(self.transaction_id.as_bytes());
        buf.extend_from_slice(self.payload_hash.as_bytes());
        sha256(&buf)
    }

    /// Returns `true` if at least one signature is attached.
    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Returns `true` if `expires_at` is at or before the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for constructing unsigned [`Transaction`] instances.
///
/// ```rust,no_run
/// use keystone_ledger::transaction::{RawPayload, TransactionBuilder};
///
/// let payload = RawPayload::from_string(r#"{"qty":3}"#.to_string()).unwrap();
/// let tx = TransactionBuilder::new("reg-orders", payload)
///     .blueprint("bp-inventory")
///     .action("reserve")
///     .priority(10)
///     .build();
/// ```
///
/// The payload is a constructor argument because a transaction without one
/// is meaningless. Defaults: `created_at` is the current UTC time,
/// `expires_at` is one hour later, priority 0. The payload hash is computed
/// from the payload bytes at build time, and the id from the assembled
/// content.
pub struct TransactionBuilder {
    register_id: String,
    blueprint_id: String,
    action_id: String,
    payload: RawPayload,
    created_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    priority: u32,
    metadata: Option<serde_json::Value>,
}

impl TransactionBuilder {
    /// Creates a builder targeting the given register, carrying the given
    /// payload.
    pub fn new(register_id: &str, payload: RawPayload) -> Self {
        Self {
            register_id: register_id.to_string(),
            blueprint_id: String::new(),
            action_id: String::new(),
            payload,
            created_at: None,
            expires_at: None,
            priority: 0,
            metadata: None,
        }
    }

    /// Sets the blueprint id.
    pub fn blueprint(mut self, blueprint_id: &str) -> Self {
        self.blueprint_id = blueprint_id.to_string();
        self
    }

    /// Sets the action id.
    pub fn action(mut self, action_id: &str) -> Self {
        self.action_id = action_id.to_string();
        self
    }

    /// Sets the creation timestamp explicitly. Defaults to now.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Sets the expiry deadline explicitly. Defaults to creation + 1h.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Sets the mempool priority. Higher drains first.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches free-form metadata. Never hashed or signed.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Consumes the builder and produces an unsigned [`Transaction`].
    pub fn build(self) -> Transaction {
        let payload = self.payload;
        let payload_hash = payload.hash_hex();

        let created_at = self.created_at.unwrap_or_else(Utc::now);
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| created_at + chrono::Duration::hours(1));

        let mut tx = Transaction {
            transaction_id: String::new(),
            register_id: self.register_id,
            blueprint_id: self.blueprint_id,
            action_id: self.action_id,
            payload,
            payload_hash,
            signatures: Vec::new(),
            created_at,
            expires_at,
            priority: self.priority,
            metadata: self.metadata,
            status: TransactionStatus::Pending,
        };

        tx.transaction_id = tx.compute_id();
        tx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn sample_tx() -> Transaction {
        let payload = RawPayload::from_string(r#"{"qty":3,"sku":"A-17"}"#.to_string()).unwrap();
        TransactionBuilder::new("reg-orders", payload)
            .blueprint("bp-inventory")
            .action("reserve")
            .created_at(fixed_time())
            .expires_at(fixed_time() + chrono::Duration::hours(1))
            .priority(10)
            .build()
    }

    #[test]
    fn builder_produces_deterministic_id() {
        let tx1 = sample_tx();
        let tx2 = sample_tx();
        assert_eq!(tx1.transaction_id, tx2.transaction_id);
        assert!(!tx1.transaction_id.is_empty());
    }

    #[test]
    fn id_is_hex_encoded_64_chars() {
        let tx = sample_tx();
        assert_eq!(tx.transaction_id.len(), 64);
        assert!(tx.transaction_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn compute_id_matches_stored_id() {
        let tx = sample_tx();
        assert_eq!(tx.transaction_id, tx.compute_id());
    }

    #[test]
    fn payload_hash_matches_payload_bytes() {
        let tx = sample_tx();
        assert_eq!(tx.payload_hash, tx.payload.hash_hex());
    }

    #[test]
    fn different_priority_different_id() {
        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        let tx1 = TransactionBuilder::new("reg", payload.clone())
            .created_at(fixed_time())
            .priority(1)
            .build();
        let tx2 = TransactionBuilder::new("reg", payload)
            .created_at(fixed_time())
            .priority(2)
            .build();
        assert_ne!(tx1.transaction_id, tx2.transaction_id);
    }

    #[test]
    fn different_payload_different_id() {
        let tx1 = TransactionBuilder::new(
            "reg",
            RawPayload::from_string(r#"{"v":1}"#.to_string()).unwrap(),
        )
        .created_at(fixed_time())
        .build();
        let tx2 = TransactionBuilder::new(
            "reg",
            RawPayload::from_string(r#"{"v":2}"#.to_string()).unwrap(),
        )
        .created_at(fixed_time())
        .build();
        assert_ne!(tx1.transaction_id, tx2.transaction_id);
    }

    #[test]
    fn content_bytes_exclude_signatures() {
        let mut tx = sample_tx();
        let before = tx.content_bytes();

        tx.signatures.push(TransactionSignature {
            public_key: "aa".repeat(32),
            signature_value: "bb".repeat(64),
            algorithm: "Ed25519".to_string(),
        });
        let after = tx.content_bytes();

        assert_eq!(before, after, "signatures must not affect content bytes");
    }

    #[test]
    fn content_bytes_exclude_metadata_and_status() {
        let mut tx = sample_tx();
        let before = tx.content_bytes();

        tx.metadata = Some(serde_json::json!({"trace": "abc-123"}));
        tx.status = TransactionStatus::Validated;
        let after = tx.content_bytes();

        assert_eq!(before, after);
    }

    #[test]
    fn signing_digest_changes_with_payload_hash() {
        let mut tx = sample_tx();
        let before = tx.signing_digest();
        tx.payload_hash = "00".repeat(32);
        assert_ne!(before, tx.signing_digest());
    }

    #[test]
    fn unsigned_transaction_has_no_signature() {
        let tx = sample_tx();
        assert!(!tx.is_signed());
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn builder_defaults_expiry_to_one_hour() {
        let tx = TransactionBuilder::new("reg", RawPayload::from_string("{}".to_string()).unwrap())
            .created_at(fixed_time())
            .build();
        assert_eq!(tx.expires_at - tx.created_at, chrono::Duration::hours(1));
    }

    #[test]
    fn expiry_check_is_inclusive() {
        let tx = sample_tx();
        assert!(!tx.is_expired_at(tx.expires_at - chrono::Duration::milliseconds(1)));
        assert!(tx.is_expired_at(tx.expires_at));
        assert!(tx.is_expired_at(tx.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn wire_format_is_camel_case_and_roundtrips() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("transactionId"));
        assert!(json.contains("registerId"));
        assert!(json.contains("payloadHash"));
        assert!(json.contains("createdAt"));

        let recovered: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, recovered);
        // The roundtripped payload still hashes identically.
        assert_eq!(recovered.payload.hash_hex(), tx.payload_hash);
    }

    #[test]
    fn metadata_absent_is_omitted_from_wire() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(!json.contains("metadata"));
    }
}
