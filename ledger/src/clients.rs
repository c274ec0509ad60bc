//! # Collaborator Clients
//!
//! The platform core never talks to the network directly. Three seams,
//! each an async trait:
//!
//! - [`PeerClient`]: validator discovery and register advertisement.
//! - [`WalletClient`]: remote signing. Key custody never enters this
//!   process.
//! - [`RegisterClient`]: the durable docket append.
//!
//! Every call through these traits is bounded by a timeout at the call
//! site; implementations do not need their own deadlines. The in-process
//! implementations at the bottom back single-node deployments and the
//! test suite.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::LedgerKeypair;
use crate::docket::Docket;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by collaborator calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The collaborator could not be reached or errored internally.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered and said no.
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A validator as reported by the peer network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorInfo {
    pub validator_id: String,
    pub endpoint: String,
    pub reputation_score: f64,
    pub is_active: bool,
}

/// A signature produced by a wallet on behalf of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSignature {
    /// Hex-encoded Ed25519 signature.
    pub signature: String,
    /// Hex-encoded public key of the signing wallet.
    pub public_key: String,
    /// The wallet id that signed.
    pub signed_by: String,
    /// Signature scheme name.
    pub algorithm: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Validator discovery and register gossip.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// The validators currently serving the given register.
    async fn active_validators(&self, register_id: &str) -> Result<Vec<ValidatorInfo>, ClientError>;

    /// Announces a newly activated register to the peer network.
    /// Best-effort: activation does not roll back if this fails.
    async fn advertise_register(&self, register_id: &str) -> Result<(), ClientError>;
}

/// Remote signing. The digest goes out, a signature comes back, and the
/// private key never exists on this side of the wire.
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn sign(&self, wallet_id: &str, digest: &[u8; 32]) -> Result<WalletSignature, ClientError>;
}

/// The durable docket append.
///
/// MUST be idempotent per `(register_id, docket_number)`: the pipeline
/// retries writes, and a retry of an already-applied write must succeed
/// without duplicating the docket.
#[async_trait]
pub trait RegisterClient: Send + Sync {
    /// Returns `true` on success (including the already-written case).
    async fn write_docket(&self, register_id: &str, docket: &Docket) -> Result<bool, ClientError>;
}

// ---------------------------------------------------------------------------
// In-process implementations
// ---------------------------------------------------------------------------

/// A fixed validator set. Single-node deployments list themselves;
/// tests list whatever the scenario needs.
pub struct StaticPeerDirectory {
    validators: Vec<ValidatorInfo>,
}

impl StaticPeerDirectory {
    pub fn new(validators: Vec<ValidatorInfo>) -> Self {
        Self { validators }
    }

    /// A directory containing one active local validator with a perfect
    /// reputation.
    pub fn single(validator_id: &str) -> Self {
        Self::new(vec![ValidatorInfo {
            validator_id: validator_id.to_string(),
            endpoint: "local".to_string(),
            reputation_score: 1.0,
            is_active: true,
        }])
    }
}

#[async_trait]
impl PeerClient for StaticPeerDirectory {
    async fn active_validators(
        &self,
        _register_id: &str,
    ) -> Result<Vec<ValidatorInfo>, ClientError> {
        Ok(self
            .validators
            .iter()
            .filter(|v| v.is_active)
            .cloned()
            .collect())
    }

    async fn advertise_register(&self, _register_id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

/// An in-process wallet holding keypairs in memory.
///
/// For single-node and test use only. Wallet ids double as validator ids
/// here, which matches how the pipeline asks for signatures.
pub struct LocalWallet {
    keys: DashMap<String, LedgerKeypair>,
}

impl LocalWallet {
    pub fn new() -> Self {
        Self { keys: DashMap::new() }
    }

    /// Generates a keypair for the wallet id and returns the public key
    /// as hex.
    pub fn add_wallet(&self, wallet_id: &str) -> String {
        let keypair = LedgerKeypair::generate();
        let public_hex = keypair.public_key().to_hex();
        self.keys.insert(wallet_id.to_string(), keypair);
        public_hex
    }

    /// Public key for a wallet, if present.
    pub fn public_key_hex(&self, wallet_id: &str) -> Option<String> {
        self.keys.get(wallet_id).map(|k| k.public_key().to_hex())
    }
}

impl Default for LocalWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletClient for LocalWallet {
    async fn sign(&self, wallet_id: &str, digest: &[u8; 32]) -> Result<WalletSignature, ClientError> {
        let keypair = self
            .keys
            .get(wallet_id)
            .ok_or_else(|| ClientError::Rejected(format!("unknown wallet {wallet_id}")))?;

        Ok(WalletSignature {
            signature: keypair.sign(digest).to_hex(),
            public_key: keypair.public_key().to_hex(),
            signed_by: wallet_id.to_string(),
            algorithm: crate::config::SIGNING_ALGORITHM.to_string(),
        })
    }
}

/// An in-memory docket store keyed by `(register_id, docket_number)`.
///
/// Idempotent by construction: writing the same docket number twice keeps
/// the first write and still reports success, the contract real storage
/// backends must honor.
pub struct InMemoryChainStore {
    dockets: DashMap<(String, u64), Docket>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self {
            dockets: DashMap::new(),
        }
    }

    /// Fetches a stored docket.
    pub fn get(&self, register_id: &str, docket_number: u64) -> Option<Docket> {
        self.dockets
            .get(&(register_id.to_string(), docket_number))
            .map(|d| d.value().clone())
    }

    /// Number of dockets stored for a register.
    pub fn chain_length(&self, register_id: &str) -> usize {
        self.dockets
            .iter()
            .filter(|e| e.key().0 == register_id)
            .count()
    }
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegisterClient for InMemoryChainStore {
    async fn write_docket(&self, register_id: &str, docket: &Docket) -> Result<bool, ClientError> {
        self.dockets
            .entry((register_id.to_string(), docket.docket_number))
            .or_insert_with(|| docket.clone());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GENESIS_DOCKET_HASH;
    use crate::crypto::keys::{LedgerPublicKey, LedgerSignature};
    use crate::transaction::{RawPayload, TransactionBuilder};

    #[tokio::test]
    async fn static_directory_filters_inactive_validators() {
        let dir = StaticPeerDirectory::new(vec![
            ValidatorInfo {
                validator_id: "up".to_string(),
                endpoint: "a".to_string(),
                reputation_score: 0.9,
                is_active: true,
            },
            ValidatorInfo {
                validator_id: "down".to_string(),
                endpoint: "b".to_string(),
                reputation_score: 1.0,
                is_active: false,
            },
        ]);

        let active = dir.active_validators("reg").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].validator_id, "up");
    }

    #[tokio::test]
    async fn local_wallet_signs_verifiably() {
        let wallet = LocalWallet::new();
        let public_hex = wallet.add_wallet("v1");

        let digest = [7u8; 32];
        let sig = wallet.sign("v1", &digest).await.unwrap();

        assert_eq!(sig.public_key, public_hex);
        assert_eq!(sig.signed_by, "v1");

        let pk = LedgerPublicKey::from_hex(&sig.public_key).unwrap();
        let signature = LedgerSignature::from_hex(&sig.signature).unwrap();
        assert!(pk.verify(&digest, &signature));
    }

    #[tokio::test]
    async fn local_wallet_rejects_unknown_ids() {
        let wallet = LocalWallet::new();
        let result = wallet.sign("nobody", &[0u8; 32]).await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
    }

    #[tokio::test]
    async fn chain_store_write_is_idempotent() {
        let store = InMemoryChainStore::new();
        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        let tx = TransactionBuilder::new("reg", payload).build();
        let docket = Docket::build("reg", 1, GENESIS_DOCKET_HASH, &[tx]).unwrap();

        assert!(store.write_docket("reg", &docket).await.unwrap());
        assert!(store.write_docket("reg", &docket).await.unwrap());

        assert_eq!(store.chain_length("reg"), 1);
        assert_eq!(store.get("reg", 1).unwrap().hash_hex(), docket.hash_hex());
    }
}
