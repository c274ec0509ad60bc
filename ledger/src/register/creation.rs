//! Three-phase register creation.
//!
//! 1. **Initiate**: the platform mints a register id and a one-time nonce,
//!    and hands every declared owner an attestation digest to sign.
//! 2. **Attest** (off-platform): each owner signs their digest with their
//!    own wallet. The platform is not involved.
//! 3. **Finalize**: the signed attestations come back; the platform
//!    recomputes every digest from its own records, verifies every
//!    signature, and activates the register.
//!
//! The nonce is single-use in the strictest sense: finalize consumes it
//! before looking at anything else, so a replayed or concurrent finalize
//! finds nothing to consume. A failed finalize therefore cannot be
//! retried -- the register lands in `Rejected` (terminal) and creation
//! starts over from initiate. Replay-safety beats convenience here.

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::PeerClient;
use crate::config::NONCE_LENGTH;
use crate::crypto::hash::{digest_from_hex, sha256_hex};
use crate::crypto::keys::{LedgerPublicKey, LedgerSignature};
use crate::registry::RegisterDirectory;

use super::{Register, RegisterOwner, RegisterStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Ways a creation phase can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreationError {
    #[error("register {0} does not exist")]
    UnknownRegister(String),

    #[error("the creation nonce for register {0} was already consumed")]
    NonceConsumed(String),

    #[error("presented nonce does not match the issued challenge")]
    NonceMismatch,

    #[error("owner {0} did not attest")]
    MissingAttestation(String),

    #[error("attestation from unknown wallet {0}")]
    UnknownAttester(String),

    #[error("attestation from wallet {0} failed verification")]
    InvalidAttestationSignature(String),

    #[error("a register needs at least one owner")]
    NoOwners,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// What one owner must sign, as issued at initiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationChallenge {
    pub owner_id: String,
    pub wallet_id: String,
    pub role: String,

    /// The digest to sign: `sha256(register_id \0 nonce \0 role)`,
    /// lowercase hex. Finalize recomputes this server-side; the value here
    /// is a convenience for the signing wallet, never trusted input.
    pub data_to_sign: String,
}

/// One owner's signed attestation, presented at finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAttestation {
    pub role: String,
    pub wallet_id: String,

    /// Hex-encoded public key of the attesting wallet.
    pub public_key: String,

    /// Hex-encoded Ed25519 signature over the decoded attestation digest.
    pub signature: String,
}

/// Result of a successful initiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateOutcome {
    pub register_id: String,
    pub nonce: String,
    pub attestations_to_sign: Vec<AttestationChallenge>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Pending challenge state between initiate and finalize.
struct PendingCreation {
    nonce: String,
    owners: Vec<RegisterOwner>,
}

/// Drives the three-phase creation protocol.
pub struct RegisterCreationCoordinator {
    directory: Arc<RegisterDirectory>,
    peers: Arc<dyn PeerClient>,
    pending: DashMap<String, PendingCreation>,
}

impl RegisterCreationCoordinator {
    pub fn new(directory: Arc<RegisterDirectory>, peers: Arc<dyn PeerClient>) -> Self {
        Self {
            directory,
            peers,
            pending: DashMap::new(),
        }
    }

    /// The attestation digest for one owner role, lowercase hex.
    ///
    /// Binds the register, the one-time nonce, and the role: a signature
    /// cannot be replayed across registers, across creation attempts, or
    /// across roles within one attempt.
    fn attestation_digest(register_id: &str, nonce: &str, role: &str) -> String {
        let mut buf =
            Vec::with_capacity(register_id.len() + nonce.len() + role.len() + 2);
        buf.extend_from_slice(register_id.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(nonce.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(role.as_bytes());
        sha256_hex(&buf)
    }

    /// Phase one: mint the register, issue the challenge.
    pub fn initiate(
        &self,
        name: &str,
        description: &str,
        owners: Vec<RegisterOwner>,
    ) -> Result<InitiateOutcome, CreationError> {
        if owners.is_empty() {
            return Err(CreationError::NoOwners);
        }

        let register_id = Uuid::new_v4().to_string();

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        let register = Register {
            register_id: register_id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            owners: owners.clone(),
            status: RegisterStatus::Initiating,
            created_at: chrono::Utc::now(),
        };
        let entry = self.directory.insert(register);

        let attestations_to_sign = owners
            .iter()
            .map(|owner| AttestationChallenge {
                owner_id: owner.owner_id.clone(),
                wallet_id: owner.wallet_id.clone(),
                role: owner.role.clone(),
                data_to_sign: Self::attestation_digest(&register_id, &nonce, &owner.role),
            })
            .collect();

        self.pending.insert(
            register_id.clone(),
            PendingCreation {
                nonce: nonce.clone(),
                owners,
            },
        );
        entry.set_status(RegisterStatus::AwaitingAttestations);

        info!(register_id = %register_id, "register creation initiated");

        Ok(InitiateOutcome {
            register_id,
            nonce,
            attestations_to_sign,
        })
    }

    /// Phase three: verify everything, flip the register `Active`.
    ///
    /// The pending entry is removed from the map up front -- that removal
    /// is the compare-and-swap. Exactly one finalize per creation attempt
    /// gets the entry; everyone else, concurrent or replayed, gets
    /// `NonceConsumed`.
    pub async fn finalize(
        &self,
        register_id: &str,
        nonce: &str,
        attestations: &[SignedAttestation],
    ) -> Result<Register, CreationError> {
        let entry = self
            .directory
            .get(register_id)
            .ok_or_else(|| CreationError::UnknownRegister(register_id.to_string()))?;

        let (_, pending) = self
            .pending
            .remove(register_id)
            .ok_or_else(|| CreationError::NonceConsumed(register_id.to_string()))?;

        // From here on, any failure rejects the register: the nonce is
        // gone and there is no partial state to resume from.
        match self.verify_attestations(register_id, nonce, &pending, attestations) {
            Ok(()) => {}
            Err(e) => {
                entry.set_status(RegisterStatus::Rejected);
                warn!(register_id = %register_id, error = %e, "register creation rejected");
                return Err(e);
            }
        }

        entry.set_status(RegisterStatus::Active);
        info!(register_id = %register_id, "register activated");

        // Best-effort gossip. Activation stands even if nobody is
        // listening yet.
        if let Err(e) = self.peers.advertise_register(register_id).await {
            warn!(register_id = %register_id, error = %e, "register advertisement failed");
        }

        Ok(entry.snapshot())
    }

    fn verify_attestations(
        &self,
        register_id: &str,
        nonce: &str,
        pending: &PendingCreation,
        attestations: &[SignedAttestation],
    ) -> Result<(), CreationError> {
        if nonce != pending.nonce {
            return Err(CreationError::NonceMismatch);
        }

        // No extras from wallets we never challenged.
        for attestation in attestations {
            if !pending
                .owners
                .iter()
                .any(|o| o.wallet_id == attestation.wallet_id)
            {
                return Err(CreationError::UnknownAttester(
                    attestation.wallet_id.clone(),
                ));
            }
        }

        // Every declared owner attested, and every signature verifies
        // against the digest WE recompute. The digest the client saw at
        // initiate never enters this check.
        for owner in &pending.owners {
            let attestation = attestations
                .iter()
                .find(|a| a.wallet_id == owner.wallet_id && a.role == owner.role)
                .ok_or_else(|| CreationError::MissingAttestation(owner.owner_id.clone()))?;

            let expected_hex = Self::attestation_digest(register_id, nonce, &owner.role);
            let digest = digest_from_hex(&expected_hex).ok_or_else(|| {
                CreationError::InvalidAttestationSignature(owner.wallet_id.clone())
            })?;

            let verified = LedgerPublicKey::from_hex(&attestation.public_key)
                .ok()
                .zip(LedgerSignature::from_hex(&attestation.signature).ok())
                .map(|(pk, sig)| pk.verify(&digest, &sig))
                .unwrap_or(false);

            if !verified {
                return Err(CreationError::InvalidAttestationSignature(
                    owner.wallet_id.clone(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
