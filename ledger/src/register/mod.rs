//! # Registers
//!
//! A register is a tenant's append-only ledger: its own transaction stream,
//! its own docket chain, its own owner set. Registers are created through a
//! three-phase attestation handshake (see [`creation`]) and only accept
//! transactions once `Active`.

pub mod creation;

pub use creation::{
    AttestationChallenge, CreationError, InitiateOutcome, RegisterCreationCoordinator,
    SignedAttestation,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RegisterStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a register.
///
/// ```text
/// Initiating -> AwaitingAttestations -> Active
///                                    \-> Rejected (terminal)
/// ```
///
/// `Rejected` is terminal: the creation nonce is consumed the moment
/// finalize begins, so a failed finalize cannot be retried. Start over
/// with a fresh initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterStatus {
    /// Initiate has been called; the challenge is being assembled.
    Initiating,
    /// Challenge issued; waiting for owners to sign their attestations.
    AwaitingAttestations,
    /// Creation finalized. The register accepts transactions.
    Active,
    /// Finalize failed. Terminal.
    Rejected,
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiating => write!(f, "Initiating"),
            Self::AwaitingAttestations => write!(f, "AwaitingAttestations"),
            Self::Active => write!(f, "Active"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// RegisterOwner
// ---------------------------------------------------------------------------

/// One owning party of a register.
///
/// Every owner must attest during creation. The `role` string is part of
/// the attestation digest, so an owner cannot sign for a role they were
/// not assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOwner {
    /// Stable identifier for the owning party.
    pub owner_id: String,

    /// The wallet that signs this owner's attestation.
    pub wallet_id: String,

    /// The owner's role on the register (e.g. "issuer", "auditor").
    pub role: String,
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// The durable record of a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    /// Platform-assigned identifier (UUID v4).
    pub register_id: String,

    /// Human-readable name.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// The owning parties. Never empty for a register that reached
    /// `AwaitingAttestations`.
    pub owners: Vec<RegisterOwner>,

    /// Lifecycle state.
    pub status: RegisterStatus,

    /// When initiate was called.
    pub created_at: DateTime<Utc>,
}

impl Register {
    /// Returns `true` if the register accepts transactions.
    pub fn is_active(&self) -> bool {
        self.status == RegisterStatus::Active
    }

    /// Finds an owner by role.
    pub fn owner_with_role(&self, role: &str) -> Option<&RegisterOwner> {
        self.owners.iter().find(|o| o.role == role)
    }
}
