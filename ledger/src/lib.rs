//! # Keystone Ledger
//!
//! Core library for the Keystone multi-tenant ledger platform: per-register
//! transaction intake, mempool, docket assembly, validator signing, and
//! durable chain commitment.
//!
//! ## Architecture
//!
//! ```text
//!   submit ──> TransactionIntake ──> Mempool (per register)
//!                                       │ peek (non-destructive)
//!                                       v
//!   trigger ─> DocketPipeline: BUILD ─> SIGN ─> COMMIT ─> purge mempool
//!                                │        │        │
//!                                │   WalletClient  RegisterClient
//!                              Merkle  (external)  (durable append)
//! ```
//!
//! Registers come into existence through the three-phase creation protocol
//! in [`register::creation`]; collaborators (peer discovery, wallet
//! signing, durable writes) are injected behind the traits in [`clients`].
//!
//! Two invariants shape everything here:
//!
//! - A payload is hashed as the exact bytes received and is never
//!   re-serialized ([`transaction::RawPayload`]).
//! - Nothing destructive happens before the durable write confirms
//!   ([`pipeline`]).

pub mod authorization;
pub mod clients;
pub mod config;
pub mod crypto;
pub mod docket;
pub mod mempool;
pub mod pipeline;
pub mod register;
pub mod registry;
pub mod transaction;

pub use authorization::{AllowAll, BlueprintAllowlist, DenyAll, RegisterPolicy};
pub use clients::{
    ClientError, InMemoryChainStore, LocalWallet, PeerClient, RegisterClient,
    StaticPeerDirectory, ValidatorInfo, WalletClient, WalletSignature,
};
pub use docket::{Docket, DocketError, DocketSignature, DocketStatus};
pub use mempool::{Mempool, MempoolError};
pub use pipeline::{BuildOutcome, CommittedDocket, DocketPipeline, PipelineConfig, PipelineError};
pub use register::{
    AttestationChallenge, CreationError, InitiateOutcome, Register, RegisterCreationCoordinator,
    RegisterOwner, RegisterStatus, SignedAttestation,
};
pub use registry::{ChainTip, RegisterDirectory, RegisterEntry};
pub use transaction::{
    IntakeError, RawPayload, SubmitReceipt, Transaction, TransactionBuilder, TransactionIntake,
    TransactionSignature, TransactionStatus,
};
