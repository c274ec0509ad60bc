//! # Cryptographic Primitives
//!
//! Everything here is SHA-256 and Ed25519. One hash, one signature scheme,
//! and a refusal to support more without a very good reason: every digest
//! in this system is wire-visible to external wallets and validators, and
//! a second algorithm doubles the interop surface for zero security gain.

pub mod hash;
pub mod keys;

pub use hash::{merkle_root, sha256, sha256_hex, sha256_multi};
pub use keys::{LedgerKeypair, LedgerPublicKey, LedgerSignature};
