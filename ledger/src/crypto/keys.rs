//! # Ed25519 Key Wrappers
//!
//! Keypair generation, hex serialization, and strict verification for every
//! signing identity the platform touches: transaction submitters, register
//! owners attesting a creation, and validator wallets signing dockets.
//!
//! The platform never stores or generates keys on behalf of anyone -- wallet
//! custody is an external collaborator. These wrappers exist so the rest of
//! the codebase verifies signatures through one audited path instead of
//! sprinkling `ed25519_dalek` calls everywhere.
//!
//! Key bytes are never logged. If you add logging to this module, you will
//! be asked to leave.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use crate::config::{SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH};

/// Errors from key and signature decoding.
///
/// Intentionally vague about *why* something failed -- leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: wrong length or not valid hex")]
    InvalidSecretKey,

    #[error("invalid public key: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature encoding: expected {SIGNATURE_LENGTH} bytes of hex")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// LedgerKeypair
// ---------------------------------------------------------------------------

/// An Ed25519 keypair.
///
/// Used by the local wallet implementation and by tests; production
/// deployments keep signing keys inside the external wallet service and
/// this type never leaves the process.
///
/// Deliberately does NOT implement `Serialize`/`Deserialize` -- serializing
/// private keys should be a conscious act, not something that happens
/// because a keypair ended up inside a JSON response. Use
/// `secret_key_hex()` explicitly if you must.
pub struct LedgerKeypair {
    signing_key: SigningKey,
}

impl LedgerKeypair {
    /// Generate a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&arr),
        })
    }

    /// The public half of this keypair, safe to share.
    pub fn public_key(&self) -> LedgerPublicKey {
        LedgerPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message.
    ///
    /// Ed25519 signatures are deterministic -- the same (key, message) pair
    /// always produces the same signature. No nonce management at signing
    /// time, and no RNG-failure key leakage.
    pub fn sign(&self, message: &[u8]) -> LedgerSignature {
        LedgerSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Export the secret key as hex. **Handle with extreme care.**
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for LedgerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, even in debug output.
        f.debug_struct("LedgerKeypair")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// LedgerPublicKey
// ---------------------------------------------------------------------------

/// An Ed25519 verifying key, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LedgerPublicKey {
    bytes: [u8; VERIFYING_KEY_LENGTH],
}

impl LedgerPublicKey {
    /// Decode a public key from lowercase or uppercase hex.
    ///
    /// Rejects byte strings that are the right length but not a valid
    /// curve point -- `verify` on a garbage key would always return false
    /// anyway, but failing early gives the caller a better rejection reason.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidPublicKey)?;
        let arr: [u8; VERIFYING_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes: arr })
    }

    /// Hex-encode the key (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verify a signature over a message.
    ///
    /// Uses `verify_strict`, which additionally rejects small-order and
    /// mixed-order points. Returns plain `false` on any failure -- callers
    /// decide what rejection reason to surface.
    pub fn verify(&self, message: &[u8], signature: &LedgerSignature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        key.verify_strict(message, &sig).is_ok()
    }
}

impl fmt::Debug for LedgerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// LedgerSignature
// ---------------------------------------------------------------------------

/// An Ed25519 signature, always exactly 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LedgerSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl LedgerSignature {
    /// Decode a signature from hex. Rejects anything that is not exactly
    /// 64 bytes -- there is no such thing as a short Ed25519 signature.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSignature)?;
        let arr: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self { bytes: arr })
    }

    /// Hex-encode the signature (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for LedgerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
