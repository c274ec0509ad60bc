//! Raw payload capture.
//!
//! The platform's oldest invariant: a payload is hashed as the exact bytes
//! the client sent, and those bytes are never re-serialized. Parsing JSON
//! and printing it back is not identity (key order, whitespace, number
//! formatting all drift), and any drift silently changes the payload hash
//! the client signed against.
//!
//! [`RawPayload`] wraps `serde_json::value::RawValue`: serde validates the
//! JSON on the way in but keeps the original text verbatim, and serializes
//! it back out byte-for-byte. The hot path never re-encodes.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

use crate::crypto::hash::sha256_hex;

/// A client payload held as the exact JSON text received.
///
/// Cloning is cheap-ish (one boxed string copy); equality compares the
/// underlying text, so two payloads with the same meaning but different
/// formatting are NOT equal. That is intentional: the hash wouldn't match
/// either.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Box<RawValue>);

impl RawPayload {
    /// Wraps a JSON string without altering it. Fails if the text is not
    /// valid JSON.
    pub fn from_string(json: String) -> Result<Self, serde_json::Error> {
        Ok(Self(RawValue::from_string(json)?))
    }

    /// Builds a payload from a `serde_json::Value`.
    ///
    /// This DOES serialize, so it belongs in tests and internal tooling
    /// only. Anything arriving over the wire must come through serde
    /// deserialization or [`RawPayload::from_string`].
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::from_string(serde_json::to_string(value)?)
    }

    /// The exact received bytes. This is the hashing input, full stop.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    /// The exact received text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    /// SHA-256 of the exact received bytes, lowercase hex.
    pub fn hash_hex(&self) -> String {
        sha256_hex(self.as_bytes())
    }
}

impl PartialEq for RawPayload {
    fn eq(&self, other: &Self) -> bool {
        self.0.get() == other.0.get()
    }
}

impl Eq for RawPayload {}

impl fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPayload({})", self.0.get())
    }
}
