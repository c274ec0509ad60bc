//! # Hashing Utilities
//!
//! SHA-256 helpers and the binary Merkle tree used for docket roots.
//!
//! ## On hash function choice
//!
//! SHA-256 everywhere. Payload hashes are SHA-256 over the exact received
//! bytes by contract with every client SDK, and the docket chain reuses the
//! same function so a verifier only ever needs one primitive. Resist the
//! urge to add a faster internal hash -- the moment two algorithms exist,
//! someone feeds the wrong one to the wrong field and the chain forks.
//!
//! ## Merkle odd-count rule
//!
//! When a tree level has an odd number of hashes, the last hash is promoted
//! unchanged to the next level. NOT duplicated -- promotion means a single
//! leaf is its own root, and no hash is ever paired with itself. This rule
//! is load-bearing for cross-node root equality; it is pinned by tests
//! below and must never change once registers are live.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns the 32-byte digest as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 and return the digest as lowercase hex.
///
/// This is the wire representation of every hash in the system: payload
/// hashes, transaction ids, docket hashes, attestation digests.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeding the parts sequentially into the hasher yields the same digest
/// as hashing the concatenation, minus the temporary buffer. Used for
/// composite digests like `(merkle_root || docket_number || prev_hash)`.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compute a binary Merkle root over a list of leaf hashes.
///
/// Adjacent leaves are paired and hashed (`SHA256(left || right)`); when a
/// level has an odd count, the last hash is promoted unchanged to the next
/// level (see the module docs -- this exact rule is fixed). Consequences:
///
/// - a single leaf is its own root (no self-pairing),
/// - an empty input returns all zeros, the "empty tree" sentinel. Callers
///   building dockets never pass an empty list -- an empty mempool is a
///   no-op before any hashing happens.
///
/// The root is a pure function of the ordered leaf list: same leaves, same
/// order, same root. Reordering changes the root.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for chunk in level.chunks(2) {
            if chunk.len() == 2 {
                next.push(sha256_multi(&[&chunk[0], &chunk[1]]));
            } else {
                // Odd element -- promoted unchanged.
                next.push(chunk[0]);
            }
        }
        level = next;
    }

    level[0]
}

/// Decode a lowercase-hex SHA-256 digest into its 32-byte form.
///
/// Returns `None` for anything that is not exactly 64 hex characters.
pub fn digest_from_hex(s: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}
