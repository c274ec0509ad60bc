//! # Platform Configuration & Constants
//!
//! Every magic number in Keystone lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Most of these values are wire-visible: the genesis sentinel, hash
//! lengths, and signing algorithm names are part of what external wallets
//! and validators interoperate against. Changing them after registers go
//! live breaks every existing chain, so choose wisely.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// The `previous_docket_hash` of docket #1 on every register.
///
/// 64 lowercase hex zeros -- the same width as a real SHA-256 digest, so
/// chain-walking code never needs a special case for the first link.
pub const GENESIS_DOCKET_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Maximum number of transactions assembled into a single docket.
///
/// Keeps the Merkle tree, the signing digest, and the durable write
/// bounded. Anything left in the mempool is picked up by the next build.
pub const MAX_TRANSACTIONS_PER_DOCKET: usize = 256;

/// Docket numbering starts here. Docket #1 links to the genesis sentinel;
/// a chain tip of 0 means "no dockets committed yet".
pub const FIRST_DOCKET_NUMBER: u64 = 1;

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// Maximum pending transactions per register.
///
/// Once full, intake rejects with a capacity-exceeded signal -- backpressure,
/// never silent dropping or unbounded queueing.
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 10_000;

// ---------------------------------------------------------------------------
// Collaborator Calls
// ---------------------------------------------------------------------------

/// Upper bound on any single call to the Peer, Wallet, or Register
/// collaborators. Expiry is treated exactly like a signing/write failure:
/// the docket is discarded and its transactions stay in the mempool.
pub const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of attempts for the durable docket write before the failure is
/// reported. The write must be idempotent per docket number, so retrying
/// a possibly-applied write is safe.
pub const WRITE_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for the write retry backoff. Doubles per attempt:
/// 100ms, 200ms, 400ms.
pub const WRITE_RETRY_BACKOFF: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// The only signature algorithm the platform accepts, for transactions
/// and attestations alike. Wire value is matched case-insensitively.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes. Always 64.
pub const SIGNATURE_LENGTH: usize = 64;

/// SHA-256 digest length in bytes. Payload hashes, docket hashes, and
/// attestation digests are all this wide (128 hex chars would mean
/// someone switched algorithms without telling the rest of the network).
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Register-creation nonce length in bytes (hex-encoded on the wire).
pub const NONCE_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default REST API port.
pub const DEFAULT_RPC_PORT: u16 = 8460;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 8461;

/// Platform version string, reported by `/status` and the CLI.
pub const PLATFORM_VERSION: &str = "0.1.0";
