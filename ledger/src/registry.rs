//! # Register Directory
//!
//! In-memory runtime state for every register this node serves: the
//! register record, its mempool, the set of already-committed transaction
//! ids, the chain tip, and the exclusive build slot.
//!
//! Entries are handed out as `Arc<RegisterEntry>` so callers can hold one
//! across await points without pinning a map shard. The directory itself
//! is shared-nothing beyond the `DashMap`: per-register state serializes
//! on per-register locks, and work on different registers never contends.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{DEFAULT_MEMPOOL_CAPACITY, GENESIS_DOCKET_HASH};
use crate::mempool::Mempool;
use crate::register::{Register, RegisterStatus};

// ---------------------------------------------------------------------------
// ChainTip
// ---------------------------------------------------------------------------

/// The head of a register's docket chain.
///
/// `docket_number == 0` means no docket has committed yet; the hash is then
/// the genesis sentinel, which docket #1 links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTip {
    pub docket_number: u64,
    pub docket_hash: String,
}

impl ChainTip {
    fn genesis() -> Self {
        Self {
            docket_number: 0,
            docket_hash: GENESIS_DOCKET_HASH.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RegisterEntry
// ---------------------------------------------------------------------------

/// Runtime state for a single register.
pub struct RegisterEntry {
    /// The register record. Mutated only by the creation coordinator.
    register: RwLock<Register>,

    /// Pending transactions awaiting docket inclusion.
    pub mempool: Mempool,

    /// Ids of transactions already carried by a committed docket. Consulted
    /// by intake for duplicate rejection after a transaction leaves the
    /// mempool.
    committed: DashMap<String, ()>,

    /// Chain head. An async mutex: the pipeline holds it across the
    /// sign-and-write await to make read-tip/advance-tip atomic per build.
    pub chain: Mutex<ChainTip>,

    /// Exclusive build slot. `try_lock` wins or reports a build already in
    /// flight; never blocks intake.
    pub build_slot: Mutex<()>,
}

impl RegisterEntry {
    fn new(register: Register, mempool_capacity: usize) -> Self {
        Self {
            register: RwLock::new(register),
            mempool: Mempool::with_capacity(mempool_capacity),
            committed: DashMap::new(),
            chain: Mutex::new(ChainTip::genesis()),
            build_slot: Mutex::new(()),
        }
    }

    /// A point-in-time copy of the register record.
    pub fn snapshot(&self) -> Register {
        self.register.read().clone()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RegisterStatus {
        self.register.read().status
    }

    /// Updates the lifecycle status.
    pub fn set_status(&self, status: RegisterStatus) {
        self.register.write().status = status;
    }

    /// Returns `true` if the register accepts transactions.
    pub fn is_active(&self) -> bool {
        self.status() == RegisterStatus::Active
    }

    /// Records transaction ids as committed. Idempotent.
    pub fn record_committed(&self, tx_ids: &[String]) {
        for id in tx_ids {
            self.committed.insert(id.clone(), ());
        }
    }

    /// Returns `true` if the id was already committed in some docket.
    pub fn is_committed(&self, tx_id: &str) -> bool {
        self.committed.contains_key(tx_id)
    }
}

// ---------------------------------------------------------------------------
// RegisterDirectory
// ---------------------------------------------------------------------------

/// Concurrent map of all registers known to this node.
pub struct RegisterDirectory {
    registers: DashMap<String, Arc<RegisterEntry>>,
    mempool_capacity: usize,
}

impl RegisterDirectory {
    pub fn new() -> Self {
        Self::with_mempool_capacity(DEFAULT_MEMPOOL_CAPACITY)
    }

    /// Directory whose registers get mempools of the given capacity.
    pub fn with_mempool_capacity(mempool_capacity: usize) -> Self {
        Self {
            registers: DashMap::new(),
            mempool_capacity,
        }
    }

    /// Inserts a register and returns its entry. Overwrites nothing: if
    /// the id already exists, the existing entry is returned untouched.
    pub fn insert(&self, register: Register) -> Arc<RegisterEntry> {
        let id = register.register_id.clone();
        self.registers
            .entry(id)
            .or_insert_with(|| Arc::new(RegisterEntry::new(register, self.mempool_capacity)))
            .clone()
    }

    /// Looks up a register entry by id.
    pub fn get(&self, register_id: &str) -> Option<Arc<RegisterEntry>> {
        self.registers.get(register_id).map(|e| e.value().clone())
    }

    /// Ids of all registers currently `Active`. Used by the scheduled
    /// build sweep.
    pub fn active_register_ids(&self) -> Vec<String> {
        self.registers
            .iter()
            .filter(|e| e.value().is_active())
            .map(|e| e.key().clone())
            .collect()
    }

    /// Total number of registers, in any status.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl Default for RegisterDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
