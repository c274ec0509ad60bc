//! # Per-Register Mempool
//!
//! Bounded holding pen for validated transactions awaiting docket inclusion.
//!
//! ## Design
//!
//! Two synchronized indexes:
//!
//! 1. A `DashMap` keyed by transaction id for O(1) lookup and duplicate
//!    detection.
//! 2. A `BTreeMap` keyed by a composite ordering key for drain ordering.
//!
//! The ordering key inverts the priority (`u32::MAX - priority`) so that the
//! BTreeMap's natural ascending iteration yields highest priority first,
//! then oldest first, then lexicographically smallest transaction id. The
//! id tiebreaker makes the drain order a total order: two transactions can
//! never be "equal", so every node assembling from the same pool contents
//! produces the same sequence.
//!
//! ## Capacity
//!
//! A full pool rejects new transactions outright. No eviction, ever: every
//! accepted transaction either commits or stays pending. Dropping a
//! transaction the platform already said yes to would break the durability
//! story clients rely on.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::DEFAULT_MEMPOOL_CAPACITY;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a transaction can be refused by the pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} is already pending")]
    Duplicate(String),

    #[error("mempool is full ({0} transactions)")]
    CapacityExceeded(usize),
}

// ---------------------------------------------------------------------------
// PoolKey
// ---------------------------------------------------------------------------

/// Composite ordering key for the priority index.
///
/// Field order is the sort order. `inverted_priority` ascends as real
/// priority descends, so `BTreeMap` iteration walks highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PoolKey {
    inverted_priority: u32,
    created_at_ms: i64,
    tx_id: String,
}

impl PoolKey {
    fn for_transaction(tx: &Transaction) -> Self {
        Self {
            inverted_priority: u32::MAX - tx.priority,
            created_at_ms: tx.created_at.timestamp_millis(),
            tx_id: tx.transaction_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// Bounded, priority-ordered transaction pool for a single register.
///
/// All operations are safe under concurrent intake; the order index's write
/// lock is the single serialization point for mutations.
pub struct Mempool {
    /// Primary index: transaction id -> transaction.
    entries: DashMap<String, Transaction>,

    /// Drain-order index: composite key -> transaction id.
    order: RwLock<BTreeMap<PoolKey, String>>,

    capacity: usize,
}

impl Mempool {
    /// Creates a pool with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMPOOL_CAPACITY)
    }

    /// Creates a pool with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: RwLock::new(BTreeMap::new()),
            capacity,
        }
    }

    /// Adds a validated transaction to the pool.
    ///
    /// Capacity and duplicate checks happen under the order-index write
    /// lock together with the insert, so two concurrent adds of the same
    /// transaction (or two adds racing for the last slot) resolve cleanly:
    /// exactly one wins.
    pub fn add(&self, tx: Transaction) -> Result<(), MempoolError> {
        let key = PoolKey::for_transaction(&tx);
        let tx_id = tx.transaction_id.clone();

        let mut order = self.order.write();

        if order.len() >= self.capacity {
            return Err(MempoolError::CapacityExceeded(self.capacity));
        }
        if self.entries.contains_key(&tx_id) {
            return Err(MempoolError::Duplicate(tx_id));
        }

        self.entries.insert(tx_id.clone(), tx);
        order.insert(key, tx_id);
        Ok(())
    }

    /// Returns up to `limit` transactions in drain order without removing
    /// them.
    ///
    /// Removal happens only after the docket carrying them durably commits;
    /// peeking keeps the failure path trivially non-destructive.
    pub fn peek(&self, limit: usize) -> Vec<Transaction> {
        let order = self.order.read();
        order
            .values()
            .take(limit)
            .filter_map(|id| self.entries.get(id).map(|e| e.value().clone()))
            .collect()
    }

    /// Removes the given transactions after their docket committed.
    ///
    /// Ids not present are ignored (another build may have raced the same
    /// commit on restart replay). Returns how many were actually removed.
    pub fn remove_committed(&self, tx_ids: &[String]) -> usize {
        let mut order = self.order.write();
        let mut removed = 0;

        for id in tx_ids {
            if let Some((_, tx)) = self.entries.remove(id) {
                order.remove(&PoolKey::for_transaction(&tx));
                removed += 1;
            }
        }

        removed
    }

    /// Returns `true` if the given transaction id is pending.
    pub fn contains(&self, tx_id: &str) -> bool {
        self.entries.contains_key(tx_id)
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    /// Returns `true` if no transactions are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{RawPayload, TransactionBuilder};
    use chrono::{TimeZone, Utc};

    fn tx_with(priority: u32, created_ms: i64, marker: &str) -> Transaction {
        let payload =
            RawPayload::from_string(format!(r#"{{"marker":"{marker}"}}"#)).unwrap();
        TransactionBuilder::new("reg-test", payload)
            .blueprint("bp")
            .action("act")
            .priority(priority)
            .created_at(Utc.timestamp_millis_opt(created_ms).unwrap())
            .build()
    }

    #[test]
    fn add_and_peek_roundtrip() {
        let pool = Mempool::new();
        let tx = tx_with(5, 1_000, "a");
        let id = tx.transaction_id.clone();

        pool.add(tx).unwrap();

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&id));
        assert_eq!(pool.peek(10)[0].transaction_id, id);
    }

    #[test]
    fn rejects_duplicates() {
        let pool = Mempool::new();
        let tx = tx_with(1, 1_000, "dup");
        let id = tx.transaction_id.clone();

        pool.add(tx.clone()).unwrap();
        assert_eq!(pool.add(tx), Err(MempoolError::Duplicate(id)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn rejects_when_full() {
        let pool = Mempool::with_capacity(2);
        pool.add(tx_with(1, 1_000, "a")).unwrap();
        pool.add(tx_with(1, 2_000, "b")).unwrap();

        assert_eq!(
            pool.add(tx_with(9, 3_000, "c")),
            Err(MempoolError::CapacityExceeded(2))
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn drains_highest_priority_first() {
        let pool = Mempool::new();
        pool.add(tx_with(1, 1_000, "low")).unwrap();
        pool.add(tx_with(9, 2_000, "high")).unwrap();
        pool.add(tx_with(5, 3_000, "mid")).unwrap();

        let drained = pool.peek(10);
        let priorities: Vec<u32> = drained.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![9, 5, 1]);
    }

    #[test]
    fn equal_priority_drains_oldest_first() {
        let pool = Mempool::new();
        let newer = tx_with(3, 5_000, "newer");
        let older = tx_with(3, 1_000, "older");
        let older_id = older.transaction_id.clone();

        pool.add(newer).unwrap();
        pool.add(older).unwrap();

        assert_eq!(pool.peek(10)[0].transaction_id, older_id);
    }

    #[test]
    fn full_tie_breaks_on_transaction_id() {
        let pool = Mempool::new();
        // Same priority, same timestamp, ids differ through the payload.
        let a = tx_with(3, 1_000, "x");
        let b = tx_with(3, 1_000, "y");
        let mut expected = vec![a.transaction_id.clone(), b.transaction_id.clone()];
        expected.sort();

        pool.add(a).unwrap();
        pool.add(b).unwrap();

        let drained: Vec<String> = pool
            .peek(10)
            .into_iter()
            .map(|t| t.transaction_id)
            .collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn peek_respects_limit_and_does_not_remove() {
        let pool = Mempool::new();
        for i in 0..5 {
            pool.add(tx_with(1, 1_000 + i, &format!("m{i}"))).unwrap();
        }

        assert_eq!(pool.peek(3).len(), 3);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn remove_committed_purges_both_indexes() {
        let pool = Mempool::new();
        let tx = tx_with(1, 1_000, "gone");
        let id = tx.transaction_id.clone();
        pool.add(tx).unwrap();
        pool.add(tx_with(1, 2_000, "stays")).unwrap();

        let removed = pool.remove_committed(&[id.clone()]);

        assert_eq!(removed, 1);
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&id));
        assert!(!pool
            .peek(10)
            .iter()
            .any(|t| t.transaction_id == id));
    }

    #[test]
    fn remove_committed_ignores_unknown_ids() {
        let pool = Mempool::new();
        pool.add(tx_with(1, 1_000, "a")).unwrap();

        let removed = pool.remove_committed(&["not-a-real-id".to_string()]);
        assert_eq!(removed, 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn capacity_frees_up_after_removal() {
        let pool = Mempool::with_capacity(1);
        let tx = tx_with(1, 1_000, "a");
        let id = tx.transaction_id.clone();
        pool.add(tx).unwrap();

        pool.remove_committed(&[id]);
        pool.add(tx_with(1, 2_000, "b")).unwrap();
        assert_eq!(pool.len(), 1);
    }
}
