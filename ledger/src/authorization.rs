//! # Submission Policies
//!
//! Governance hook consulted before any cryptographic validation: may this
//! transaction class be submitted to this register at all? Policy says no,
//! nothing else runs -- the rejection is a governance decision, not a
//! validation failure, and the node surfaces it as such.

use crate::register::Register;
use crate::transaction::Transaction;

/// Decides whether a transaction class may be submitted to a register.
///
/// Implementations must be cheap and infallible: this runs on every submit,
/// before signature checks, and has no business doing I/O.
pub trait RegisterPolicy: Send + Sync {
    fn can_submit(&self, register: &Register, tx: &Transaction) -> bool;
}

/// Accepts everything. The default for single-tenant deployments.
pub struct AllowAll;

impl RegisterPolicy for AllowAll {
    fn can_submit(&self, _register: &Register, _tx: &Transaction) -> bool {
        true
    }
}

/// Rejects everything. Useful for draining a register before
/// decommissioning, and for tests.
pub struct DenyAll;

impl RegisterPolicy for DenyAll {
    fn can_submit(&self, _register: &Register, _tx: &Transaction) -> bool {
        false
    }
}

/// Accepts only transactions whose blueprint id is on the list.
pub struct BlueprintAllowlist {
    allowed: Vec<String>,
}

impl BlueprintAllowlist {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

impl RegisterPolicy for BlueprintAllowlist {
    fn can_submit(&self, _register: &Register, tx: &Transaction) -> bool {
        self.allowed.iter().any(|b| b == &tx.blueprint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::RegisterStatus;
    use crate::transaction::{RawPayload, TransactionBuilder};
    use chrono::Utc;

    fn register() -> Register {
        Register {
            register_id: "reg".to_string(),
            name: "r".to_string(),
            description: String::new(),
            owners: vec![],
            status: RegisterStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn tx(blueprint: &str) -> Transaction {
        let payload = RawPayload::from_string("{}".to_string()).unwrap();
        TransactionBuilder::new("reg", payload)
            .blueprint(blueprint)
            .build()
    }

    #[test]
    fn allow_all_allows() {
        assert!(AllowAll.can_submit(&register(), &tx("anything")));
    }

    #[test]
    fn deny_all_denies() {
        assert!(!DenyAll.can_submit(&register(), &tx("anything")));
    }

    #[test]
    fn allowlist_matches_blueprint_exactly() {
        let policy = BlueprintAllowlist::new(vec!["bp-orders".to_string()]);
        assert!(policy.can_submit(&register(), &tx("bp-orders")));
        assert!(!policy.can_submit(&register(), &tx("bp-orders-v2")));
        assert!(!policy.can_submit(&register(), &tx("")));
    }
}
