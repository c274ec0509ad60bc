//! # Transactions
//!
//! Construction, signing, and intake validation of ledger transactions.
//!
//! The flow: build ([`TransactionBuilder`]) -> sign
//! ([`signing::sign_transaction`]) -> submit ([`TransactionIntake::submit`]).
//! The payload travels as the exact JSON text the client produced
//! ([`RawPayload`]) and is hashed byte-for-byte; nothing in this module or
//! anywhere downstream ever re-serializes it.

pub mod builder;
pub mod intake;
pub mod payload;
pub mod signing;
pub mod types;

pub use builder::{Transaction, TransactionBuilder};
pub use intake::{IntakeError, SubmitReceipt, TransactionIntake};
pub use payload::RawPayload;
pub use signing::sign_transaction;
pub use types::{TransactionSignature, TransactionStatus};
