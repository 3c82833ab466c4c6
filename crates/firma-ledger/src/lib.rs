//! Firma audit ledger - append-only, hash-chained record of every
//! state-changing action.
//!
//! Each record's hash input includes the previous record's hash, so a
//! single modified or deleted event breaks verifiability of every
//! subsequent event. The chain is global across all documents: one tail,
//! one serialized append section.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod chain;
mod event;
mod ledger;
mod store;

pub use chain::{compute_record_hash, verify_chain, ChainVerification};
pub use event::{payloads, AuditAction, AuditAppend, AuditEvent};
pub use ledger::AuditLedger;
pub use store::{AuditStore, MemoryAuditStore};

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger errors. An append failure is a correctness violation for the
/// enclosing business operation, never a best-effort log miss.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("audit event not found: sequence {0}")]
    NotFound(u64),

    #[error("invalid sequence range: {from}..={to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("ledger backend error: {0}")]
    Backend(String),
}
