//! Firma signing state machine.
//!
//! Enforces the per-signatory progression
//! `PENDING_IDENTITY -> IDENTITY_VERIFIED -> SUBMITTED` and the
//! at-most-once completion guarantee. Every state-changing transition
//! appends to the audit ledger in the same logical operation; the
//! notification side channel is detached and can never roll back a
//! committed signature.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod machine;
mod notify;

pub use machine::{
    CommitSignatureRequest, SignatureReceipt, SignerView, SigningStateMachine,
    VerifyIdentityRequest, IdentityVerification,
};
pub use notify::{NotifyError, NotifyEvent, Notifier, NullNotifier, RecordingNotifier};

use firma_identity::ValidationError;
use firma_ledger::LedgerError;
use firma_storage::StorageError;
use thiserror::Error;

/// Result type for workflow transitions.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Workflow outcomes that are not a success.
///
/// `Validation` and `IdentityMismatch` are expected, retryable outcomes;
/// `TokenNotFound` and `AlreadyCompleted` are terminal for the session;
/// `Storage` and `Ledger` surface as retryable server errors and always
/// mean the transition did not commit.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("signing token not found")]
    TokenNotFound,

    #[error("document not found")]
    DocumentNotFound,

    #[error("document has already been signed")]
    AlreadyCompleted,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("required capture field missing: {0}")]
    MissingCapture(&'static str),

    // One generic message whatever field failed, so a guesser learns
    // nothing; the distinction is logged internally.
    #[error("supplied data does not match the registered signatory")]
    IdentityMismatch,

    #[error("storage failure: {0}")]
    Storage(StorageError),

    #[error("audit ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}
