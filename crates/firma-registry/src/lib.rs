//! Firma registry - owns creation and read access to documents and
//! signatories, and mints the per-signatory capability tokens.
//!
//! The registry is pure data access: it never writes audit events. The
//! signing state machine orchestrates audit alongside registry calls.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod registry;
mod token;

pub use registry::{
    CreateDocumentRequest, CreatedDocument, DocumentSummary, PurgedDocument, Registry,
    SignatoryDraft, SigningLink,
};
pub use token::mint_token;

use firma_identity::ValidationError;
use firma_storage::StorageError;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("document file must not be empty")]
    EmptyFile,

    #[error("at least one signatory is required")]
    NoSignatories,

    #[error("document not found: {0}")]
    DocumentNotFound(firma_types::DocumentId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
