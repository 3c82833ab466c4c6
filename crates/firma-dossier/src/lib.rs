//! Firma dossier assembler.
//!
//! Read-only projections over the registry and the audit ledger: the
//! full evidentiary dossier for archival, and the public verification
//! summary that exposes completion facts without any captured imagery.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod assembler;

pub use assembler::{
    Dossier, DossierAssembler, DossierEntry, SignatoryStatus, VerificationSummary,
};

use firma_ledger::LedgerError;
use firma_registry::RegistryError;
use firma_types::DocumentId;
use thiserror::Error;

/// Result type for dossier assembly.
pub type DossierResult<T> = Result<T, DossierError>;

#[derive(Debug, Error)]
pub enum DossierError {
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
