//! Firma identity matching.
//!
//! Stateless comparison of signer-supplied credentials against the
//! registered signatory record. A syntactically invalid tax id is
//! rejected by the checksum before any stored data is consulted, so a
//! malformed submission learns nothing about the registry.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod matcher;
mod tax_id;

pub use matcher::{IdentityMatcher, MatchOutcome, MismatchReason};
pub use tax_id::{mask_tax_id, normalize_birth_date, validate_tax_id, NormalizedTaxId};

use thiserror::Error;

/// Rejections raised before any comparison against stored data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tax id must contain exactly 11 digits")]
    TaxIdLength,

    #[error("tax id is an all-repeated-digit sequence")]
    TaxIdRepeatedDigits,

    #[error("tax id check digits are invalid")]
    TaxIdChecksum,

    #[error("unrecognized birth date format: {0}")]
    BirthDateFormat(String),
}
