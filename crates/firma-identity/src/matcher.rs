//! Stateless identity matching against the registered signatory

use crate::tax_id::{normalize_birth_date, validate_tax_id};
use crate::ValidationError;
use firma_types::Signatory;
use tracing::warn;

/// Why a verification attempt did not match.
///
/// Internal only: callers collapse every reason into one generic
/// user-visible message so a guesser cannot learn which field was wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    TaxId,
    BirthDate,
    AlreadySubmitted,
}

/// Outcome of an identity verification attempt. A mismatch is an expected
/// result, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Mismatch(MismatchReason),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Compares signer-supplied credentials against the registered record.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMatcher;

impl IdentityMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Verify supplied credentials against the registered signatory.
    ///
    /// The supplied tax id must pass the checksum before the stored value
    /// is consulted; a malformed id is a [`ValidationError`], not a
    /// mismatch. Both sides of the birth date comparison are normalized
    /// to the canonical ISO form.
    pub fn verify(
        &self,
        signatory: &Signatory,
        supplied_tax_id: &str,
        supplied_birth_date: Option<&str>,
    ) -> Result<MatchOutcome, ValidationError> {
        let supplied = validate_tax_id(supplied_tax_id)?;

        if signatory.is_submitted() {
            warn!(
                signatory = %signatory.id,
                "Identity verification attempted on a submitted signatory"
            );
            return Ok(MatchOutcome::Mismatch(MismatchReason::AlreadySubmitted));
        }

        let registered: String = signatory
            .tax_id
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if supplied.as_str() != registered {
            warn!(
                signatory = %signatory.id,
                supplied = %supplied,
                "Tax id does not match registered value"
            );
            return Ok(MatchOutcome::Mismatch(MismatchReason::TaxId));
        }

        if let Some(registered_date) = signatory.birth_date {
            let supplied_date = supplied_birth_date
                .map(normalize_birth_date)
                .transpose()?;
            if supplied_date != Some(registered_date) {
                warn!(signatory = %signatory.id, "Birth date does not match registered value");
                return Ok(MatchOutcome::Mismatch(MismatchReason::BirthDate));
            }
        }

        Ok(MatchOutcome::Matched)
    }
}
