//! Signatory entity and signing lifecycle

use crate::{AccessToken, BlobRef, DocumentId, SignatoryId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-signatory signing progression.
///
/// Derived from the presence of persisted fields rather than stored as a
/// separate column, so the stored record can never disagree with the
/// state it implies. `Submitted` is terminal and absorbing: once
/// `submitted_at` is set, no transition may touch the record again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningState {
    PendingIdentity,
    IdentityVerified,
    Submitted,
}

/// A named individual required to sign a document, identified by a
/// unique capability token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signatory {
    pub id: SignatoryId,
    pub document_id: DocumentId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Registered national tax id, digits only.
    pub tax_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub token: AccessToken,

    // Capture fields. Populated only through the signing state machine;
    // frozen once `submitted_at` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selfie_ref: Option<BlobRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_ref: Option<BlobRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_accepted_hash: Option<String>,
}

impl Signatory {
    /// New signatory with empty capture fields.
    pub fn new(
        document_id: DocumentId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: Option<String>,
        tax_id: impl Into<String>,
        birth_date: Option<NaiveDate>,
        token: AccessToken,
    ) -> Self {
        Self {
            id: SignatoryId::generate(),
            document_id,
            name: name.into(),
            email: email.into(),
            phone,
            tax_id: tax_id.into(),
            birth_date,
            token,
            identity_verified_at: None,
            selfie_ref: None,
            signature_ref: None,
            submitted_at: None,
            submitter_ip: None,
            submitter_user_agent: None,
            latitude: None,
            longitude: None,
            terms_accepted_hash: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Current signing state, derived from persisted fields.
    pub fn state(&self) -> SigningState {
        if self.submitted_at.is_some() {
            SigningState::Submitted
        } else if self.identity_verified_at.is_some() {
            SigningState::IdentityVerified
        } else {
            SigningState::PendingIdentity
        }
    }
}

/// Everything a successful signature commit writes onto the signatory,
/// applied as one atomic conditional update on `submitted_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submitted_at: DateTime<Utc>,
    pub submitter_ip: String,
    pub submitter_user_agent: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub signature_ref: BlobRef,
    pub selfie_ref: BlobRef,
    pub terms_accepted_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signatory() -> Signatory {
        Signatory::new(
            DocumentId::new("doc-1"),
            "Ana",
            "ana@example.com",
            None,
            "52998224725",
            None,
            AccessToken::new("tok"),
        )
    }

    #[test]
    fn state_is_derived_from_fields() {
        let mut s = signatory();
        assert_eq!(s.state(), SigningState::PendingIdentity);

        s.identity_verified_at = Some(Utc::now());
        assert_eq!(s.state(), SigningState::IdentityVerified);

        s.submitted_at = Some(Utc::now());
        assert_eq!(s.state(), SigningState::Submitted);
        assert!(s.is_submitted());
    }

    #[test]
    fn submission_wins_over_identity_flag() {
        let mut s = signatory();
        s.submitted_at = Some(Utc::now());
        // identity_verified_at missing (session-scoped verification) must
        // still report the terminal state
        assert_eq!(s.state(), SigningState::Submitted);
    }
}
