//! Audit event types and payload constructors

use chrono::{DateTime, Utc};
use firma_types::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed vocabulary of auditable actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    DocumentCreated,
    IdentityVerified,
    SignatureCompleted,
    AdministrativePurge,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentCreated => "DOCUMENT_CREATED",
            Self::IdentityVerified => "IDENTITY_VERIFIED",
            Self::SignatureCompleted => "SIGNATURE_COMPLETED",
            Self::AdministrativePurge => "ADMINISTRATIVE_PURGE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append request. Sequence and hashes are assigned by the store inside
/// its serialized append section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditAppend {
    pub document_id: Option<DocumentId>,
    pub action: AuditAction,
    pub actor: String,
    pub ip: String,
    pub user_agent: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditAppend {
    pub fn new(
        document_id: Option<DocumentId>,
        action: AuditAction,
        actor: impl Into<String>,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            document_id,
            action,
            actor: actor.into(),
            ip: ip.into(),
            user_agent: user_agent.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// A stored, hash-linked audit record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonic global sequence, starting at 1.
    pub sequence: u64,
    pub document_id: Option<DocumentId>,
    pub action: AuditAction,
    pub actor: String,
    pub ip: String,
    pub user_agent: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    /// Record hash of the predecessor; `None` only for the genesis event.
    pub previous_hash: Option<String>,
    /// SHA-256 hex over every stored field above.
    pub record_hash: String,
}

/// Payload constructors for each action.
///
/// The tax id is masked here, before the payload ever reaches the store,
/// so no full national id can land in the chain.
pub mod payloads {
    use firma_identity::mask_tax_id;
    use serde_json::{json, Value};

    pub fn document_created(content_hash: &str, file_name: &str, signatory_count: usize) -> Value {
        json!({
            "content_hash": content_hash,
            "file_name": file_name,
            "signatory_count": signatory_count,
        })
    }

    pub fn identity_verified(success: bool, tax_id: &str) -> Value {
        json!({
            "success": success,
            "tax_id": mask_tax_id(tax_id),
        })
    }

    pub fn signature_completed(
        tax_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        terms_accepted_hash: &str,
        content_hash: &str,
    ) -> Value {
        json!({
            "tax_id": mask_tax_id(tax_id),
            "latitude": latitude,
            "longitude": longitude,
            "terms_accepted_hash": terms_accepted_hash,
            "content_hash": content_hash,
        })
    }

    pub fn administrative_purge(title: &str, signatory_count: usize) -> Value {
        json!({
            "title": title,
            "signatory_count": signatory_count,
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn payloads_never_carry_a_full_tax_id() {
            let payload = signature_completed("529.982.247-25", None, None, "h", "c");
            assert_eq!(payload["tax_id"], "529******25");

            let payload = identity_verified(false, "52998224725");
            assert_eq!(payload["tax_id"], "529******25");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_screaming_snake() {
        let s = serde_json::to_string(&AuditAction::SignatureCompleted).unwrap();
        assert_eq!(s, "\"SIGNATURE_COMPLETED\"");
        assert_eq!(AuditAction::DocumentCreated.to_string(), "DOCUMENT_CREATED");
    }
}
