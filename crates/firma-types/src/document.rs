//! Document entity

use crate::{BlobRef, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document placed for signature by the ERP.
///
/// `content_hash` is computed once over the exact file bytes at creation
/// and never recomputed or mutated afterwards. It is the anchor for every
/// later integrity claim about the signed material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub file_name: String,
    pub file_ref: BlobRef,
    /// SHA-256 hex digest of the original file bytes. Immutable.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
}
