//! Hash computation and chain verification

use crate::event::AuditEvent;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the record hash from an event's stored fields, ignoring the
/// stored `record_hash` itself.
///
/// Every persisted field participates in the input: mutating any one of
/// them, or the predecessor link, changes the digest.
pub fn compute_record_hash(event: &AuditEvent) -> String {
    let hash_input = format!(
        "{}{}{}{}{}{}{}{}{}",
        event.sequence,
        event
            .document_id
            .as_ref()
            .map(|d| d.as_str())
            .unwrap_or(""),
        event.action,
        event.actor,
        event.ip,
        event.user_agent,
        serde_json::to_string(&event.payload).unwrap_or_default(),
        event.timestamp.to_rfc3339(),
        event.previous_hash.as_deref().unwrap_or(""),
    );

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verdict of a chain verification pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainVerification {
    Valid,
    /// First sequence at which recomputation or linkage failed. Every
    /// later event is unverifiable.
    BrokenAt(u64),
}

impl ChainVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Verify a contiguous run of events.
///
/// Recomputes each record hash from stored fields, compares it to the
/// stored value, and checks that each `previous_hash` equals the
/// predecessor's record hash. `expected_previous` is the record hash of
/// the event immediately before the run (`None` when the run starts at
/// the genesis event).
pub fn verify_chain(events: &[AuditEvent], expected_previous: Option<&str>) -> ChainVerification {
    let mut previous = expected_previous.map(str::to_string);

    for event in events {
        if event.previous_hash != previous {
            return ChainVerification::BrokenAt(event.sequence);
        }
        if compute_record_hash(event) != event.record_hash {
            return ChainVerification::BrokenAt(event.sequence);
        }
        previous = Some(event.record_hash.clone());
    }

    ChainVerification::Valid
}
