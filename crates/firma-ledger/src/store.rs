//! Audit event stores

use crate::chain::compute_record_hash;
use crate::event::{AuditAppend, AuditEvent};
use crate::{LedgerError, LedgerResult};
use async_trait::async_trait;
use firma_types::DocumentId;
use parking_lot::RwLock;

/// Append-only storage for the global audit chain.
///
/// `append` must read the current tail, assign the next sequence and
/// previous hash, compute the record hash and persist, all inside one
/// serialized critical section: concurrent appends are linearized, and
/// two events can never claim the same `previous_hash`. A transactional
/// backend is expected to run the whole of `append` in one transaction
/// shared with the business mutation it audits.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an event and return the stored, hash-linked record.
    async fn append(&self, event: AuditAppend) -> LedgerResult<AuditEvent>;

    /// Events with `from <= sequence <= to`, ascending.
    async fn events_in_range(&self, from: u64, to: u64) -> LedgerResult<Vec<AuditEvent>>;

    /// All events for one document, ascending. The chain itself stays
    /// global; this is a read-side filter.
    async fn events_for_document(&self, document_id: &DocumentId) -> LedgerResult<Vec<AuditEvent>>;

    /// The current chain tail, if any.
    async fn latest(&self) -> LedgerResult<Option<AuditEvent>>;

    /// Number of events appended so far.
    async fn len(&self) -> LedgerResult<u64>;
}

/// In-memory audit store. Deterministic reference backend; the single
/// write lock is the serialized append section.
#[derive(Default)]
pub struct MemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, event: AuditAppend) -> LedgerResult<AuditEvent> {
        let mut events = self.events.write();

        let previous_hash = events.last().map(|e| e.record_hash.clone());
        let sequence = events.len() as u64 + 1;

        let mut record = AuditEvent {
            sequence,
            document_id: event.document_id,
            action: event.action,
            actor: event.actor,
            ip: event.ip,
            user_agent: event.user_agent,
            payload: event.payload,
            timestamp: event.timestamp,
            previous_hash,
            record_hash: String::new(),
        };
        record.record_hash = compute_record_hash(&record);

        events.push(record.clone());
        Ok(record)
    }

    async fn events_in_range(&self, from: u64, to: u64) -> LedgerResult<Vec<AuditEvent>> {
        if from == 0 || to < from {
            return Err(LedgerError::InvalidRange { from, to });
        }
        let events = self.events.read();
        Ok(events
            .iter()
            .filter(|e| e.sequence >= from && e.sequence <= to)
            .cloned()
            .collect())
    }

    async fn events_for_document(&self, document_id: &DocumentId) -> LedgerResult<Vec<AuditEvent>> {
        let events = self.events.read();
        Ok(events
            .iter()
            .filter(|e| e.document_id.as_ref() == Some(document_id))
            .cloned()
            .collect())
    }

    async fn latest(&self) -> LedgerResult<Option<AuditEvent>> {
        Ok(self.events.read().last().cloned())
    }

    async fn len(&self) -> LedgerResult<u64> {
        Ok(self.events.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditAction;
    use std::sync::Arc;

    fn append_request(n: u64) -> AuditAppend {
        AuditAppend::new(
            Some(DocumentId::new(format!("doc-{}", n % 3))),
            AuditAction::IdentityVerified,
            "actor",
            "203.0.113.7",
            "test-agent",
            serde_json::json!({"n": n}),
        )
    }

    #[tokio::test]
    async fn appends_are_sequenced_and_linked() {
        let store = MemoryAuditStore::new();

        let first = store.append(append_request(1)).await.unwrap();
        let second = store.append(append_request(2)).await.unwrap();

        assert_eq!(first.sequence, 1);
        assert!(first.previous_hash.is_none());
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash.as_deref(), Some(first.record_hash.as_str()));
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_appends_are_linearized() {
        let store = Arc::new(MemoryAuditStore::new());

        let mut handles = Vec::new();
        for n in 0..32u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(append_request(n)).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let events = store.events_in_range(1, 32).await.unwrap();
        assert_eq!(events.len(), 32);
        for window in events.windows(2) {
            assert_eq!(
                window[1].previous_hash.as_deref(),
                Some(window[0].record_hash.as_str()),
                "two events may never claim the same previous hash"
            );
        }
    }

    #[tokio::test]
    async fn range_queries_validate_bounds() {
        let store = MemoryAuditStore::new();
        assert!(matches!(
            store.events_in_range(0, 1).await,
            Err(LedgerError::InvalidRange { .. })
        ));
        assert!(matches!(
            store.events_in_range(5, 2).await,
            Err(LedgerError::InvalidRange { .. })
        ));
    }

    #[tokio::test]
    async fn document_filter_is_read_side_only() {
        let store = MemoryAuditStore::new();
        for n in 1..=6 {
            store.append(append_request(n)).await.unwrap();
        }
        let doc = DocumentId::new("doc-1");
        let filtered = store.events_for_document(&doc).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|e| e.document_id.as_ref() == Some(&doc)));
    }
}
