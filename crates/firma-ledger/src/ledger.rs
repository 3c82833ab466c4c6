//! Ledger facade over an [`AuditStore`]

use crate::chain::{verify_chain, ChainVerification};
use crate::event::{AuditAppend, AuditEvent};
use crate::store::AuditStore;
use crate::{LedgerError, LedgerResult};
use firma_types::DocumentId;
use std::sync::Arc;
use tracing::debug;

/// Append and verification entry point for the global audit chain.
#[derive(Clone)]
pub struct AuditLedger {
    store: Arc<dyn AuditStore>,
}

impl AuditLedger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append one event. A failure here must abort the enclosing
    /// business operation: an unaudited state change is a correctness
    /// violation, not a best-effort log miss.
    pub async fn append(&self, event: AuditAppend) -> LedgerResult<AuditEvent> {
        let record = self.store.append(event).await?;
        debug!(
            sequence = record.sequence,
            action = %record.action,
            "Audit event appended"
        );
        Ok(record)
    }

    /// Verify the stored chain between two sequence numbers inclusive.
    ///
    /// Recomputes every record hash from stored fields and checks the
    /// predecessor linkage, anchored on the record hash of the event just
    /// before `from` when the run does not start at genesis.
    pub async fn verify_range(&self, from: u64, to: u64) -> LedgerResult<ChainVerification> {
        if from == 0 || to < from {
            return Err(LedgerError::InvalidRange { from, to });
        }

        let expected_previous = if from == 1 {
            None
        } else {
            let anchor = self.store.events_in_range(from - 1, from - 1).await?;
            match anchor.first() {
                Some(event) => Some(event.record_hash.clone()),
                // Predecessor missing entirely: the run cannot be anchored.
                None => return Ok(ChainVerification::BrokenAt(from)),
            }
        };

        let events = self.store.events_in_range(from, to).await?;
        Ok(verify_chain(&events, expected_previous.as_deref()))
    }

    /// Verify the whole stored chain.
    pub async fn verify_all(&self) -> LedgerResult<ChainVerification> {
        let len = self.store.len().await?;
        if len == 0 {
            return Ok(ChainVerification::Valid);
        }
        self.verify_range(1, len).await
    }

    /// Read-side filter: all events recorded for one document.
    pub async fn events_for_document(
        &self,
        document_id: &DocumentId,
    ) -> LedgerResult<Vec<AuditEvent>> {
        self.store.events_for_document(document_id).await
    }

    /// All events appended so far, ascending.
    pub async fn all_events(&self) -> LedgerResult<Vec<AuditEvent>> {
        let len = self.store.len().await?;
        if len == 0 {
            return Ok(Vec::new());
        }
        self.store.events_in_range(1, len).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{payloads, AuditAction};
    use crate::store::MemoryAuditStore;

    fn ledger() -> AuditLedger {
        AuditLedger::new(Arc::new(MemoryAuditStore::new()))
    }

    async fn append_some(ledger: &AuditLedger, count: u64) {
        for _ in 0..count {
            ledger
                .append(AuditAppend::new(
                    Some(DocumentId::new("doc-1")),
                    AuditAction::IdentityVerified,
                    "Ana",
                    "203.0.113.7",
                    "test-agent",
                    payloads::identity_verified(true, "52998224725"),
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn verifies_full_and_partial_ranges() {
        let ledger = ledger();
        append_some(&ledger, 6).await;

        assert!(ledger.verify_all().await.unwrap().is_valid());
        assert!(ledger.verify_range(1, 3).await.unwrap().is_valid());
        assert!(ledger.verify_range(3, 6).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn empty_ledger_is_valid() {
        assert!(ledger().verify_all().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn missing_anchor_reports_broken() {
        let ledger = ledger();
        append_some(&ledger, 2).await;
        // Range beyond the stored chain cannot be anchored
        assert_eq!(
            ledger.verify_range(4, 5).await.unwrap(),
            ChainVerification::BrokenAt(4)
        );
    }
}
