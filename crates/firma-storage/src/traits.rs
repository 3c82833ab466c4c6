use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firma_types::{AccessToken, BlobRef, Document, DocumentId, Signatory, SubmissionRecord};

/// Storage interface for documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Conflict if the id already exists.
    async fn create_document(&self, document: Document) -> StorageResult<()>;

    async fn get_document(&self, document_id: &DocumentId) -> StorageResult<Option<Document>>;

    /// All documents, newest first.
    async fn list_documents(&self) -> StorageResult<Vec<Document>>;

    /// Remove a document record (administrative purge only).
    async fn remove_document(&self, document_id: &DocumentId) -> StorageResult<Document>;
}

/// Storage interface for signatories.
#[async_trait]
pub trait SignatoryStore: Send + Sync {
    /// Insert a new signatory. Conflict if the token already exists.
    async fn create_signatory(&self, signatory: Signatory) -> StorageResult<()>;

    async fn get_by_token(&self, token: &AccessToken) -> StorageResult<Option<Signatory>>;

    async fn list_for_document(&self, document_id: &DocumentId) -> StorageResult<Vec<Signatory>>;

    /// Stamp `identity_verified_at` once. Idempotent: a repeat call
    /// leaves the record untouched. Conflict after submission.
    async fn record_identity_verified(
        &self,
        token: &AccessToken,
        at: DateTime<Utc>,
    ) -> StorageResult<Signatory>;

    /// Atomic check-then-set on `submitted_at`.
    ///
    /// Of two concurrent callers for the same token exactly one observes
    /// success; the other gets `Conflict`. Implementations must make the
    /// read-check-write indivisible (one write lock, or a conditional
    /// `UPDATE ... WHERE submitted_at IS NULL`).
    async fn mark_submitted(
        &self,
        token: &AccessToken,
        record: SubmissionRecord,
    ) -> StorageResult<Signatory>;

    /// Remove all signatories of a document (administrative purge only).
    /// Returns the removed records so the caller can release their blobs.
    async fn remove_for_document(&self, document_id: &DocumentId)
        -> StorageResult<Vec<Signatory>>;
}

/// Unified bundle used by the registry and the signing state machine.
pub trait SigningStorage: DocumentStore + SignatoryStore + Send + Sync {}

impl<T> SigningStorage for T where T: DocumentStore + SignatoryStore + Send + Sync {}

/// Opaque byte storage for original files, selfies and signature images.
/// The core never interprets refs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> StorageResult<BlobRef>;

    async fn get(&self, blob_ref: &BlobRef) -> StorageResult<Vec<u8>>;

    async fn remove(&self, blob_ref: &BlobRef) -> StorageResult<()>;
}
