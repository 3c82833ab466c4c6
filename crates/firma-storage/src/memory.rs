//! In-memory reference implementation for the signing storage traits.
//!
//! Deterministic and test-friendly. Production deployments should use a
//! transactional backend for source-of-truth data.

use crate::traits::{DocumentStore, SignatoryStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firma_types::{AccessToken, Document, DocumentId, Signatory, SubmissionRecord};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory signing storage adapter.
#[derive(Default)]
pub struct InMemorySigningStorage {
    documents: RwLock<HashMap<DocumentId, Document>>,
    signatories: RwLock<HashMap<AccessToken, Signatory>>,
}

impl InMemorySigningStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemorySigningStorage {
    async fn create_document(&self, document: Document) -> StorageResult<()> {
        let mut guard = self
            .documents
            .write()
            .map_err(|_| StorageError::Backend("documents lock poisoned".to_string()))?;

        if guard.contains_key(&document.id) {
            return Err(StorageError::Conflict(format!(
                "document {} already exists",
                document.id
            )));
        }
        guard.insert(document.id.clone(), document);
        Ok(())
    }

    async fn get_document(&self, document_id: &DocumentId) -> StorageResult<Option<Document>> {
        let guard = self
            .documents
            .read()
            .map_err(|_| StorageError::Backend("documents lock poisoned".to_string()))?;
        Ok(guard.get(document_id).cloned())
    }

    async fn list_documents(&self) -> StorageResult<Vec<Document>> {
        let guard = self
            .documents
            .read()
            .map_err(|_| StorageError::Backend("documents lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(values)
    }

    async fn remove_document(&self, document_id: &DocumentId) -> StorageResult<Document> {
        let mut guard = self
            .documents
            .write()
            .map_err(|_| StorageError::Backend("documents lock poisoned".to_string()))?;
        guard
            .remove(document_id)
            .ok_or_else(|| StorageError::NotFound(format!("document {} not found", document_id)))
    }
}

#[async_trait]
impl SignatoryStore for InMemorySigningStorage {
    async fn create_signatory(&self, signatory: Signatory) -> StorageResult<()> {
        let mut guard = self
            .signatories
            .write()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;

        if guard.contains_key(&signatory.token) {
            return Err(StorageError::Conflict(format!(
                "token {} already exists",
                signatory.token
            )));
        }
        guard.insert(signatory.token.clone(), signatory);
        Ok(())
    }

    async fn get_by_token(&self, token: &AccessToken) -> StorageResult<Option<Signatory>> {
        let guard = self
            .signatories
            .read()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;
        Ok(guard.get(token).cloned())
    }

    async fn list_for_document(&self, document_id: &DocumentId) -> StorageResult<Vec<Signatory>> {
        let guard = self
            .signatories
            .read()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;
        Ok(guard
            .values()
            .filter(|s| &s.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn record_identity_verified(
        &self,
        token: &AccessToken,
        at: DateTime<Utc>,
    ) -> StorageResult<Signatory> {
        let mut guard = self
            .signatories
            .write()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;
        let signatory = guard
            .get_mut(token)
            .ok_or_else(|| StorageError::NotFound(format!("{} not found", token)))?;

        if signatory.is_submitted() {
            return Err(StorageError::Conflict(
                "signatory already submitted".to_string(),
            ));
        }
        if signatory.identity_verified_at.is_none() {
            signatory.identity_verified_at = Some(at);
        }
        Ok(signatory.clone())
    }

    async fn mark_submitted(
        &self,
        token: &AccessToken,
        record: SubmissionRecord,
    ) -> StorageResult<Signatory> {
        // The whole read-check-write runs under one write lock: this is
        // the row-level atomicity the exactly-once guarantee rests on.
        let mut guard = self
            .signatories
            .write()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;
        let signatory = guard
            .get_mut(token)
            .ok_or_else(|| StorageError::NotFound(format!("{} not found", token)))?;

        if signatory.is_submitted() {
            return Err(StorageError::Conflict(
                "signatory already submitted".to_string(),
            ));
        }

        signatory.submitted_at = Some(record.submitted_at);
        signatory.submitter_ip = Some(record.submitter_ip);
        signatory.submitter_user_agent = Some(record.submitter_user_agent);
        signatory.latitude = record.latitude;
        signatory.longitude = record.longitude;
        signatory.signature_ref = Some(record.signature_ref);
        signatory.selfie_ref = Some(record.selfie_ref);
        signatory.terms_accepted_hash = Some(record.terms_accepted_hash);
        Ok(signatory.clone())
    }

    async fn remove_for_document(
        &self,
        document_id: &DocumentId,
    ) -> StorageResult<Vec<Signatory>> {
        let mut guard = self
            .signatories
            .write()
            .map_err(|_| StorageError::Backend("signatories lock poisoned".to_string()))?;
        let tokens: Vec<AccessToken> = guard
            .values()
            .filter(|s| &s.document_id == document_id)
            .map(|s| s.token.clone())
            .collect();
        Ok(tokens.iter().filter_map(|t| guard.remove(t)).collect())
    }
}
