//! Document and signatory registry

use crate::token::mint_token;
use crate::RegistryError;
use chrono::{DateTime, Utc};
use firma_identity::{normalize_birth_date, validate_tax_id};
use firma_storage::{BlobStore, SigningStorage, StorageResult};
use firma_types::{
    AccessToken, Document, DocumentId, Signatory, SignatoryId, SubmissionRecord,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

/// One signatory as supplied by the ERP at creation time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatoryDraft {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub tax_id: String,
    /// Any supported locale ordering; canonicalized at creation.
    #[serde(default)]
    pub birth_date: Option<String>,
}

/// Document creation request from the ERP.
#[derive(Clone, Debug)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub signatories: Vec<SignatoryDraft>,
    pub created_by: String,
    pub notify_email: Option<String>,
    /// Base URL prefixed onto per-signatory signing links.
    pub base_url: String,
}

/// Per-signatory signing link handed back to the ERP for dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigningLink {
    pub signatory_id: SignatoryId,
    pub name: String,
    pub email: String,
    pub token: AccessToken,
    pub url: String,
}

/// Result of document creation.
#[derive(Clone, Debug)]
pub struct CreatedDocument {
    pub document_id: DocumentId,
    pub content_hash: String,
    pub links: Vec<SigningLink>,
}

/// Listing row with signing progress counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: DocumentId,
    pub title: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub signatory_count: usize,
    pub submitted_count: usize,
}

/// What an administrative purge removed.
#[derive(Clone, Debug)]
pub struct PurgedDocument {
    pub document: Document,
    pub signatory_count: usize,
}

/// Owns documents and signatories. Cheap to clone; both handles are
/// shared.
#[derive(Clone)]
pub struct Registry {
    storage: Arc<dyn SigningStorage>,
    blobs: Arc<dyn BlobStore>,
}

impl Registry {
    pub fn new(storage: Arc<dyn SigningStorage>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { storage, blobs }
    }

    /// Create a document with its signatories and mint one capability
    /// token per signatory.
    ///
    /// `content_hash` is computed over the exact bytes supplied; later
    /// integrity verification compares against it. Registered tax ids
    /// must pass the checksum at registration so a mismatch at signing
    /// time can only mean the signer, not the ERP, got it wrong.
    pub async fn create_document(
        &self,
        request: CreateDocumentRequest,
    ) -> Result<CreatedDocument, RegistryError> {
        if request.file_bytes.is_empty() {
            return Err(RegistryError::EmptyFile);
        }
        if request.signatories.is_empty() {
            return Err(RegistryError::NoSignatories);
        }

        // Every draft must validate before the first storage write, so a
        // bad draft can never leave a partial document behind.
        let mut drafts = Vec::with_capacity(request.signatories.len());
        for draft in request.signatories {
            let tax_id = validate_tax_id(&draft.tax_id)?;
            let birth_date = draft
                .birth_date
                .as_deref()
                .map(normalize_birth_date)
                .transpose()?;
            drafts.push((draft, tax_id, birth_date));
        }

        let content_hash = sha256_hex(&request.file_bytes);
        let created_at = Utc::now();
        let document_id = derive_document_id(&content_hash, &request.file_name, created_at);

        let file_ref = self.blobs.put(request.file_bytes).await?;

        let document = Document {
            id: document_id.clone(),
            title: request.title,
            file_name: request.file_name,
            file_ref,
            content_hash: content_hash.clone(),
            created_at,
            created_by: request.created_by,
            notify_email: request.notify_email,
        };
        self.storage.create_document(document).await?;

        let mut links = Vec::with_capacity(drafts.len());
        for (draft, tax_id, birth_date) in drafts {
            let token = mint_token();
            let signatory = Signatory::new(
                document_id.clone(),
                draft.name,
                draft.email,
                draft.phone,
                tax_id.as_str(),
                birth_date,
                token.clone(),
            );
            let link = SigningLink {
                signatory_id: signatory.id.clone(),
                name: signatory.name.clone(),
                email: signatory.email.clone(),
                token: token.clone(),
                url: format!(
                    "{}/sign/{}",
                    request.base_url.trim_end_matches('/'),
                    token.as_str()
                ),
            };
            self.storage.create_signatory(signatory).await?;
            links.push(link);
        }

        info!(
            document_id = %document_id,
            signatories = links.len(),
            "Document created"
        );

        Ok(CreatedDocument {
            document_id,
            content_hash,
            links,
        })
    }

    pub async fn get_by_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<Signatory>, RegistryError> {
        Ok(self.storage.get_by_token(token).await?)
    }

    pub async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, RegistryError> {
        Ok(self.storage.get_document(document_id).await?)
    }

    pub async fn signatories(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<Signatory>, RegistryError> {
        Ok(self.storage.list_for_document(document_id).await?)
    }

    /// True iff every signatory of the document has submitted.
    pub async fn is_complete(&self, document_id: &DocumentId) -> Result<bool, RegistryError> {
        let signatories = self.storage.list_for_document(document_id).await?;
        Ok(!signatories.is_empty() && signatories.iter().all(Signatory::is_submitted))
    }

    /// All documents, newest first, with signing progress counts.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, RegistryError> {
        let documents = self.storage.list_documents().await?;
        let mut summaries = Vec::with_capacity(documents.len());
        for document in documents {
            let signatories = self.storage.list_for_document(&document.id).await?;
            summaries.push(DocumentSummary {
                document_id: document.id,
                title: document.title,
                file_name: document.file_name,
                created_at: document.created_at,
                created_by: document.created_by,
                signatory_count: signatories.len(),
                submitted_count: signatories.iter().filter(|s| s.is_submitted()).count(),
            });
        }
        Ok(summaries)
    }

    /// Original file bytes for a document.
    pub async fn document_bytes(&self, document: &Document) -> Result<Vec<u8>, RegistryError> {
        Ok(self.blobs.get(&document.file_ref).await?)
    }

    /// Remove a document, its signatories and every stored blob.
    ///
    /// Administrative escape hatch only; the caller is responsible for
    /// appending the purge audit event.
    pub async fn purge_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<PurgedDocument, RegistryError> {
        let document = self
            .storage
            .get_document(document_id)
            .await?
            .ok_or_else(|| RegistryError::DocumentNotFound(document_id.clone()))?;

        let signatories = self.storage.remove_for_document(document_id).await?;
        self.storage.remove_document(document_id).await?;

        self.blobs.remove(&document.file_ref).await?;
        for signatory in &signatories {
            if let Some(blob_ref) = &signatory.selfie_ref {
                self.blobs.remove(blob_ref).await?;
            }
            if let Some(blob_ref) = &signatory.signature_ref {
                self.blobs.remove(blob_ref).await?;
            }
        }

        info!(
            document_id = %document_id,
            signatories = signatories.len(),
            "Document purged"
        );

        Ok(PurgedDocument {
            document,
            signatory_count: signatories.len(),
        })
    }

    // Data-only pass-throughs used by the signing state machine. No
    // audit writes happen here.

    pub async fn record_identity_verified(
        &self,
        token: &AccessToken,
        at: DateTime<Utc>,
    ) -> StorageResult<Signatory> {
        self.storage.record_identity_verified(token, at).await
    }

    pub async fn commit_submission(
        &self,
        token: &AccessToken,
        record: SubmissionRecord,
    ) -> StorageResult<Signatory> {
        self.storage.mark_submitted(token, record).await
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Opaque, content-derived document id: the first 16 hex chars of a
/// digest over the content hash and creation context.
fn derive_document_id(
    content_hash: &str,
    file_name: &str,
    created_at: DateTime<Utc>,
) -> DocumentId {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(file_name.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    DocumentId::new(hex::encode(hasher.finalize())[..16].to_string())
}
