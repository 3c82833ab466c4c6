//! Firma Service - the unified e-signature service facade.
//!
//! Wires the registry, the signing state machine, the audit ledger and
//! the dossier assembler behind one entry point. Every state-changing
//! operation that reaches storage also reaches the ledger through this
//! layer or the state machine beneath it.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use firma_dossier::{Dossier, DossierAssembler, DossierError, VerificationSummary};
use firma_ledger::{
    payloads, AuditAction, AuditAppend, AuditEvent, AuditLedger, AuditStore, ChainVerification,
    LedgerError, MemoryAuditStore,
};
use firma_registry::{
    CreateDocumentRequest, CreatedDocument, DocumentSummary, PurgedDocument, Registry,
    RegistryError,
};
use firma_storage::{BlobStore, InMemorySigningStorage, MemoryBlobStore, SigningStorage};
use firma_types::{Document, DocumentId};
use firma_workflow::{
    CommitSignatureRequest, IdentityVerification, Notifier, NullNotifier, SignatureReceipt,
    SignerView, SigningStateMachine, VerifyIdentityRequest, WorkflowError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// The unified e-signature service.
#[derive(Clone)]
pub struct FirmaService {
    registry: Registry,
    ledger: AuditLedger,
    machine: SigningStateMachine,
    assembler: DossierAssembler,
}

impl FirmaService {
    /// In-memory service with a null notifier. The default wiring for
    /// tests and embedded use.
    pub fn new() -> Self {
        Self::with_components(
            Arc::new(InMemorySigningStorage::new()),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryAuditStore::new()),
            Arc::new(NullNotifier),
        )
    }

    /// Service over explicit backends.
    pub fn with_components(
        storage: Arc<dyn SigningStorage>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let registry = Registry::new(storage, blobs);
        let ledger = AuditLedger::new(audit);
        let machine = SigningStateMachine::new(registry.clone(), ledger.clone(), notifier);
        let assembler = DossierAssembler::new(registry.clone(), ledger.clone());
        Self {
            registry,
            ledger,
            machine,
            assembler,
        }
    }

    // ============ Document Operations ============

    /// Create a document with its signatories and record the creation
    /// in the audit ledger. `ip` and `user_agent` identify the creating
    /// client session.
    pub async fn create_document(
        &self,
        request: CreateDocumentRequest,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<CreatedDocument, FirmaError> {
        let actor = request.created_by.clone();
        let file_name = request.file_name.clone();
        let created = self.registry.create_document(request).await?;

        self.ledger
            .append(AuditAppend::new(
                Some(created.document_id.clone()),
                AuditAction::DocumentCreated,
                actor,
                ip.into(),
                user_agent.into(),
                payloads::document_created(&created.content_hash, &file_name, created.links.len()),
            ))
            .await?;

        Ok(created)
    }

    /// All documents with signing progress counts, newest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, FirmaError> {
        Ok(self.registry.list_documents().await?)
    }

    pub async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, FirmaError> {
        Ok(self.registry.get_document(document_id).await?)
    }

    /// True iff every signatory of the document has submitted.
    pub async fn is_complete(&self, document_id: &DocumentId) -> Result<bool, FirmaError> {
        Ok(self.registry.is_complete(document_id).await?)
    }

    /// Remove a document, its signatories and every stored blob, and
    /// record the purge. The purge event survives in the ledger after
    /// the document itself is gone.
    pub async fn purge_document(
        &self,
        document_id: &DocumentId,
        actor: impl Into<String>,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<PurgedDocument, FirmaError> {
        let purged = self.registry.purge_document(document_id).await?;

        self.ledger
            .append(AuditAppend::new(
                Some(document_id.clone()),
                AuditAction::AdministrativePurge,
                actor.into(),
                ip.into(),
                user_agent.into(),
                payloads::administrative_purge(&purged.document.title, purged.signatory_count),
            ))
            .await?;

        info!(document_id = %document_id, "Administrative purge recorded");
        Ok(purged)
    }

    // ============ Signing Operations ============

    /// Step 1 of the signer session: identity verification.
    pub async fn verify_identity(
        &self,
        request: VerifyIdentityRequest,
    ) -> Result<IdentityVerification, FirmaError> {
        Ok(self.machine.verify_identity(request).await?)
    }

    /// Step 2 of the signer session: signature commit, exactly-once.
    pub async fn commit_signature(
        &self,
        request: CommitSignatureRequest,
    ) -> Result<SignatureReceipt, FirmaError> {
        Ok(self.machine.commit_signature(request).await?)
    }

    /// Signer-facing view of the document behind a capability token.
    pub async fn signer_view(&self, token: &str) -> Result<SignerView, FirmaError> {
        Ok(self.machine.signer_view(token).await?)
    }

    /// Original document bytes for a signer session.
    pub async fn document_file(&self, token: &str) -> Result<Vec<u8>, FirmaError> {
        Ok(self.machine.document_file(token).await?)
    }

    // ============ Evidence Operations ============

    /// Full evidentiary dossier for a document.
    pub async fn build_dossier(&self, document_id: &DocumentId) -> Result<Dossier, FirmaError> {
        Ok(self.assembler.build_dossier(document_id).await?)
    }

    /// Public verification summary, including audit chain status.
    pub async fn build_verification_summary(
        &self,
        document_id: &DocumentId,
    ) -> Result<VerificationSummary, FirmaError> {
        Ok(self.assembler.build_verification_summary(document_id).await?)
    }

    /// Audit trail for one document.
    pub async fn audit_events(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<AuditEvent>, FirmaError> {
        Ok(self.ledger.events_for_document(document_id).await?)
    }

    /// Verify the whole audit chain. A broken chain is an error, not a
    /// status: callers that reach this path need the breach to stop
    /// them.
    pub async fn verify_audit_chain(&self) -> Result<(), FirmaError> {
        match self.ledger.verify_all().await? {
            ChainVerification::Valid => Ok(()),
            ChainVerification::BrokenAt(sequence) => {
                Err(FirmaError::ChainIntegrity { sequence })
            }
        }
    }

    // ============ Component Access ============

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }
}

impl Default for FirmaService {
    fn default() -> Self {
        Self::new()
    }
}

/// Service-level errors aggregating every component.
#[derive(Debug, Error)]
pub enum FirmaError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("dossier error: {0}")]
    Dossier(#[from] DossierError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("audit chain integrity violation at sequence {sequence}")]
    ChainIntegrity { sequence: u64 },
}
