//! The signing state machine

use crate::notify::{dispatch, NotifyEvent, Notifier};
use crate::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use firma_identity::{IdentityMatcher, MatchOutcome, MismatchReason};
use firma_ledger::{payloads, AuditAction, AuditAppend, AuditLedger};
use firma_registry::{Registry, RegistryError};
use firma_storage::StorageError;
use firma_types::{
    AccessToken, BlobRef, Document, DocumentId, Signatory, SignatoryId, SubmissionRecord,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

/// Identity verification attempt from a signer session.
#[derive(Clone, Debug)]
pub struct VerifyIdentityRequest {
    pub token: String,
    pub tax_id: String,
    pub birth_date: Option<String>,
    pub ip: String,
    pub user_agent: String,
}

/// Successful identity verification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityVerification {
    pub signatory_id: SignatoryId,
    pub verified_at: DateTime<Utc>,
}

/// Signature commit attempt from a signer session.
#[derive(Clone, Debug)]
pub struct CommitSignatureRequest {
    pub token: String,
    /// Hand-drawn signature image bytes. Required.
    pub signature_image: Vec<u8>,
    /// Biometric selfie bytes. A hard precondition: a signature without
    /// the identification photo is rejected.
    pub selfie_image: Vec<u8>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip: String,
    pub user_agent: String,
}

/// What a committed signature proves, returned to the signer session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureReceipt {
    pub signatory_id: SignatoryId,
    pub document_id: DocumentId,
    pub submitted_at: DateTime<Utc>,
    pub terms_accepted_hash: String,
    /// Whether this commit completed the whole document.
    pub document_complete: bool,
}

/// What a signer session may see about its document before and after
/// submission. A submitted signatory gets the completion record, never
/// an error that implies retry is possible.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignerView {
    Pending {
        title: String,
        file_name: String,
        signatory_name: String,
        signatory_email: String,
    },
    Completed {
        submitted_at: DateTime<Utc>,
    },
}

/// Enforces the per-signatory step order and the single-use,
/// at-most-once completion guarantee.
#[derive(Clone)]
pub struct SigningStateMachine {
    registry: Registry,
    ledger: AuditLedger,
    matcher: IdentityMatcher,
    notifier: Arc<dyn Notifier>,
}

impl SigningStateMachine {
    pub fn new(registry: Registry, ledger: AuditLedger, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            ledger,
            matcher: IdentityMatcher::new(),
            notifier,
        }
    }

    /// Step 1: verify the signer's identity against the registered record.
    ///
    /// A checksum-invalid tax id fails fast with no audit event and no
    /// stored-data access. A well-formed mismatch appends an
    /// `IDENTITY_VERIFIED {success:false}` event and returns the generic
    /// mismatch error. Re-verification with correct credentials is
    /// idempotent.
    pub async fn verify_identity(
        &self,
        request: VerifyIdentityRequest,
    ) -> WorkflowResult<IdentityVerification> {
        let signatory = self.load_unsigned(&request.token).await?;

        let outcome = self
            .matcher
            .verify(&signatory, &request.tax_id, request.birth_date.as_deref())?;

        match outcome {
            MatchOutcome::Matched => {
                let verified = self
                    .registry
                    .record_identity_verified(&signatory.token, Utc::now())
                    .await
                    .map_err(map_storage)?;

                self.ledger
                    .append(AuditAppend::new(
                        Some(signatory.document_id.clone()),
                        AuditAction::IdentityVerified,
                        signatory.name.clone(),
                        request.ip,
                        request.user_agent,
                        payloads::identity_verified(true, &signatory.tax_id),
                    ))
                    .await?;

                info!(signatory = %signatory.id, "Identity verified");
                Ok(IdentityVerification {
                    signatory_id: verified.id,
                    verified_at: verified
                        .identity_verified_at
                        .unwrap_or_else(Utc::now),
                })
            }
            MatchOutcome::Mismatch(MismatchReason::AlreadySubmitted) => {
                Err(WorkflowError::AlreadyCompleted)
            }
            MatchOutcome::Mismatch(reason) => {
                // The reason stays internal; the ledger records only the
                // failed attempt.
                warn!(signatory = %signatory.id, ?reason, "Identity mismatch");
                self.ledger
                    .append(AuditAppend::new(
                        Some(signatory.document_id.clone()),
                        AuditAction::IdentityVerified,
                        signatory.name.clone(),
                        request.ip,
                        request.user_agent,
                        payloads::identity_verified(false, &request.tax_id),
                    ))
                    .await?;
                Err(WorkflowError::IdentityMismatch)
            }
        }
    }

    /// Step 2: commit the captured signature. Exactly-once per token.
    ///
    /// The conditional update on `submitted_at` is the race arbiter: of
    /// two concurrent commits one succeeds and the other observes
    /// `AlreadyCompleted`. Completion notification is handed off to a
    /// detached task after commit and can neither block nor roll it back.
    pub async fn commit_signature(
        &self,
        request: CommitSignatureRequest,
    ) -> WorkflowResult<SignatureReceipt> {
        if request.signature_image.is_empty() {
            return Err(WorkflowError::MissingCapture("signature image"));
        }
        if request.selfie_image.is_empty() {
            return Err(WorkflowError::MissingCapture("selfie image"));
        }

        let signatory = self.load_unsigned(&request.token).await?;
        let document = self.load_document(&signatory.document_id).await?;

        let selfie_ref = self
            .registry
            .blobs()
            .put(request.selfie_image)
            .await
            .map_err(map_storage)?;
        let signature_ref = self
            .registry
            .blobs()
            .put(request.signature_image)
            .await
            .map_err(map_storage)?;

        let submitted_at = Utc::now();
        let terms_accepted_hash = terms_hash(
            &request.token,
            &signatory.name,
            &signatory.tax_id,
            submitted_at,
            &request.ip,
        );

        let record = SubmissionRecord {
            submitted_at,
            submitter_ip: request.ip.clone(),
            submitter_user_agent: request.user_agent.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            signature_ref: signature_ref.clone(),
            selfie_ref: selfie_ref.clone(),
            terms_accepted_hash: terms_accepted_hash.clone(),
        };

        // The race arbiter: the losing concurrent commit surfaces here
        // as Conflict and becomes AlreadyCompleted.
        let submitted = match self
            .registry
            .commit_submission(&signatory.token, record)
            .await
        {
            Ok(submitted) => submitted,
            Err(error) => {
                self.release_orphaned_captures(&signatory.token, [signature_ref, selfie_ref])
                    .await;
                return Err(map_storage(error));
            }
        };

        self.ledger
            .append(AuditAppend::new(
                Some(document.id.clone()),
                AuditAction::SignatureCompleted,
                submitted.name.clone(),
                request.ip,
                request.user_agent,
                payloads::signature_completed(
                    &submitted.tax_id,
                    request.latitude,
                    request.longitude,
                    &terms_accepted_hash,
                    &document.content_hash,
                ),
            ))
            .await?;

        info!(
            signatory = %submitted.id,
            document_id = %document.id,
            "Signature committed"
        );

        dispatch(
            self.notifier.clone(),
            NotifyEvent::SignatureCaptured {
                document_id: document.id.clone(),
                signatory_name: submitted.name.clone(),
            },
        );

        let document_complete = self
            .registry
            .is_complete(&document.id)
            .await
            .map_err(map_registry)?;
        if document_complete {
            info!(document_id = %document.id, "Document fully signed");
            dispatch(
                self.notifier.clone(),
                NotifyEvent::DocumentCompleted {
                    document_id: document.id.clone(),
                    notify_email: document.notify_email.clone(),
                },
            );
        }

        Ok(SignatureReceipt {
            signatory_id: submitted.id,
            document_id: document.id,
            submitted_at,
            terms_accepted_hash,
            document_complete,
        })
    }

    /// Signer-facing view of the document behind a token.
    pub async fn signer_view(&self, token: &str) -> WorkflowResult<SignerView> {
        let signatory = self.load(token).await?;

        if let Some(submitted_at) = signatory.submitted_at {
            return Ok(SignerView::Completed { submitted_at });
        }

        let document = self.load_document(&signatory.document_id).await?;

        Ok(SignerView::Pending {
            title: document.title,
            file_name: document.file_name,
            signatory_name: signatory.name,
            signatory_email: signatory.email,
        })
    }

    /// Original document bytes for the signer's session.
    pub async fn document_file(&self, token: &str) -> WorkflowResult<Vec<u8>> {
        let signatory = self.load(token).await?;
        let document = self.load_document(&signatory.document_id).await?;
        self.registry
            .blobs()
            .get(&document.file_ref)
            .await
            .map_err(map_storage)
    }

    async fn load(&self, token: &str) -> WorkflowResult<Signatory> {
        self.registry
            .get_by_token(&firma_types::AccessToken::new(token))
            .await
            .map_err(map_registry)?
            .ok_or(WorkflowError::TokenNotFound)
    }

    async fn load_document(&self, document_id: &DocumentId) -> WorkflowResult<Document> {
        self.registry
            .get_document(document_id)
            .await
            .map_err(map_registry)?
            .ok_or(WorkflowError::DocumentNotFound)
    }

    /// Remove capture blobs stored by a commit that did not go through.
    /// Content addressing means a losing commit with bytes identical to
    /// the winner's shares its refs, so anything referenced by the
    /// stored record stays.
    async fn release_orphaned_captures(&self, token: &AccessToken, refs: [BlobRef; 2]) {
        let kept = match self.registry.get_by_token(token).await {
            Ok(Some(signatory)) => [signatory.signature_ref, signatory.selfie_ref],
            _ => [None, None],
        };
        for blob_ref in refs {
            if kept.iter().flatten().any(|k| *k == blob_ref) {
                continue;
            }
            if let Err(error) = self.registry.blobs().remove(&blob_ref).await {
                warn!(%blob_ref, %error, "Failed to remove orphaned capture blob");
            }
        }
    }

    /// Load and apply the terminal-state absorption: once `submitted_at`
    /// is observed set, every transition fails with `AlreadyCompleted`.
    async fn load_unsigned(&self, token: &str) -> WorkflowResult<Signatory> {
        let signatory = self.load(token).await?;
        if signatory.is_submitted() {
            return Err(WorkflowError::AlreadyCompleted);
        }
        Ok(signatory)
    }
}

fn map_storage(error: StorageError) -> WorkflowError {
    match error {
        StorageError::Conflict(_) => WorkflowError::AlreadyCompleted,
        StorageError::NotFound(_) => WorkflowError::TokenNotFound,
        other => WorkflowError::Storage(other),
    }
}

fn map_registry(error: RegistryError) -> WorkflowError {
    match error {
        RegistryError::Storage(storage) => map_storage(storage),
        RegistryError::Validation(validation) => WorkflowError::Validation(validation),
        RegistryError::DocumentNotFound(_) => WorkflowError::DocumentNotFound,
        RegistryError::EmptyFile | RegistryError::NoSignatories => {
            WorkflowError::Storage(StorageError::InvalidInput(error.to_string()))
        }
    }
}

/// Non-repudiation anchor binding the acceptance to the signer, the
/// moment and the origin address.
fn terms_hash(
    token: &str,
    name: &str,
    tax_id: &str,
    accepted_at: DateTime<Utc>,
    ip: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update(tax_id.as_bytes());
    hasher.update(b"true");
    hasher.update(accepted_at.to_rfc3339().as_bytes());
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}
