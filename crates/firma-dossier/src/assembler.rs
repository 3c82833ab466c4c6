//! Dossier and verification summary assembly

use crate::{DossierError, DossierResult};
use chrono::{DateTime, Utc};
use firma_identity::mask_tax_id;
use firma_ledger::{AuditEvent, AuditLedger, ChainVerification};
use firma_registry::Registry;
use firma_types::{DocumentId, Signatory, SigningState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One signatory's full evidentiary record inside a dossier. The tax
/// id is masked exactly as in the audit ledger; the raw digits never
/// leave storage through this path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DossierEntry {
    pub name: String,
    pub email: String,
    pub masked_tax_id: String,
    pub state: SigningState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_accepted_hash: Option<String>,
}

/// The archival bundle for one document: metadata, every signatory's
/// evidentiary record and the document's full audit trail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dossier {
    pub document_id: DocumentId,
    pub title: String,
    pub file_name: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub complete: bool,
    pub signatories: Vec<DossierEntry>,
    pub audit_trail: Vec<AuditEvent>,
}

/// Per-signatory line of the public verification summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatoryStatus {
    pub name: String,
    pub signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_ip: Option<String>,
}

/// Public subset of a dossier: enough to check who signed what and
/// when, plus the audit chain status. Carries no blob references and
/// no captured imagery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub document_id: DocumentId,
    pub title: String,
    pub content_hash: String,
    pub complete: bool,
    pub signatories: Vec<SignatoryStatus>,
    /// False when the recomputed hash chain diverges from storage.
    pub chain_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_broken_at: Option<u64>,
}

/// Read-only assembler over the registry and the audit ledger.
#[derive(Clone)]
pub struct DossierAssembler {
    registry: Registry,
    ledger: AuditLedger,
}

impl DossierAssembler {
    pub fn new(registry: Registry, ledger: AuditLedger) -> Self {
        Self { registry, ledger }
    }

    /// Assemble the full dossier for a document.
    pub async fn build_dossier(&self, document_id: &DocumentId) -> DossierResult<Dossier> {
        let document = self
            .registry
            .get_document(document_id)
            .await?
            .ok_or_else(|| DossierError::DocumentNotFound(document_id.clone()))?;

        let signatories = self.registry.signatories(document_id).await?;
        let complete = !signatories.is_empty() && signatories.iter().all(Signatory::is_submitted);
        let audit_trail = self.ledger.events_for_document(document_id).await?;

        info!(
            document_id = %document_id,
            signatories = signatories.len(),
            events = audit_trail.len(),
            "Dossier assembled"
        );

        Ok(Dossier {
            document_id: document.id,
            title: document.title,
            file_name: document.file_name,
            content_hash: document.content_hash,
            created_at: document.created_at,
            created_by: document.created_by,
            complete,
            signatories: signatories.iter().map(entry).collect(),
            audit_trail,
        })
    }

    /// Assemble the public verification summary, including the result
    /// of a full audit chain verification. A broken chain is reported
    /// in the summary rather than failing the call, so verifiers see
    /// the breach instead of an opaque error.
    pub async fn build_verification_summary(
        &self,
        document_id: &DocumentId,
    ) -> DossierResult<VerificationSummary> {
        let document = self
            .registry
            .get_document(document_id)
            .await?
            .ok_or_else(|| DossierError::DocumentNotFound(document_id.clone()))?;

        let signatories = self.registry.signatories(document_id).await?;
        let complete = !signatories.is_empty() && signatories.iter().all(Signatory::is_submitted);

        let (chain_valid, chain_broken_at) = match self.ledger.verify_all().await? {
            ChainVerification::Valid => (true, None),
            ChainVerification::BrokenAt(sequence) => (false, Some(sequence)),
        };

        Ok(VerificationSummary {
            document_id: document.id,
            title: document.title,
            content_hash: document.content_hash,
            complete,
            signatories: signatories
                .into_iter()
                .map(|signatory| SignatoryStatus {
                    name: signatory.name,
                    signed: signatory.submitted_at.is_some(),
                    submitted_at: signatory.submitted_at,
                    submitter_ip: signatory.submitter_ip,
                })
                .collect(),
            chain_valid,
            chain_broken_at,
        })
    }
}

fn entry(signatory: &Signatory) -> DossierEntry {
    DossierEntry {
        name: signatory.name.clone(),
        email: signatory.email.clone(),
        masked_tax_id: mask_tax_id(&signatory.tax_id),
        state: signatory.state(),
        identity_verified_at: signatory.identity_verified_at,
        submitted_at: signatory.submitted_at,
        submitter_ip: signatory.submitter_ip.clone(),
        latitude: signatory.latitude,
        longitude: signatory.longitude,
        terms_accepted_hash: signatory.terms_accepted_hash.clone(),
    }
}
