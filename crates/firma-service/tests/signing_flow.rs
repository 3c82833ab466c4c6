//! End-to-end signing flows through the service facade.

use firma_ledger::{AuditAction, MemoryAuditStore};
use firma_registry::{CreateDocumentRequest, SignatoryDraft};
use firma_service::{FirmaError, FirmaService};
use firma_storage::{InMemorySigningStorage, MemoryBlobStore};
use firma_workflow::{
    CommitSignatureRequest, NotifyEvent, RecordingNotifier, SignerView, VerifyIdentityRequest,
    WorkflowError,
};
use std::sync::Arc;
use std::time::Duration;

fn ana_request() -> CreateDocumentRequest {
    CreateDocumentRequest {
        title: "Service agreement".to_string(),
        file_name: "contract.pdf".to_string(),
        file_bytes: b"%PDF-1.4 service agreement body".to_vec(),
        signatories: vec![SignatoryDraft {
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            phone: Some("+55 11 91234-5678".to_string()),
            tax_id: "529.982.247-25".to_string(),
            birth_date: Some("1990-05-10".to_string()),
        }],
        created_by: "erp".to_string(),
        notify_email: Some("ops@example.com".to_string()),
        base_url: "https://sign.example.com".to_string(),
    }
}

fn verify_request(token: &str) -> VerifyIdentityRequest {
    VerifyIdentityRequest {
        token: token.to_string(),
        tax_id: "529.982.247-25".to_string(),
        birth_date: Some("10/05/1990".to_string()),
        ip: "203.0.113.7".to_string(),
        user_agent: "signer-browser".to_string(),
    }
}

fn commit_request(token: &str) -> CommitSignatureRequest {
    CommitSignatureRequest {
        token: token.to_string(),
        signature_image: b"signature strokes".to_vec(),
        selfie_image: b"selfie pixels".to_vec(),
        latitude: Some(-23.55),
        longitude: Some(-46.63),
        ip: "203.0.113.7".to_string(),
        user_agent: "signer-browser".to_string(),
    }
}

#[tokio::test]
async fn full_signing_flow() {
    let service = FirmaService::new();

    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    match service.signer_view(&token).await.unwrap() {
        SignerView::Pending { signatory_name, .. } => assert_eq!(signatory_name, "Ana Souza"),
        other => panic!("expected pending view, got {other:?}"),
    }

    // Formatted id and locale-ordered birth date both canonicalize
    service.verify_identity(verify_request(&token)).await.unwrap();

    let receipt = service.commit_signature(commit_request(&token)).await.unwrap();
    assert!(receipt.document_complete);
    assert_eq!(receipt.terms_accepted_hash.len(), 64);

    assert!(service.is_complete(&created.document_id).await.unwrap());

    let actions: Vec<AuditAction> = service
        .audit_events(&created.document_id)
        .await
        .unwrap()
        .iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::DocumentCreated,
            AuditAction::IdentityVerified,
            AuditAction::SignatureCompleted,
        ]
    );

    service.verify_audit_chain().await.unwrap();

    let dossier = service.build_dossier(&created.document_id).await.unwrap();
    assert!(dossier.complete);
    assert_eq!(dossier.signatories[0].masked_tax_id, "529******25");
    assert_eq!(dossier.content_hash, created.content_hash);

    let summary = service
        .build_verification_summary(&created.document_id)
        .await
        .unwrap();
    assert!(summary.chain_valid);
    assert!(summary.signatories[0].signed);

    let bytes = service.document_file(&token).await.unwrap();
    assert_eq!(bytes, b"%PDF-1.4 service agreement body");
}

#[tokio::test]
async fn checksum_invalid_id_is_rejected_without_audit_noise() {
    let service = FirmaService::new();
    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    let mut request = verify_request(&token);
    request.tax_id = "111.111.111-11".to_string();
    let result = service.verify_identity(request).await;
    assert!(matches!(
        result,
        Err(FirmaError::Workflow(WorkflowError::Validation(_)))
    ));

    // Only the creation event; a malformed id never reaches the ledger
    let events = service.audit_events(&created.document_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::DocumentCreated);
}

#[tokio::test]
async fn well_formed_mismatch_is_audited() {
    let service = FirmaService::new();
    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    // Valid checksum, wrong person
    let mut request = verify_request(&token);
    request.tax_id = "111.444.777-35".to_string();
    let result = service.verify_identity(request).await;
    assert!(matches!(
        result,
        Err(FirmaError::Workflow(WorkflowError::IdentityMismatch))
    ));

    let events = service.audit_events(&created.document_id).await.unwrap();
    let failed = events
        .iter()
        .find(|event| event.action == AuditAction::IdentityVerified)
        .unwrap();
    assert_eq!(failed.payload["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_commits_complete_exactly_once() {
    let service = FirmaService::new();
    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    let first = {
        let service = service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.commit_signature(commit_request(&token)).await })
    };
    let second = {
        let service = service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.commit_signature(commit_request(&token)).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(FirmaError::Workflow(WorkflowError::AlreadyCompleted))
    )));

    let completions = service
        .audit_events(&created.document_id)
        .await
        .unwrap()
        .iter()
        .filter(|event| event.action == AuditAction::SignatureCompleted)
        .count();
    assert_eq!(completions, 1);

    service.verify_audit_chain().await.unwrap();
}

#[tokio::test]
async fn purge_leaves_an_audit_trace() {
    let service = FirmaService::new();
    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();

    let purged = service
        .purge_document(&created.document_id, "admin", "203.0.113.9", "admin-console")
        .await
        .unwrap();
    assert_eq!(purged.signatory_count, 1);

    assert!(service
        .get_document(&created.document_id)
        .await
        .unwrap()
        .is_none());

    // The purge outlives the document in the ledger
    let events = service.audit_events(&created.document_id).await.unwrap();
    assert_eq!(
        events.last().unwrap().action,
        AuditAction::AdministrativePurge
    );

    service.verify_audit_chain().await.unwrap();

    assert!(matches!(
        service
            .purge_document(&created.document_id, "admin", "203.0.113.9", "admin-console")
            .await,
        Err(FirmaError::Registry(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_is_notified_out_of_band() {
    let notifier = Arc::new(RecordingNotifier::new());
    let service = FirmaService::with_components(
        Arc::new(InMemorySigningStorage::new()),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(MemoryAuditStore::new()),
        notifier.clone(),
    );

    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    service.commit_signature(commit_request(&token)).await.unwrap();

    // Dispatch runs on detached tasks; wait for both events to land
    let mut events = notifier.events();
    for _ in 0..100 {
        if events.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        events = notifier.events();
    }

    assert!(events.iter().any(|event| matches!(
        event,
        NotifyEvent::SignatureCaptured { signatory_name, .. } if signatory_name == "Ana Souza"
    )));
    assert!(events.iter().any(|event| matches!(
        event,
        NotifyEvent::DocumentCompleted { notify_email, .. }
            if notify_email.as_deref() == Some("ops@example.com")
    )));
}

#[tokio::test]
async fn listing_tracks_progress() {
    let service = FirmaService::new();
    let created = service
        .create_document(ana_request(), "203.0.113.1", "erp-client")
        .await
        .unwrap();
    let token = created.links[0].token.as_str().to_string();

    let listing = service.list_documents().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].signatory_count, 1);
    assert_eq!(listing[0].submitted_count, 0);

    service.commit_signature(commit_request(&token)).await.unwrap();

    let listing = service.list_documents().await.unwrap();
    assert_eq!(listing[0].submitted_count, 1);
    assert_eq!(listing[0].document_id, created.document_id);
}
