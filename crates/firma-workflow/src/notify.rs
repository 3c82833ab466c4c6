//! Notification handoff.
//!
//! Notifications are best-effort and fully decoupled from the commit
//! path: dispatch happens on a detached task after the transition has
//! persisted, failures are logged and never propagated, and no lock is
//! held while a notifier runs.

use async_trait::async_trait;
use firma_types::DocumentId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Events a downstream notifier may act on (send email, call the ERP).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyEvent {
    SignatureCaptured {
        document_id: DocumentId,
        signatory_name: String,
    },
    DocumentCompleted {
        document_id: DocumentId,
        notify_email: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound notification channel. Implementations talk to the outside
/// world; the core only ever calls this from detached tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent) -> Result<(), NotifyError>;
}

/// Default no-op notifier.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<(), NotifyError> {
        debug!(?event, "Notification dropped (null notifier)");
        Ok(())
    }
}

/// Test notifier that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: RwLock<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.read().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<(), NotifyError> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Fire-and-forget dispatch. The spawned task owns the failure: it is
/// logged, never returned, and cannot block or fail the caller.
pub(crate) fn dispatch(notifier: Arc<dyn Notifier>, event: NotifyEvent) {
    tokio::spawn(async move {
        if let Err(error) = notifier.notify(event.clone()).await {
            warn!(?event, %error, "Notification delivery failed");
        }
    });
}
