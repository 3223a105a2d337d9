//! Outbound diagnostics delivery.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{Diagnostic, Uri};

/// Delivers diagnostics to the editor. Fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, uri: Uri, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

#[async_trait]
impl Notifier for Client {
    async fn publish(&self, uri: Uri, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diagnostics, version).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub uri: Uri,
    pub version: Option<i32>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Notifier that keeps every publication in memory (primarily for testing/benchmarking).
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    publications: Mutex<Vec<Publication>>,
    changed: Notify,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.publications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn for_uri(&self, uri: &Uri) -> Vec<Publication> {
        self.publications()
            .into_iter()
            .filter(|publication| &publication.uri == uri)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.publications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until at least `count` publications were recorded.
    ///
    /// Returns false when `timeout` elapsed first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let notified = self.changed.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, uri: Uri, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.publications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Publication {
                uri,
                version,
                diagnostics,
            });
        self.changed.notify_waiters();
    }
}
