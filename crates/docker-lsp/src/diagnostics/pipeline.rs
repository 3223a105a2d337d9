use std::sync::Arc;
use tower_lsp_server::ls_types::{Diagnostic, Uri};

use docker_lsp_core::{CollectorRegistry, DIAGNOSTIC_SOURCE, DockerLspError, DocumentSnapshot};

use super::merge::merge;
use crate::config::ConfigStore;
use crate::document::{DocumentHandle, DocumentStore};
use crate::notifier::Notifier;
use crate::queue::DocumentQueues;
use crate::supervisor;
use crate::telemetry::AnalysisRecorder;
use crate::workspace::WorkspaceFolders;

/// Recomputes and publishes diagnostics for open documents.
///
/// Every run goes through the document's queue, so runs for one document are
/// serialized. A run publishes only if its snapshot is still the current one
/// when it finishes.
#[derive(Clone)]
pub struct DiagnosticsPipeline {
    store: Arc<DocumentStore>,
    registry: Arc<CollectorRegistry>,
    queues: Arc<DocumentQueues>,
    notifier: Arc<dyn Notifier>,
    workspace: Arc<WorkspaceFolders>,
    config: Arc<ConfigStore>,
    recorder: Arc<AnalysisRecorder>,
}

impl DiagnosticsPipeline {
    pub fn new(
        store: Arc<DocumentStore>,
        registry: Arc<CollectorRegistry>,
        queues: Arc<DocumentQueues>,
        notifier: Arc<dyn Notifier>,
        workspace: Arc<WorkspaceFolders>,
        config: Arc<ConfigStore>,
        recorder: Arc<AnalysisRecorder>,
    ) -> Self {
        Self {
            store,
            registry,
            queues,
            notifier,
            workspace,
            config,
            recorder,
        }
    }

    /// Queues a diagnostics run for the current snapshot of `uri`.
    ///
    /// Returns false when the document is not open.
    pub fn schedule(&self, uri: &Uri) -> bool {
        let handle = match self.store.read(uri) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!("not scheduling diagnostics: {}", e);
                return false;
            }
        };

        let pipeline = self.clone();
        self.queues.enqueue(uri.clone(), "diagnostics", async move {
            pipeline.run(handle).await;
        });
        true
    }

    /// Queues a run for every open document. Returns the number scheduled.
    pub fn reschedule_all(&self) -> usize {
        self.store
            .keys()
            .iter()
            .filter(|uri| self.schedule(uri))
            .count()
    }

    /// Removes `uri` from the store and clears its published diagnostics.
    ///
    /// The clear runs on the document's queue after any pending run, then the
    /// queue is retired. Returns false when the document was not open.
    pub fn close(&self, uri: &Uri) -> bool {
        let removed = self.store.close(uri).is_some();
        if removed {
            let notifier = Arc::clone(&self.notifier);
            let target = uri.clone();
            self.queues.enqueue(uri.clone(), "clear", async move {
                notifier.publish(target, Vec::new(), None).await;
            });
        }
        self.queues.retire(uri);
        removed
    }

    async fn run(&self, handle: DocumentHandle) {
        let diagnostics = self.collect(handle.snapshot()).await;
        self.publish_if_current(
            handle.uri(),
            handle.generation(),
            handle.version(),
            diagnostics,
        )
        .await;
    }

    /// Runs every enabled collector for `document` and merges their results.
    ///
    /// A collector that fails or panics contributes nothing.
    pub async fn collect(&self, document: &DocumentSnapshot) -> Vec<Diagnostic> {
        let context = self.workspace.resolve(document.uri());
        let effective = self.config.effective(context.folder.as_ref()).await;
        let global = self.config.global().await;
        let language_id = document.language_id();

        let mut batches = Vec::new();
        for collector in self.registry.for_language(language_id) {
            let name = collector.name();
            if !effective.diagnostics.is_collector_enabled(name) {
                tracing::trace!("collector {} disabled", name);
                continue;
            }

            tracing::trace!("running {} on {}", name, context.relative_path);
            let outcome = supervisor::catch_panic(collector.collect_diagnostics(
                DIAGNOSTIC_SOURCE,
                &context.root,
                document,
                document.text(),
            ))
            .await;

            let error = match outcome {
                Ok(Ok(diagnostics)) => {
                    self.recorder.record_analysis(&context.key, name, language_id);
                    batches.push((name, diagnostics));
                    continue;
                }
                Ok(Err(error)) => error,
                Err(message) => DockerLspError::TaskPanicked {
                    task: name,
                    message,
                },
            };
            tracing::warn!(
                "{} failed on {}: {}",
                name,
                document.uri().as_str(),
                error
            );
            self.recorder.record_failure(name, error.to_string());
        }

        merge(batches, &global.diagnostics.overlap_suppression)
    }

    async fn publish_if_current(
        &self,
        uri: &Uri,
        generation: u64,
        version: i32,
        diagnostics: Vec<Diagnostic>,
    ) -> bool {
        match self.store.get(uri) {
            Err(_) => {
                tracing::debug!("discarding diagnostics for closed {}", uri.as_str());
                false
            }
            Ok(current) if current.generation() != generation || current.version() != version => {
                tracing::debug!(
                    "discarding diagnostics for {} v{}, current is v{}",
                    uri.as_str(),
                    version,
                    current.version()
                );
                false
            }
            Ok(_) => {
                self.notifier
                    .publish(uri.clone(), diagnostics, Some(version))
                    .await;
                true
            }
        }
    }
}
