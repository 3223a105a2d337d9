use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use docker_lsp_core::CollectorRegistry;

use crate::config::{ConfigStore, ServerConfig};
use crate::diagnostics::DiagnosticsPipeline;
use crate::document::DocumentStore;
use crate::notifier::Notifier;
use crate::queue::DocumentQueues;
use crate::telemetry::AnalysisRecorder;
use crate::workspace::WorkspaceFolders;

/// Global server state shared by all handlers.
pub struct ServerState {
    /// Open documents by URI
    pub store: Arc<DocumentStore>,
    /// Per-document job queues
    pub queues: Arc<DocumentQueues>,
    /// Diagnostics collectors in registration order
    pub registry: Arc<CollectorRegistry>,
    pub config: Arc<ConfigStore>,
    pub workspace: Arc<WorkspaceFolders>,
    pub recorder: Arc<AnalysisRecorder>,
    pub pipeline: DiagnosticsPipeline,
    /// Server-wide background task handles
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl ServerState {
    /// Creates a server state with the built-in collectors registered.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(CollectorRegistry::new());
        crate::register_collectors(&registry, &ServerConfig::default());
        Self::with_registry(notifier, registry)
    }

    /// Creates a server state using `registry` as is.
    pub fn with_registry(notifier: Arc<dyn Notifier>, registry: Arc<CollectorRegistry>) -> Self {
        let store = Arc::new(DocumentStore::new());
        let recorder = Arc::new(AnalysisRecorder::default());
        let queues = Arc::new(DocumentQueues::new(Arc::clone(&recorder)));
        let config = Arc::new(ConfigStore::default());
        let workspace = Arc::new(WorkspaceFolders::new());

        let pipeline = DiagnosticsPipeline::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&queues),
            notifier,
            Arc::clone(&workspace),
            Arc::clone(&config),
            Arc::clone(&recorder),
        );

        Self {
            store,
            queues,
            registry,
            config,
            workspace,
            recorder,
            pipeline,
            background: Mutex::new(Vec::new()),
        }
    }

    /// Installs a new global configuration and recomputes every open document.
    ///
    /// Returns the number of documents rescheduled.
    pub async fn apply_config(&self, config: ServerConfig) -> usize {
        crate::register_collectors(&self.registry, &config);
        self.recorder.set_enabled(config.telemetry.enabled);
        self.config.set_global(config).await;
        self.pipeline.reschedule_all()
    }

    pub fn track_background(&self, handle: JoinHandle<()>) {
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        background.retain(|task| !task.is_finished());
        background.push(handle);
    }

    /// Aborts all background tasks. Returns how many were still running.
    pub fn abort_background(&self) -> usize {
        let tasks: Vec<_> = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let mut running = 0;
        for task in tasks {
            if !task.is_finished() {
                running += 1;
                task.abort();
            }
        }
        running
    }
}
