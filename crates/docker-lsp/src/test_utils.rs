//! Test utilities for building server state without a client.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, Range, Uri};

use docker_lsp_core::{Collector, CollectorRegistry, DocumentSnapshot, lint_diagnostic};

use crate::diagnostics::DiagnosticsPipeline;
use crate::notifier::RecordingNotifier;
use crate::state::ServerState;

pub fn uri(path: &str) -> Uri {
    Uri::from_file_path(path).unwrap()
}

/// Server state with the built-in collectors and a recording notifier.
pub fn test_state() -> (ServerState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let state = ServerState::new(notifier.clone());
    (state, notifier)
}

/// Pipeline running exactly `collectors`, in order.
pub fn test_pipeline(
    collectors: Vec<Arc<dyn Collector>>,
) -> (DiagnosticsPipeline, Arc<RecordingNotifier>) {
    let registry = Arc::new(CollectorRegistry::new());
    for collector in collectors {
        registry.register(collector);
    }
    let notifier = Arc::new(RecordingNotifier::new());
    let state = ServerState::with_registry(notifier.clone(), registry);
    (state.pipeline, notifier)
}

/// Collector reporting one warning with `code` for every document of `language`.
pub fn static_collector(
    name: &'static str,
    language: &'static str,
    code: &'static str,
) -> Arc<dyn Collector> {
    Arc::new(StaticCollector {
        name,
        language,
        code,
    })
}

struct StaticCollector {
    name: &'static str,
    language: &'static str,
    code: &'static str,
}

#[async_trait]
impl Collector for StaticCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_language_identifier(&self, language_id: &str) -> bool {
        language_id == self.language
    }

    async fn collect_diagnostics(
        &self,
        _source: &str,
        _workspace_root: &Path,
        _document: &DocumentSnapshot,
        _text: &str,
    ) -> docker_lsp_core::Result<Vec<Diagnostic>> {
        Ok(vec![lint_diagnostic(
            Range::default(),
            DiagnosticSeverity::WARNING,
            Some(self.code),
            self.code,
            None,
        )])
    }
}
