use async_trait::async_trait;
use std::path::Path;
use tower_lsp_server::ls_types::Diagnostic;

use docker_lsp_core::{Collector, DocumentSnapshot, LanguageId, Result, with_source};

use crate::rules;

/// Compose manifest collector.
#[derive(Debug, Default)]
pub struct ComposeCollector;

impl ComposeCollector {
    pub const NAME: &'static str = "compose-lint";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for ComposeCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports_language_identifier(&self, language_id: &str) -> bool {
        LanguageId::from_identifier(language_id) == Some(LanguageId::Compose)
    }

    async fn collect_diagnostics(
        &self,
        source: &str,
        _workspace_root: &Path,
        document: &DocumentSnapshot,
        _text: &str,
    ) -> Result<Vec<Diagnostic>> {
        let Some(outline) = document.as_compose() else {
            return Ok(vec![]);
        };
        let diagnostics = rules::lint(outline);
        tracing::trace!(count = diagnostics.len(), "compose rules evaluated");
        Ok(with_source(diagnostics, source))
    }
}
