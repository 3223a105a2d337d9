use async_trait::async_trait;
use std::path::Path;
use tower_lsp_server::ls_types::Diagnostic;

use docker_lsp_core::{Collector, DocumentSnapshot, LanguageId, Result, with_source};

use crate::rules::{self, Rule};

/// Built-in build-check collector.
///
/// Runs entirely in-process over the snapshot's parsed view and never
/// touches the filesystem.
#[derive(Debug, Default)]
pub struct DockerfileCollector {
    disabled_rules: Vec<Rule>,
}

impl DockerfileCollector {
    pub const NAME: &'static str = "dockerfile-lint";

    pub fn new() -> Self {
        Self::default()
    }

    /// Disables rules by code; unknown codes are ignored.
    pub fn with_disabled_rules<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let disabled_rules = codes
            .into_iter()
            .filter_map(|code| {
                let rule = Rule::from_code(code);
                if rule.is_none() {
                    tracing::debug!("ignoring unknown dockerfile rule '{}'", code);
                }
                rule
            })
            .collect();
        Self { disabled_rules }
    }
}

#[async_trait]
impl Collector for DockerfileCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports_language_identifier(&self, language_id: &str) -> bool {
        LanguageId::from_identifier(language_id) == Some(LanguageId::Dockerfile)
    }

    async fn collect_diagnostics(
        &self,
        source: &str,
        _workspace_root: &Path,
        document: &DocumentSnapshot,
        _text: &str,
    ) -> Result<Vec<Diagnostic>> {
        let Some(view) = document.as_dockerfile() else {
            return Ok(vec![]);
        };
        let diagnostics = rules::lint(view, &self.disabled_rules);
        tracing::trace!(count = diagnostics.len(), "dockerfile rules evaluated");
        Ok(with_source(diagnostics, source))
    }
}
