use async_trait::async_trait;
use std::path::Path;
use tower_lsp_server::ls_types::Diagnostic;

use crate::DocumentSnapshot;

/// Source label stamped on every diagnostic the server publishes.
pub const DIAGNOSTIC_SOURCE: &str = "docker-lsp";

/// A pluggable diagnostics source evaluated against a document snapshot.
///
/// Each analyzer (Dockerfile lint rules, external linters, Compose checks)
/// provides its own implementation. Collectors are registered once in the
/// server's [`CollectorRegistry`](crate::CollectorRegistry) and are invoked
/// sequentially for every diagnostics pass of a matching document.
///
/// # Contract
///
/// - [`supports_language_identifier`](Collector::supports_language_identifier)
///   is pure and stateless.
/// - [`collect_diagnostics`](Collector::collect_diagnostics) may be slow and may
///   spawn external processes, but must treat its inputs as read-only and must
///   not mutate state shared with other collectors. It is responsible for
///   bounding the runtime of any process it starts.
/// - A returned error or a panic contributes zero diagnostics for the pass; it
///   never aborts the collectors that run after it.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use docker_lsp_core::{Collector, DocumentSnapshot, Result};
/// use std::path::Path;
/// use tower_lsp_server::ls_types::Diagnostic;
///
/// struct NoopCollector;
///
/// #[async_trait]
/// impl Collector for NoopCollector {
///     fn name(&self) -> &'static str {
///         "noop"
///     }
///
///     fn supports_language_identifier(&self, _language_id: &str) -> bool {
///         true
///     }
///
///     async fn collect_diagnostics(
///         &self,
///         _source: &str,
///         _workspace_root: &Path,
///         _document: &DocumentSnapshot,
///         _text: &str,
///     ) -> Result<Vec<Diagnostic>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait Collector: Send + Sync {
    /// Unique identifier (e.g., "dockerfile-lint", "hadolint", "compose-lint").
    ///
    /// Used for registration, configuration toggles, and failure accounting.
    fn name(&self) -> &'static str;

    /// Returns true if this collector analyzes documents with the given
    /// language identifier.
    fn supports_language_identifier(&self, language_id: &str) -> bool;

    /// Computes diagnostics for one document snapshot.
    ///
    /// # Arguments
    ///
    /// * `source` - Source label to stamp on produced diagnostics
    /// * `workspace_root` - Workspace folder containing the document, or a
    ///   temporary directory when the document is outside every folder
    /// * `document` - Immutable snapshot being analyzed
    /// * `text` - Raw document text (same content as `document.text()`)
    async fn collect_diagnostics(
        &self,
        source: &str,
        workspace_root: &Path,
        document: &DocumentSnapshot,
        text: &str,
    ) -> crate::error::Result<Vec<Diagnostic>>;
}
