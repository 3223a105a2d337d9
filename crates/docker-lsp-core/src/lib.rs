//! Core abstractions for docker-lsp.
//!
//! This crate provides the foundational types shared by the server and by
//! every format-specific analyzer (Dockerfile, Compose, Bake).
//!
//! # Architecture
//!
//! docker-lsp-core defines:
//! - **Documents**: immutable [`DocumentSnapshot`]s tagged with a [`DocumentKind`]
//! - **Collectors**: the [`Collector`] trait every diagnostics source implements
//! - **Quick fixes**: named replacement suggestions carried inside diagnostics
//! - **Error Types**: unified error handling across all crates
//!
//! # Examples
//!
//! Implementing a collector for a new format:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use docker_lsp_core::{Collector, DocumentSnapshot};
//! use std::path::Path;
//! use tower_lsp_server::ls_types::Diagnostic;
//!
//! struct TodoCollector;
//!
//! #[async_trait]
//! impl Collector for TodoCollector {
//!     fn name(&self) -> &'static str {
//!         "todo"
//!     }
//!
//!     fn supports_language_identifier(&self, language_id: &str) -> bool {
//!         language_id == "dockerfile"
//!     }
//!
//!     async fn collect_diagnostics(
//!         &self,
//!         _source: &str,
//!         _workspace_root: &Path,
//!         _document: &DocumentSnapshot,
//!         _text: &str,
//!     ) -> docker_lsp_core::Result<Vec<Diagnostic>> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod collector;
pub mod collector_registry;
pub mod document;
pub mod error;
pub mod lsp_helpers;
pub mod quick_fix;
pub mod syntax;

// Re-export commonly used types
pub use collector::{Collector, DIAGNOSTIC_SOURCE};
pub use collector_registry::CollectorRegistry;
pub use document::{DocumentKind, DocumentSnapshot, LanguageId};
pub use error::{DockerLspError, Result};
pub use lsp_helpers::{
    line_range, lint_diagnostic, range_contains, ranges_overlap, rule_code, utf16_len, with_source,
    with_tag,
};
pub use quick_fix::{QuickFix, quick_fixes, with_quick_fixes};
pub use syntax::compose::{ComposeOutline, TopLevelKey};
pub use syntax::dockerfile::{DockerfileView, Instruction, Token};
