//! Named quick-fix suggestions carried inside diagnostics.
//!
//! Collectors attach suggestions to a diagnostic's `data` field so that the
//! code action handler can later turn them into text edits without re-running
//! any analysis.

use serde::{Deserialize, Serialize};
use tower_lsp_server::ls_types::{Diagnostic, Range};

/// A named replacement offered to the user for one diagnostic.
///
/// When `range` is `None` the replacement covers the diagnostic's own range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    pub title: String,
    pub edit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl QuickFix {
    /// Creates a quick fix replacing the diagnostic's own range.
    pub fn new(title: impl Into<String>, edit: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            edit: edit.into(),
            range: None,
        }
    }

    /// Creates a quick fix replacing an explicit range.
    pub fn with_range(title: impl Into<String>, edit: impl Into<String>, range: Range) -> Self {
        Self {
            title: title.into(),
            edit: edit.into(),
            range: Some(range),
        }
    }

    /// The range this fix replaces within a diagnostic.
    pub fn target_range(&self, diagnostic: &Diagnostic) -> Range {
        self.range.unwrap_or(diagnostic.range)
    }
}

/// Attaches quick fixes to a diagnostic, replacing any previous ones.
///
/// An empty list leaves the diagnostic unchanged.
pub fn with_quick_fixes(mut diagnostic: Diagnostic, fixes: Vec<QuickFix>) -> Diagnostic {
    if fixes.is_empty() {
        return diagnostic;
    }
    match serde_json::to_value(fixes) {
        Ok(data) => diagnostic.data = Some(data),
        Err(e) => tracing::warn!("failed to serialize quick fixes: {}", e),
    }
    diagnostic
}

/// Extracts quick fixes from a diagnostic.
///
/// Diagnostics without data, or with data written by another server, yield
/// an empty list.
pub fn quick_fixes(diagnostic: &Diagnostic) -> Vec<QuickFix> {
    diagnostic
        .data
        .as_ref()
        .and_then(|data| serde_json::from_value(data.clone()).ok())
        .unwrap_or_default()
}
