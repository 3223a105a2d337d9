//! Top-level structure checks for Compose manifests.

use std::collections::HashMap;

use docker_lsp_core::{
    ComposeOutline, QuickFix, TopLevelKey, lint_diagnostic, with_quick_fixes, with_tag,
};
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, DiagnosticTag, Position, Range};

/// Keys the Compose file format allows at the top level.
pub const ALLOWED_TOP_LEVEL_KEYS: &[&str] = &[
    "version", "name", "services", "networks", "volumes", "configs", "secrets", "include",
    "models",
];

pub const OBSOLETE_VERSION_MESSAGE: &str =
    "the attribute `version` is obsolete, it will be ignored, please remove it to avoid potential confusion";

fn is_allowed(name: &str) -> bool {
    ALLOWED_TOP_LEVEL_KEYS.contains(&name) || name.starts_with("x-")
}

/// Lints the outline; diagnostics come out in document order.
pub fn lint(outline: &ComposeOutline) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut first_seen: HashMap<&str, &TopLevelKey> = HashMap::new();

    for key in outline.keys() {
        if let Some(first) = first_seen.get(key.name.as_str()) {
            diagnostics.push(lint_diagnostic(
                key.range,
                DiagnosticSeverity::ERROR,
                None,
                format!(
                    "duplicate key `{}`, first defined on line {}",
                    key.name,
                    first.range.start.line + 1
                ),
                None,
            ));
            continue;
        }
        first_seen.insert(&key.name, key);

        if key.name == "version" {
            diagnostics.push(obsolete_version(key, outline.line_count()));
        } else if !is_allowed(&key.name) {
            diagnostics.push(lint_diagnostic(
                key.range,
                DiagnosticSeverity::ERROR,
                None,
                format!("Additional property {} is not allowed", key.name),
                None,
            ));
        }
    }
    diagnostics
}

fn obsolete_version(key: &TopLevelKey, line_count: u32) -> Diagnostic {
    let line = key.range.start.line;
    // Remove the line including its terminator when one follows.
    let removal = if line + 1 < line_count {
        Range::new(Position::new(line, 0), Position::new(line + 1, 0))
    } else {
        key.line_range
    };
    let diagnostic = lint_diagnostic(
        key.line_range,
        DiagnosticSeverity::WARNING,
        None,
        OBSOLETE_VERSION_MESSAGE,
        None,
    );
    with_quick_fixes(
        with_tag(diagnostic, DiagnosticTag::DEPRECATED),
        vec![QuickFix::with_range("Remove the obsolete `version` attribute", "", removal)],
    )
}
