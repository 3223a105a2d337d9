//! Shared LSP response builders.

use tower_lsp_server::ls_types::{
    CodeDescription, Diagnostic, DiagnosticSeverity, DiagnosticTag, NumberOrString, Position,
    Range, Uri,
};

use crate::DIAGNOSTIC_SOURCE;

/// Returns the length of `text` in UTF-16 code units, the unit LSP positions use.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Checks if a position lies inside a range (inclusive start, exclusive end).
///
/// An empty range contains the position it starts at.
pub fn range_contains(range: Range, position: Position) -> bool {
    if range.start == range.end {
        return range.start == position;
    }
    !(position < range.start || position >= range.end)
}

/// Checks if two ranges share at least one position.
///
/// Touching ranges (one ends where the other starts) overlap, which matches
/// how editors send a collapsed cursor range at the edge of a diagnostic.
pub fn ranges_overlap(a: Range, b: Range) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Range covering the whole of `line`, excluding its line terminator.
///
/// Lines past the end of the text yield an empty range on that line.
pub fn line_range(text: &str, line: u32) -> Range {
    let length = text
        .split('\n')
        .nth(line as usize)
        .map(|content| utf16_len(content.strip_suffix('\r').unwrap_or(content)))
        .unwrap_or(0);
    Range::new(Position::new(line, 0), Position::new(line, length))
}

/// Builds a lint diagnostic with the shared source label.
///
/// `url` becomes the diagnostic's documentation link when it parses as a URI.
pub fn lint_diagnostic(
    range: Range,
    severity: DiagnosticSeverity,
    rule: Option<&str>,
    message: impl Into<String>,
    url: Option<&str>,
) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        code: rule.map(|rule| NumberOrString::String(rule.to_string())),
        code_description: url
            .and_then(|url| url.parse::<Uri>().ok())
            .map(|href| CodeDescription { href }),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: message.into(),
        ..Default::default()
    }
}

/// Adds a tag such as [`DiagnosticTag::DEPRECATED`] to a diagnostic.
pub fn with_tag(mut diagnostic: Diagnostic, tag: DiagnosticTag) -> Diagnostic {
    diagnostic.tags.get_or_insert_with(Vec::new).push(tag);
    diagnostic
}

/// Stamps `source` on every diagnostic.
pub fn with_source(mut diagnostics: Vec<Diagnostic>, source: &str) -> Vec<Diagnostic> {
    for diagnostic in &mut diagnostics {
        diagnostic.source = Some(source.to_string());
    }
    diagnostics
}

/// Returns the diagnostic's code when it is a string rule identifier.
pub fn rule_code(diagnostic: &Diagnostic) -> Option<&str> {
    match diagnostic.code.as_ref()? {
        NumberOrString::String(code) => Some(code.as_str()),
        NumberOrString::Number(_) => None,
    }
}
