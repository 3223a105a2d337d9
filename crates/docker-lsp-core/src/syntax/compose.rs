//! Top-level key outline of a Compose manifest.

use tower_lsp_server::ls_types::{Position, Range};

use crate::lsp_helpers::utf16_len;

/// A mapping key found at column zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelKey {
    pub name: String,
    /// Range of the key name, without the colon.
    pub range: Range,
    /// Range of the whole line the key is declared on.
    pub line_range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeOutline {
    keys: Vec<TopLevelKey>,
    line_count: u32,
}

impl ComposeOutline {
    /// Top-level keys in document order, duplicates included.
    pub fn keys(&self) -> &[TopLevelKey] {
        &self.keys
    }

    pub fn key(&self, name: &str) -> Option<&TopLevelKey> {
        self.keys.iter().find(|key| key.name == name)
    }

    pub fn line_count(&self) -> u32 {
        self.line_count
    }
}

/// Collects top-level keys.
///
/// Comments, document markers and sequence entries at column zero are
/// skipped. Quoted keys are unquoted.
pub fn outline(text: &str) -> ComposeOutline {
    let mut keys = Vec::new();
    let mut line_count = 0;

    for (number, line) in text.split('\n').enumerate() {
        line_count += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(key) = top_level_key(line, number as u32) {
            keys.push(key);
        }
    }

    ComposeOutline { keys, line_count }
}

fn top_level_key(line: &str, number: u32) -> Option<TopLevelKey> {
    let first = line.chars().next()?;
    if first.is_whitespace() || matches!(first, '#' | '-' | '.') {
        return None;
    }

    let (raw, rest) = split_key(line)?;
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }

    let name = raw
        .trim_end()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    if name.is_empty() {
        return None;
    }

    let key_end = utf16_len(raw.trim_end());
    Some(TopLevelKey {
        name,
        range: Range::new(Position::new(number, 0), Position::new(number, key_end)),
        line_range: Range::new(
            Position::new(number, 0),
            Position::new(number, utf16_len(line)),
        ),
    })
}

/// Splits `key: value` at the mapping colon, honoring a quoted key.
fn split_key(line: &str) -> Option<(&str, &str)> {
    let search_from = match line.chars().next() {
        Some(quote @ ('"' | '\'')) => line[1..].find(quote)? + 2,
        _ => 0,
    };
    let colon = search_from + line[search_from..].find(':')?;
    Some((&line[..colon], &line[colon + 1..]))
}
