//! Instruction-level view of a Dockerfile.
//!
//! Handles the parts of the format that affect instruction boundaries:
//! the `escape` parser directive, line continuations, comment and blank
//! lines inside continuations, and here-documents.

use tower_lsp_server::ls_types::{Position, Range};

use crate::lsp_helpers::utf16_len;

/// Whitespace-separated word of an instruction with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub range: Range,
}

/// One instruction, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    keyword: Token,
    arguments: Vec<Token>,
    raw_arguments: String,
    range: Range,
}

impl Instruction {
    /// Keyword as written (`from`, `FROM`, `From`).
    pub fn keyword(&self) -> &str {
        &self.keyword.text
    }

    pub fn keyword_token(&self) -> &Token {
        &self.keyword
    }

    /// Case-insensitive keyword comparison.
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.text.eq_ignore_ascii_case(keyword)
    }

    /// Argument tokens outside here-document bodies.
    pub fn arguments(&self) -> &[Token] {
        &self.arguments
    }

    /// Argument text with continuations joined, trimmed.
    pub fn raw_arguments(&self) -> &str {
        &self.raw_arguments
    }

    /// Range from the keyword to the end of the last line of the instruction.
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn is_multiline(&self) -> bool {
        self.range.start.line != self.range.end.line
    }

    /// Arguments that are not `--flag` options.
    pub fn positional_arguments(&self) -> impl Iterator<Item = &Token> {
        self.arguments
            .iter()
            .filter(|token| !token.text.starts_with("--"))
    }
}

/// Parsed instruction list plus the escape character in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileView {
    instructions: Vec<Instruction>,
    escape: char,
}

impl DockerfileView {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn escape(&self) -> char {
        self.escape
    }

    /// True when the file contains no instruction (blank or comments only).
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction whose line span contains `position`.
    pub fn instruction_at(&self, position: Position) -> Option<&Instruction> {
        self.instructions.iter().find(|instruction| {
            let range = instruction.range();
            range.start.line <= position.line && position.line <= range.end.line
        })
    }
}

/// Parses Dockerfile text into instructions.
///
/// Never fails: text that is not a valid Dockerfile still yields whatever
/// instructions can be delimited, and lint rules report the problems.
pub fn parse(text: &str) -> DockerfileView {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let escape = escape_directive(&lines);

    let mut instructions = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        if is_blank_or_comment(lines[index]) {
            index += 1;
            continue;
        }
        let (instruction, last_line) = parse_instruction(&lines, index, escape);
        instructions.push(instruction);
        index = last_line + 1;
    }

    DockerfileView {
        instructions,
        escape,
    }
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Reads the `# escape=` parser directive from the leading comment block.
fn escape_directive(lines: &[&str]) -> char {
    for line in lines {
        let Some(comment) = line.trim().strip_prefix('#') else {
            break;
        };
        let Some((key, value)) = comment.split_once('=') else {
            break;
        };
        if key.trim().eq_ignore_ascii_case("escape") {
            return match value.trim() {
                "`" => '`',
                _ => '\\',
            };
        }
    }
    '\\'
}

/// Splits a line at a trailing escape character.
///
/// Returns the byte length of the content before the escape and whether the
/// instruction continues on a following line.
fn continuation(line: &str, escape: char) -> (usize, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix(escape) {
        Some(content) => (content.len(), true),
        None => (trimmed.len(), false),
    }
}

/// Whitespace-separated tokens of `line[from..to]` with UTF-16 columns.
fn tokenize(line: &str, line_number: u32, from: usize, to: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut column = utf16_len(&line[..from]);
    let mut current: Option<(String, u32)> = None;

    for c in line[from..to].chars() {
        if c.is_whitespace() {
            if let Some((text, start)) = current.take() {
                tokens.push(token(text, line_number, start, column));
            }
        } else {
            current.get_or_insert_with(|| (String::new(), column)).0.push(c);
        }
        column += c.len_utf16() as u32;
    }
    if let Some((text, start)) = current {
        tokens.push(token(text, line_number, start, column));
    }
    tokens
}

fn token(text: String, line: u32, start: u32, end: u32) -> Token {
    Token {
        text,
        range: Range::new(Position::new(line, start), Position::new(line, end)),
    }
}

/// Here-document terminators opened by the tokens, in order.
///
/// Returns `(word, strip_leading_tabs)` pairs.
fn heredoc_markers(tokens: &[Token]) -> Vec<(String, bool)> {
    tokens
        .iter()
        .filter_map(|token| {
            let marker = token.text.strip_prefix("<<")?;
            let (marker, strip_tabs) = match marker.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (marker, false),
            };
            let word = marker.trim_matches(|c| c == '"' || c == '\'');
            let valid = !word.is_empty()
                && word
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            valid.then(|| (word.to_string(), strip_tabs))
        })
        .collect()
}

fn parse_instruction(lines: &[&str], first: usize, escape: char) -> (Instruction, usize) {
    let line = lines[first];
    let line_number = first as u32;
    let keyword_start = line.len() - line.trim_start().len();
    let keyword_end = line[keyword_start..]
        .find(char::is_whitespace)
        .map_or(line.len(), |offset| keyword_start + offset);

    let (content_end, mut continued) = continuation(line, escape);
    let keyword_end = keyword_end.min(content_end.max(keyword_start));
    let keyword_text = line[keyword_start..keyword_end].to_string();
    let start = Position::new(line_number, utf16_len(&line[..keyword_start]));
    let keyword = Token {
        range: Range::new(
            start,
            Position::new(line_number, utf16_len(&line[..keyword_end])),
        ),
        text: keyword_text,
    };

    let mut arguments = tokenize(line, line_number, keyword_end, content_end);
    let mut raw_arguments = line[keyword_end..content_end].to_string();
    let mut last = first;

    let mut index = first + 1;
    while continued && index < lines.len() {
        let line = lines[index];
        if is_blank_or_comment(line) {
            index += 1;
            continue;
        }
        let (content_end, next) = continuation(line, escape);
        arguments.extend(tokenize(line, index as u32, 0, content_end));
        raw_arguments.push_str(&line[..content_end]);
        last = index;
        continued = next;
        index += 1;
    }

    let is_heredoc_capable = ["RUN", "COPY", "ADD"]
        .iter()
        .any(|k| keyword.text.eq_ignore_ascii_case(k));
    if is_heredoc_capable {
        for (word, strip_tabs) in heredoc_markers(&arguments) {
            let mut index = last + 1;
            while index < lines.len() {
                let candidate = if strip_tabs {
                    lines[index].trim_start_matches('\t')
                } else {
                    lines[index]
                };
                last = index;
                if candidate == word {
                    break;
                }
                index += 1;
            }
        }
    }

    let end = Position::new(last as u32, utf16_len(lines[last]));
    let instruction = Instruction {
        keyword,
        arguments,
        raw_arguments: raw_arguments.trim().to_string(),
        range: Range::new(start, end),
    };
    (instruction, last)
}
