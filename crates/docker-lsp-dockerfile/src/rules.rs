//! Build-check rules evaluated over a parsed Dockerfile.
//!
//! Rule names and documentation links follow the BuildKit build checks so
//! that editors can link each warning to its upstream description.

use std::collections::HashMap;

use docker_lsp_core::{
    DockerfileView, Instruction, QuickFix, Token, lint_diagnostic, with_quick_fixes, with_tag,
};
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, DiagnosticTag, Range};

pub const EMPTY_FILE_MESSAGE: &str = "Dockerfile cannot be empty";
pub const NO_BUILD_STAGE_MESSAGE: &str = "no build stage in current context";

const KNOWN_INSTRUCTIONS: &[&str] = &[
    "ADD",
    "ARG",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "ENV",
    "EXPOSE",
    "FROM",
    "HEALTHCHECK",
    "LABEL",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "VOLUME",
    "WORKDIR",
];

/// Build check identifiers reported as diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    MaintainerDeprecated,
    StageNameCasing,
    FromAsCasing,
    JsonArgsRecommended,
    MultipleInstructionsDisallowed,
    LegacyKeyValueFormat,
}

impl Rule {
    pub const ALL: [Self; 6] = [
        Self::MaintainerDeprecated,
        Self::StageNameCasing,
        Self::FromAsCasing,
        Self::JsonArgsRecommended,
        Self::MultipleInstructionsDisallowed,
        Self::LegacyKeyValueFormat,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::MaintainerDeprecated => "MaintainerDeprecated",
            Self::StageNameCasing => "StageNameCasing",
            Self::FromAsCasing => "FromAsCasing",
            Self::JsonArgsRecommended => "JSONArgsRecommended",
            Self::MultipleInstructionsDisallowed => "MultipleInstructionsDisallowed",
            Self::LegacyKeyValueFormat => "LegacyKeyValueFormat",
        }
    }

    const fn slug(self) -> &'static str {
        match self {
            Self::MaintainerDeprecated => "maintainer-deprecated",
            Self::StageNameCasing => "stage-name-casing",
            Self::FromAsCasing => "from-as-casing",
            Self::JsonArgsRecommended => "json-args-recommended",
            Self::MultipleInstructionsDisallowed => "multiple-instructions-disallowed",
            Self::LegacyKeyValueFormat => "legacy-key-value-format",
        }
    }

    pub fn url(self) -> String {
        format!("https://docs.docker.com/go/dockerfile/rule/{}/", self.slug())
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.code() == code)
    }

    fn diagnostic(self, range: Range, message: impl Into<String>) -> Diagnostic {
        let url = self.url();
        lint_diagnostic(
            range,
            DiagnosticSeverity::WARNING,
            Some(self.code()),
            message,
            Some(&url),
        )
    }
}

/// Runs every rule not listed in `disabled` and returns diagnostics in
/// document order.
///
/// A file without instructions yields exactly one error and no other rule
/// runs.
pub fn lint(view: &DockerfileView, disabled: &[Rule]) -> Vec<Diagnostic> {
    if view.is_empty() {
        return vec![lint_diagnostic(
            Range::default(),
            DiagnosticSeverity::ERROR,
            None,
            EMPTY_FILE_MESSAGE,
            None,
        )];
    }

    let enabled = |rule: Rule| !disabled.contains(&rule);
    let mut diagnostics = Vec::new();
    let mut seen_from = false;
    let mut reported_no_stage = false;
    let mut stage = StageInstructions::default();

    for instruction in view.instructions() {
        let keyword = instruction.keyword().to_ascii_uppercase();

        if !KNOWN_INSTRUCTIONS.contains(&keyword.as_str()) {
            diagnostics.push(lint_diagnostic(
                instruction.keyword_token().range,
                DiagnosticSeverity::ERROR,
                None,
                format!("unknown instruction: {}", instruction.keyword()),
                None,
            ));
            continue;
        }

        if keyword == "FROM" {
            seen_from = true;
            diagnostics.extend(stage.finish(enabled(Rule::MultipleInstructionsDisallowed)));
            if enabled(Rule::StageNameCasing) {
                diagnostics.extend(stage_name_casing(instruction));
            }
            if enabled(Rule::FromAsCasing) {
                diagnostics.extend(from_as_casing(instruction));
            }
            continue;
        }

        if !seen_from && keyword != "ARG" && !reported_no_stage {
            reported_no_stage = true;
            diagnostics.push(lint_diagnostic(
                instruction.range(),
                DiagnosticSeverity::ERROR,
                None,
                NO_BUILD_STAGE_MESSAGE,
                None,
            ));
        }

        match keyword.as_str() {
            "MAINTAINER" if enabled(Rule::MaintainerDeprecated) => {
                diagnostics.push(maintainer_deprecated(instruction));
            }
            "CMD" | "ENTRYPOINT" => {
                if enabled(Rule::JsonArgsRecommended) {
                    diagnostics.extend(json_args_recommended(instruction, &keyword));
                }
                stage.record(&keyword, instruction);
            }
            "HEALTHCHECK" => stage.record(&keyword, instruction),
            "ENV" | "LABEL" if enabled(Rule::LegacyKeyValueFormat) => {
                diagnostics.extend(legacy_key_value_format(instruction, &keyword));
            }
            _ => {}
        }
    }
    diagnostics.extend(stage.finish(enabled(Rule::MultipleInstructionsDisallowed)));

    diagnostics.sort_by_key(|diagnostic| diagnostic.range.start);
    diagnostics
}

fn maintainer_deprecated(instruction: &Instruction) -> Diagnostic {
    let author = instruction.raw_arguments().replace('"', "\\\"");
    let fix = QuickFix::new(
        "Convert MAINTAINER to a org.opencontainers.image.authors LABEL",
        format!("LABEL org.opencontainers.image.authors=\"{}\"", author),
    );
    let diagnostic = Rule::MaintainerDeprecated.diagnostic(
        instruction.range(),
        "Maintainer instruction is deprecated in favor of using label",
    );
    with_quick_fixes(with_tag(diagnostic, DiagnosticTag::DEPRECATED), vec![fix])
}

/// Returns the `AS name` tokens of a FROM instruction.
fn stage_alias(instruction: &Instruction) -> Option<(&Token, &Token)> {
    let positional: Vec<_> = instruction.positional_arguments().collect();
    match positional.as_slice() {
        [_, keyword, name, ..] if keyword.text.eq_ignore_ascii_case("as") => {
            Some((*keyword, *name))
        }
        _ => None,
    }
}

fn stage_name_casing(instruction: &Instruction) -> Option<Diagnostic> {
    let (_, name) = stage_alias(instruction)?;
    if name.text.chars().all(|c| !c.is_uppercase()) {
        return None;
    }
    let lowercase = name.text.to_lowercase();
    let diagnostic = Rule::StageNameCasing.diagnostic(
        name.range,
        format!("Stage name '{}' should be lowercase", name.text),
    );
    Some(with_quick_fixes(
        diagnostic,
        vec![QuickFix::new(format!("Rename stage to '{}'", lowercase), lowercase)],
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Casing {
    Upper,
    Lower,
    Mixed,
}

fn casing(word: &str) -> Casing {
    if word.chars().all(|c| !c.is_lowercase()) {
        Casing::Upper
    } else if word.chars().all(|c| !c.is_uppercase()) {
        Casing::Lower
    } else {
        Casing::Mixed
    }
}

fn from_as_casing(instruction: &Instruction) -> Option<Diagnostic> {
    let (as_keyword, _) = stage_alias(instruction)?;
    let mismatch = matches!(
        (casing(instruction.keyword()), casing(&as_keyword.text)),
        (Casing::Upper, Casing::Lower) | (Casing::Lower, Casing::Upper)
    );
    if !mismatch {
        return None;
    }
    let message = format!(
        "'{}' and '{}' keywords' casing do not match",
        as_keyword.text,
        instruction.keyword()
    );
    let replacement = match casing(instruction.keyword()) {
        Casing::Upper => "AS",
        _ => "as",
    };
    let fix = QuickFix::with_range(
        format!("Change '{}' to '{}'", as_keyword.text, replacement),
        replacement,
        as_keyword.range,
    );
    Some(with_quick_fixes(
        Rule::FromAsCasing.diagnostic(instruction.range(), message),
        vec![fix],
    ))
}

fn json_args_recommended(instruction: &Instruction, keyword: &str) -> Option<Diagnostic> {
    let arguments = instruction.raw_arguments();
    if arguments.is_empty() || arguments.starts_with('[') {
        return None;
    }
    let message = format!(
        "JSON arguments recommended for {} to prevent unintended behavior related to OS signals",
        keyword
    );
    let diagnostic = Rule::JsonArgsRecommended.diagnostic(instruction.range(), message);
    if instruction.is_multiline() {
        return Some(diagnostic);
    }
    let words: Vec<String> = instruction
        .arguments()
        .iter()
        .map(|token| serde_json::Value::String(token.text.clone()).to_string())
        .collect();
    let fix = QuickFix::new(
        format!("Convert {} to JSON arguments", keyword),
        format!("{} [{}]", instruction.keyword(), words.join(", ")),
    );
    Some(with_quick_fixes(diagnostic, vec![fix]))
}

fn legacy_key_value_format(instruction: &Instruction, keyword: &str) -> Option<Diagnostic> {
    let key = instruction.arguments().first()?;
    if key.text.contains('=') {
        return None;
    }
    let message = format!(
        "\"{keyword} key=value\" should be used instead of legacy \"{keyword} key value\" format"
    );
    let diagnostic = Rule::LegacyKeyValueFormat.diagnostic(instruction.range(), message);
    if instruction.is_multiline() {
        return Some(diagnostic);
    }

    let value = instruction.raw_arguments()[key.text.len()..].trim();
    let quoted = if value.is_empty() || value.contains(char::is_whitespace) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    };
    let fix = QuickFix::new(
        format!("Convert to {}={}", key.text, quoted),
        format!("{} {}={}", instruction.keyword(), key.text, quoted),
    );
    Some(with_quick_fixes(diagnostic, vec![fix]))
}

/// Tracks CMD, ENTRYPOINT and HEALTHCHECK occurrences within one stage.
#[derive(Default)]
struct StageInstructions {
    seen: HashMap<String, Vec<Range>>,
}

impl StageInstructions {
    fn record(&mut self, keyword: &str, instruction: &Instruction) {
        self.seen
            .entry(keyword.to_string())
            .or_default()
            .push(instruction.range());
    }

    /// Flags every occurrence except the last and resets for the next stage.
    fn finish(&mut self, enabled: bool) -> Vec<Diagnostic> {
        let seen = std::mem::take(&mut self.seen);
        if !enabled {
            return vec![];
        }
        let mut diagnostics = Vec::new();
        for (keyword, ranges) in seen {
            let Some((_, earlier)) = ranges.split_last() else {
                continue;
            };
            for range in earlier {
                let diagnostic = Rule::MultipleInstructionsDisallowed.diagnostic(
                    *range,
                    format!(
                        "Multiple {} instructions should not be used in the same stage because only the last one will be used",
                        keyword
                    ),
                );
                diagnostics.push(with_tag(diagnostic, DiagnosticTag::UNNECESSARY));
            }
        }
        diagnostics
    }
}
