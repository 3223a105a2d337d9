//! Collector backed by an external hadolint-compatible linter process.
//!
//! The document text is piped to the linter's stdin and its JSON report is
//! read from stdout. The process runs with the workspace root as working
//! directory so that linter configuration files in the project are honored.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use docker_lsp_core::{
    Collector, DockerLspError, DocumentSnapshot, LanguageId, Result, line_range, lint_diagnostic,
    with_source,
};

/// How to invoke the external linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLinterSettings {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for ExternalLinterSettings {
    fn default() -> Self {
        Self {
            program: "hadolint".into(),
            args: vec!["--no-fail".into(), "--format".into(), "json".into(), "-".into()],
            timeout: Duration::from_secs(10),
        }
    }
}

/// One entry of the linter's JSON report. Lines and columns are 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportEntry {
    pub code: String,
    pub level: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    pub message: String,
}

pub struct ExternalLinterCollector {
    settings: ExternalLinterSettings,
}

impl ExternalLinterCollector {
    pub const NAME: &'static str = "hadolint";

    pub fn new(settings: ExternalLinterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExternalLinterSettings {
        &self.settings
    }

    async fn run(&self, workspace_root: &Path, text: &str) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.settings.program);
        cmd.args(&self.settings.args);
        if workspace_root.is_dir() {
            cmd.current_dir(workspace_root);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        let input = text.as_bytes().to_vec();

        let execution = async move {
            if let Some(mut stdin) = stdin {
                // The linter may exit before reading everything.
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!("failed to write linter stdin: {}", e);
                }
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.settings.timeout, execution).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DockerLspError::ProcessTimeout {
                    program: self.settings.program.clone(),
                    timeout_ms: self.settings.timeout.as_millis() as u64,
                });
            }
        };

        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockerLspError::CollectorFailed {
                collector: Self::NAME,
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Collector for ExternalLinterCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports_language_identifier(&self, language_id: &str) -> bool {
        LanguageId::from_identifier(language_id) == Some(LanguageId::Dockerfile)
    }

    async fn collect_diagnostics(
        &self,
        source: &str,
        workspace_root: &Path,
        _document: &DocumentSnapshot,
        text: &str,
    ) -> Result<Vec<Diagnostic>> {
        let stdout = self.run(workspace_root, text).await?;
        let diagnostics = parse_report(&stdout, text)?;
        tracing::debug!(
            program = %self.settings.program,
            count = diagnostics.len(),
            "external linter finished"
        );
        Ok(with_source(diagnostics, source))
    }
}

/// Converts a JSON report into diagnostics.
///
/// An entry without a column covers its whole line. Empty output is an
/// empty report.
pub fn parse_report(stdout: &[u8], text: &str) -> Result<Vec<Diagnostic>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }
    let entries: Vec<ReportEntry> = serde_json::from_slice(stdout)?;
    Ok(entries
        .into_iter()
        .map(|entry| entry_diagnostic(&entry, text))
        .collect())
}

fn entry_diagnostic(entry: &ReportEntry, text: &str) -> Diagnostic {
    let line = entry.line.saturating_sub(1);
    let whole_line = line_range(text, line);
    let range = if entry.column > 1 {
        let start = (entry.column - 1).min(whole_line.end.character);
        Range::new(Position::new(line, start), whole_line.end)
    } else {
        whole_line
    };

    let url = rule_url(&entry.code);
    lint_diagnostic(
        range,
        severity(&entry.level),
        Some(&entry.code),
        entry.message.clone(),
        url.as_deref(),
    )
}

fn severity(level: &str) -> DiagnosticSeverity {
    match level {
        "error" => DiagnosticSeverity::ERROR,
        "warning" => DiagnosticSeverity::WARNING,
        "info" => DiagnosticSeverity::INFORMATION,
        _ => DiagnosticSeverity::HINT,
    }
}

fn rule_url(code: &str) -> Option<String> {
    if code.starts_with("DL") {
        Some(format!("https://github.com/hadolint/hadolint/wiki/{}", code))
    } else if code.starts_with("SC") {
        Some(format!("https://www.shellcheck.net/wiki/{}", code))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docker_lsp_core::{DIAGNOSTIC_SOURCE, rule_code};

    const TEXT: &str = "FROM ubuntu\nMAINTAINER x\nRUN cd /tmp && make\n";

    #[test]
    fn test_parse_report() {
        let report = br#"[
            {"code":"DL4000","column":1,"file":"-","level":"error","line":2,"message":"MAINTAINER is deprecated"},
            {"code":"SC2164","column":5,"file":"-","level":"warning","line":3,"message":"Use 'cd ... || exit'"},
            {"code":"DL3006","column":1,"file":"-","level":"style","line":1,"message":"Always tag the version of an image explicitly"}
        ]"#;

        let diagnostics = parse_report(report, TEXT).unwrap();
        assert_eq!(diagnostics.len(), 3);

        let maintainer = &diagnostics[0];
        assert_eq!(rule_code(maintainer), Some("DL4000"));
        assert_eq!(maintainer.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(
            maintainer.range,
            Range::new(Position::new(1, 0), Position::new(1, 12))
        );
        assert_eq!(maintainer.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert_eq!(
            maintainer.code_description.as_ref().unwrap().href.as_str(),
            "https://github.com/hadolint/hadolint/wiki/DL4000"
        );

        let shellcheck = &diagnostics[1];
        assert_eq!(shellcheck.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(shellcheck.range.start, Position::new(2, 4));
        assert_eq!(
            shellcheck.code_description.as_ref().unwrap().href.as_str(),
            "https://www.shellcheck.net/wiki/SC2164"
        );

        assert_eq!(diagnostics[2].severity, Some(DiagnosticSeverity::HINT));
    }

    #[test]
    fn test_empty_report() {
        assert!(parse_report(b"", TEXT).unwrap().is_empty());
        assert!(parse_report(b"[]", TEXT).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_report_is_an_error() {
        let result = parse_report(b"not json", TEXT);
        assert!(matches!(result, Err(DockerLspError::Json(_))));
    }

    #[test]
    fn test_default_settings() {
        let settings = ExternalLinterSettings::default();
        assert_eq!(settings.program, "hadolint");
        assert_eq!(settings.args, vec!["--no-fail", "--format", "json", "-"]);
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use tempfile::TempDir;
        use tower_lsp_server::ls_types::Uri;

        fn snapshot() -> DocumentSnapshot {
            DocumentSnapshot::new(
                Uri::from_file_path("/project/Dockerfile").unwrap(),
                "dockerfile",
                1,
                0,
                TEXT,
            )
        }

        fn shell(script: &str, timeout: Duration) -> ExternalLinterCollector {
            ExternalLinterCollector::new(ExternalLinterSettings {
                program: "sh".into(),
                args: vec!["-c".into(), script.into()],
                timeout,
            })
        }

        #[tokio::test]
        async fn test_runs_process_and_parses_stdout() {
            let dir = TempDir::new().unwrap();
            let collector = shell(
                r#"cat > /dev/null; echo '[{"code":"DL4000","column":1,"level":"error","line":2,"message":"m"}]'"#,
                Duration::from_secs(5),
            );
            let document = snapshot();

            let diagnostics = collector
                .collect_diagnostics(DIAGNOSTIC_SOURCE, dir.path(), &document, TEXT)
                .await
                .unwrap();

            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].range.start.line, 1);
            assert_eq!(diagnostics[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        }

        #[tokio::test]
        async fn test_reads_document_from_stdin() {
            let dir = TempDir::new().unwrap();
            let collector = shell(
                r#"n=$(wc -l); echo "[{\"code\":\"X\",\"level\":\"info\",\"line\":$n,\"message\":\"lines\"}]""#,
                Duration::from_secs(5),
            );
            let document = snapshot();

            let diagnostics = collector
                .collect_diagnostics(DIAGNOSTIC_SOURCE, dir.path(), &document, TEXT)
                .await
                .unwrap();

            assert_eq!(diagnostics[0].range.start.line, 2);
        }

        #[tokio::test]
        async fn test_timeout_kills_process() {
            let dir = TempDir::new().unwrap();
            let collector = shell("sleep 5", Duration::from_millis(50));
            let document = snapshot();

            let result = collector
                .collect_diagnostics(DIAGNOSTIC_SOURCE, dir.path(), &document, TEXT)
                .await;

            assert!(matches!(result, Err(DockerLspError::ProcessTimeout { .. })));
        }

        #[tokio::test]
        async fn test_failing_process_without_output() {
            let dir = TempDir::new().unwrap();
            let collector = shell("echo boom >&2; exit 3", Duration::from_secs(5));
            let document = snapshot();

            let result = collector
                .collect_diagnostics(DIAGNOSTIC_SOURCE, dir.path(), &document, TEXT)
                .await;

            assert!(matches!(result, Err(DockerLspError::CollectorFailed { .. })));
        }

        #[tokio::test]
        async fn test_missing_program() {
            let collector = ExternalLinterCollector::new(ExternalLinterSettings {
                program: "definitely-not-a-linter-binary".into(),
                ..Default::default()
            });
            let document = snapshot();

            let result = collector
                .collect_diagnostics(DIAGNOSTIC_SOURCE, Path::new("/nonexistent"), &document, TEXT)
                .await;

            assert!(matches!(result, Err(DockerLspError::Io(_))));
        }
    }
}
