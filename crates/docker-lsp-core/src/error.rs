use thiserror::Error;

/// Core error types for docker-lsp.
///
/// All errors provide structured error handling with source error tracking.
/// Errors raised on the diagnostics path are never surfaced to the client as
/// protocol errors; they are logged and recorded instead.
///
/// # Examples
///
/// ```
/// use docker_lsp_core::error::{DockerLspError, Result};
///
/// fn lookup(open: bool, uri: &str) -> Result<()> {
///     if !open {
///         return Err(DockerLspError::NotFound { uri: uri.into() });
///     }
///     Ok(())
/// }
///
/// assert!(lookup(false, "file:///Dockerfile").unwrap_err().is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum DockerLspError {
    #[error("document not found: {uri}")]
    NotFound { uri: String },

    #[error("collector {collector} failed: {message}")]
    CollectorFailed {
        collector: &'static str,
        message: String,
    },

    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: &'static str, message: String },

    #[error("{program} did not finish within {timeout_ms}ms")]
    ProcessTimeout { program: String, timeout_ms: u64 },

    #[error("client request {method} failed: {message}")]
    ClientRequest { method: &'static str, message: String },

    #[error("client did not answer {method} within {timeout_ms}ms")]
    ClientTimeout {
        method: &'static str,
        timeout_ms: u64,
    },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DockerLspError {
    /// Returns true for lookups against a document that is not open.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience type alias for `Result<T, DockerLspError>`.
///
/// This is the standard `Result` type used throughout the docker-lsp codebase.
pub type Result<T> = std::result::Result<T, DockerLspError>;
