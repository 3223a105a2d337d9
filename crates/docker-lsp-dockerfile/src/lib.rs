//! Dockerfile analysis for docker-lsp.
//!
//! Two collectors report diagnostics for build files:
//!
//! - [`DockerfileCollector`] evaluates BuildKit-style build checks in-process
//! - [`ExternalLinterCollector`] runs a hadolint-compatible linter and maps
//!   its JSON report to diagnostics
//!
//! # Examples
//!
//! ```
//! use docker_lsp_core::syntax::dockerfile::parse;
//! use docker_lsp_dockerfile::rules::lint;
//!
//! let diagnostics = lint(&parse("FROM scratch\nMAINTAINER x"), &[]);
//! assert_eq!(diagnostics.len(), 1);
//! ```

pub mod collector;
pub mod external;
pub mod rules;

pub use collector::DockerfileCollector;
pub use external::{ExternalLinterCollector, ExternalLinterSettings, parse_report};
pub use rules::{EMPTY_FILE_MESSAGE, NO_BUILD_STAGE_MESSAGE, Rule};
