//! LSP protocol handlers.
//!
//! - [`code_actions`]: turns quick fixes carried by diagnostics into edits
//!
//! Diagnostics are pushed by [`crate::diagnostics::DiagnosticsPipeline`]
//! rather than answered on request.

pub mod code_actions;
