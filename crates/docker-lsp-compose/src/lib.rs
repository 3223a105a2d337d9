//! Compose manifest analysis for docker-lsp.
//!
//! Checks the top-level structure of `compose.yaml` files: obsolete
//! `version` attributes, unknown properties and duplicated keys.

pub mod collector;
pub mod rules;

pub use collector::ComposeCollector;
pub use rules::{ALLOWED_TOP_LEVEL_KEYS, OBSOLETE_VERSION_MESSAGE};
