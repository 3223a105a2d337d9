//! Language server for Dockerfiles, Compose manifests and Bake files.
//!
//! Documents live in a versioned [`document::DocumentStore`]. Every open or
//! accepted change queues a diagnostics run on the document's own queue
//! ([`queue::DocumentQueues`]); the [`diagnostics::DiagnosticsPipeline`] runs
//! every registered collector and publishes the merged result only if the
//! document is still at the version it started from.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod handlers;
pub mod notifier;
pub mod queue;
pub mod registration;
pub mod server;
pub mod state;
pub mod supervisor;
pub mod telemetry;
pub mod workspace;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use docker_lsp_compose::ComposeCollector;
use docker_lsp_core::CollectorRegistry;
use docker_lsp_dockerfile::{DockerfileCollector, ExternalLinterCollector};

use config::ServerConfig;

// Re-export commonly used types
pub use server::Backend;
pub use state::ServerState;

/// Registers the built-in collectors according to `config`.
///
/// Registration order is merge order: the Dockerfile rules run before the
/// external linter so that overlap suppression prefers the linter's output.
pub fn register_collectors(registry: &CollectorRegistry, config: &ServerConfig) {
    registry.register(Arc::new(DockerfileCollector::with_disabled_rules(
        config.diagnostics.disabled_rules.iter().map(String::as_str),
    )));
    registry.register(Arc::new(ComposeCollector::new()));

    if config.external_linter.enabled {
        registry.register(Arc::new(ExternalLinterCollector::new(
            config.external_linter.settings(),
        )));
    } else if registry.unregister(ExternalLinterCollector::NAME) {
        tracing::info!("external linter disabled");
    }
}
