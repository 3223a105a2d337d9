use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower_lsp_server::ls_types::{
    CodeActionKind, CodeActionOptions, CodeActionOrCommand, CodeActionParams,
    CodeActionProviderCapability, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, InitializeParams, InitializeResult,
    InitializedParams, MessageType, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, WorkspaceFolder,
};
use tower_lsp_server::{Client, LanguageServer, jsonrpc::Result};

use crate::config::ServerConfig;
use crate::document::{handle_document_change, handle_document_close, handle_document_open};
use crate::handlers::code_actions;
use crate::registration;
use crate::state::ServerState;
use crate::supervisor::spawn_supervised;

pub struct Backend {
    pub(crate) client: Client,
    state: Arc<ServerState>,
    /// Client accepts dynamic registration of `workspace/didChangeConfiguration`.
    dynamic_configuration: AtomicBool,
    /// Client answers `workspace/configuration`.
    configuration_pull: AtomicBool,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let state = Arc::new(ServerState::new(Arc::new(client.clone())));
        Self {
            client,
            state,
            dynamic_configuration: AtomicBool::new(false),
            configuration_pull: AtomicBool::new(false),
        }
    }

    /// Get a reference to the LSP client (primarily for testing/benchmarking).
    #[doc(hidden)]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a reference to the server state (primarily for testing/benchmarking).
    #[doc(hidden)]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
                code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    async fn request_timeout(&self) -> Duration {
        self.state.config.global().await.client_request_timeout()
    }

    /// Pulls configuration in the background; the handler does not wait.
    fn spawn_configuration_pull(&self, timeout: Duration) {
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let handle = spawn_supervised(
            "pull-configuration",
            Arc::clone(&self.state.recorder),
            refresh_configuration(client, state, timeout),
        );
        self.state.track_background(handle);
    }
}

/// Replaces the active configuration with the one the client reports.
async fn refresh_configuration(
    client: Client,
    state: Arc<ServerState>,
    timeout: Duration,
) -> docker_lsp_core::Result<()> {
    let folders = state.workspace.folders();
    let pulled = registration::pull_configuration(&client, &folders, timeout).await?;

    state.config.clear_folders();
    for (folder, config) in pulled.folders {
        state.config.set_folder(folder, config);
    }
    let global = match pulled.global {
        Some(config) => config,
        None => ServerConfig::clone(&*state.config.global().await),
    };
    let rescheduled = state.apply_config(global).await;
    tracing::info!(
        "configuration refreshed, {} document(s) rescheduled",
        rescheduled
    );
    Ok(())
}

/// Flushes the analysis recorder periodically until aborted.
async fn flush_telemetry(state: Arc<ServerState>) -> docker_lsp_core::Result<()> {
    loop {
        let interval = state.config.global().await.telemetry.flush_interval();
        tokio::time::sleep(interval).await;
        state.recorder.flush();
    }
}

#[allow(deprecated)]
fn workspace_folders(params: &InitializeParams) -> Vec<WorkspaceFolder> {
    if let Some(folders) = &params.workspace_folders
        && !folders.is_empty()
    {
        return folders.clone();
    }
    params
        .root_uri
        .iter()
        .map(|uri| WorkspaceFolder {
            uri: uri.clone(),
            name: "root".into(),
        })
        .collect()
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("initializing docker-lsp server");

        // Parse initialization options
        let config = params
            .initialization_options
            .as_ref()
            .and_then(ServerConfig::from_settings)
            .unwrap_or_default();
        tracing::debug!("loaded configuration: {:?}", config);
        self.state.apply_config(config).await;

        self.state.workspace.set(workspace_folders(&params));

        if let Some(workspace) = &params.capabilities.workspace {
            let dynamic = workspace
                .did_change_configuration
                .as_ref()
                .and_then(|capability| capability.dynamic_registration)
                .unwrap_or(false);
            self.dynamic_configuration.store(dynamic, Ordering::Relaxed);
            self.configuration_pull
                .store(workspace.configuration.unwrap_or(false), Ordering::Relaxed);
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "docker-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("docker-lsp server initialized");
        self.client
            .log_message(MessageType::INFO, "docker-lsp ready")
            .await;

        let timeout = self.request_timeout().await;
        let recorder = Arc::clone(&self.state.recorder);

        if self.dynamic_configuration.load(Ordering::Relaxed) {
            let client = self.client.clone();
            self.state.track_background(spawn_supervised(
                "register-configuration",
                Arc::clone(&recorder),
                async move { registration::register_configuration_watcher(&client, timeout).await },
            ));
        }

        if self.configuration_pull.load(Ordering::Relaxed) {
            self.spawn_configuration_pull(timeout);
        }

        self.state.track_background(spawn_supervised(
            "telemetry-flush",
            recorder,
            flush_telemetry(Arc::clone(&self.state)),
        ));
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down docker-lsp server");
        let aborted = self.state.abort_background();
        tracing::debug!("aborted {} background task(s)", aborted);
        self.state.recorder.flush();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        tracing::info!("document opened: {}", document.uri.as_str());

        handle_document_open(
            &self.state,
            document.uri,
            &document.language_id,
            document.version,
            document.text,
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the last change carries the whole document.
        let mut changes = params.content_changes;
        let Some(change) = changes.pop() else {
            return;
        };
        handle_document_change(&self.state, uri, version, change.text);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("document closed: {}", uri.as_str());

        handle_document_close(&self.state, uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match ServerConfig::from_settings(&params.settings) {
            Some(config) => {
                let rescheduled = self.state.apply_config(config).await;
                tracing::info!(
                    "configuration changed, {} document(s) rescheduled",
                    rescheduled
                );
            }
            None if self.configuration_pull.load(Ordering::Relaxed) => {
                let timeout = self.request_timeout().await;
                self.spawn_configuration_pull(timeout);
            }
            None => tracing::debug!("ignoring configuration change without settings"),
        }
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> Result<Option<Vec<CodeActionOrCommand>>> {
        tracing::debug!(
            "code_action request: uri={}, range={:?}",
            params.text_document.uri.as_str(),
            params.range
        );
        let actions = code_actions::handle_code_actions(&self.state, params);
        tracing::debug!("code_action response: {} actions", actions.len());
        Ok(Some(actions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_lsp_server::ls_types::Uri;

    #[test]
    fn test_server_capabilities() {
        let caps = Backend::server_capabilities();

        match caps.text_document_sync {
            Some(TextDocumentSyncCapability::Kind(kind)) => {
                assert_eq!(kind, TextDocumentSyncKind::FULL);
            }
            _ => panic!("Expected text document sync kind to be FULL"),
        }

        match caps.code_action_provider {
            Some(CodeActionProviderCapability::Options(options)) => {
                assert_eq!(
                    options.code_action_kinds,
                    Some(vec![CodeActionKind::QUICKFIX])
                );
            }
            _ => panic!("Expected code action options"),
        }
        assert!(caps.hover_provider.is_none());
        assert!(caps.completion_provider.is_none());
    }

    #[tokio::test]
    async fn test_backend_creation() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        assert!(service.inner().state().store.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_applies_options_and_folders() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();
        let folder = Uri::from_file_path("/work").unwrap();

        let params = InitializeParams {
            initialization_options: Some(json!({
                "docker-lsp": { "external_linter": { "enabled": true } }
            })),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: folder.clone(),
                name: "work".into(),
            }]),
            ..Default::default()
        };
        let result = backend.initialize(params).await.unwrap();

        assert_eq!(result.server_info.unwrap().name, "docker-lsp");
        assert!(backend.state().registry.get("hadolint").is_some());
        assert_eq!(backend.state().workspace.folders()[0].uri, folder);
        assert!(!backend.configuration_pull.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_initialize_without_options() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();

        backend
            .initialize(InitializeParams::default())
            .await
            .unwrap();

        assert_eq!(
            *backend.state().config.global().await,
            ServerConfig::default()
        );
        assert!(backend.state().workspace.folders().is_empty());
    }

    #[test]
    #[allow(deprecated)]
    fn test_root_uri_fallback() {
        let root = Uri::from_file_path("/legacy").unwrap();
        let params = InitializeParams {
            root_uri: Some(root.clone()),
            ..Default::default()
        };

        let folders = workspace_folders(&params);
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].uri, root);
    }
}
