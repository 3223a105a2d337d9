//! Server-initiated client requests.
//!
//! Dynamic capability registration and the workspace configuration pull.
//! Every round-trip is bounded by the configured client request timeout so
//! an unresponsive client cannot stall the task waiting on it.

use std::future::Future;
use std::time::Duration;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{ConfigurationItem, Registration, Uri, WorkspaceFolder};

use docker_lsp_core::{DockerLspError, Result};

use crate::config::{CONFIG_SECTION, ServerConfig};

const REGISTER_CAPABILITY: &str = "client/registerCapability";
const WORKSPACE_CONFIGURATION: &str = "workspace/configuration";

/// Registration id of the configuration change watcher.
pub const CONFIGURATION_REGISTRATION_ID: &str = "docker-lsp-configuration";

/// Settings returned by a configuration pull.
#[derive(Debug, Default, PartialEq)]
pub struct PulledConfiguration {
    /// Workspace-wide settings; `None` when the client has none.
    pub global: Option<ServerConfig>,
    pub folders: Vec<(Uri, ServerConfig)>,
}

async fn bounded<T, F>(method: &'static str, timeout: Duration, request: F) -> Result<T>
where
    F: Future<Output = tower_lsp_server::jsonrpc::Result<T>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DockerLspError::ClientRequest {
            method,
            message: e.to_string(),
        }),
        Err(_) => Err(DockerLspError::ClientTimeout {
            method,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Asks the client to send `workspace/didChangeConfiguration` for our section.
///
/// # Errors
///
/// Returns an error if the client rejects the registration or does not
/// answer within `timeout`.
pub async fn register_configuration_watcher(client: &Client, timeout: Duration) -> Result<()> {
    let registration = Registration {
        id: CONFIGURATION_REGISTRATION_ID.to_string(),
        method: "workspace/didChangeConfiguration".to_string(),
        register_options: Some(serde_json::json!({ "section": CONFIG_SECTION })),
    };

    bounded(
        REGISTER_CAPABILITY,
        timeout,
        client.register_capability(vec![registration]),
    )
    .await?;

    tracing::info!("registered configuration change watcher");
    Ok(())
}

/// Requests the `docker-lsp` section globally and for each workspace folder.
pub async fn pull_configuration(
    client: &Client,
    folders: &[WorkspaceFolder],
    timeout: Duration,
) -> Result<PulledConfiguration> {
    let items = configuration_items(folders);
    let values = bounded(WORKSPACE_CONFIGURATION, timeout, client.configuration(items)).await?;
    Ok(interpret(folders, &values))
}

fn configuration_items(folders: &[WorkspaceFolder]) -> Vec<ConfigurationItem> {
    std::iter::once(None)
        .chain(folders.iter().map(|folder| Some(folder.uri.clone())))
        .map(|scope_uri| ConfigurationItem {
            scope_uri,
            section: Some(CONFIG_SECTION.into()),
        })
        .collect()
}

/// Pairs the response values with the requested scopes.
///
/// Clients answer in request order; missing or null entries are skipped.
fn interpret(folders: &[WorkspaceFolder], values: &[serde_json::Value]) -> PulledConfiguration {
    let mut values = values.iter();
    let global = values.next().and_then(ServerConfig::from_settings);
    let folders = folders
        .iter()
        .zip(values)
        .filter_map(|(folder, value)| {
            ServerConfig::from_settings(value).map(|config| (folder.uri.clone(), config))
        })
        .collect();

    PulledConfiguration { global, folders }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn folder(path: &str) -> WorkspaceFolder {
        WorkspaceFolder {
            uri: Uri::from_file_path(path).unwrap(),
            name: "folder".into(),
        }
    }

    #[test]
    fn test_configuration_items_global_first() {
        let items = configuration_items(&[folder("/a"), folder("/b")]);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].scope_uri, None);
        assert_eq!(items[1].scope_uri, Some(Uri::from_file_path("/a").unwrap()));
        assert!(
            items
                .iter()
                .all(|item| item.section.as_deref() == Some("docker-lsp"))
        );
    }

    #[test]
    fn test_interpret_response() {
        let folders = [folder("/a"), folder("/b")];
        let values = [
            json!({ "external_linter": { "enabled": true } }),
            json!(null),
            json!({ "diagnostics": { "enabled": false } }),
        ];

        let pulled = interpret(&folders, &values);

        assert!(pulled.global.unwrap().external_linter.enabled);
        assert_eq!(pulled.folders.len(), 1);
        assert_eq!(pulled.folders[0].0, Uri::from_file_path("/b").unwrap());
        assert!(!pulled.folders[0].1.diagnostics.enabled);
    }

    #[test]
    fn test_interpret_short_response() {
        let pulled = interpret(&[folder("/a")], &[]);
        assert_eq!(pulled, PulledConfiguration::default());
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded(
            WORKSPACE_CONFIGURATION,
            Duration::from_millis(5),
            std::future::pending(),
        )
        .await;

        assert!(matches!(
            result,
            Err(DockerLspError::ClientTimeout {
                method: "workspace/configuration",
                timeout_ms: 5
            })
        ));
    }

    #[tokio::test]
    async fn test_bounded_maps_client_errors() {
        let result: Result<()> = bounded(REGISTER_CAPABILITY, Duration::from_secs(1), async {
            Err(tower_lsp_server::jsonrpc::Error::method_not_found())
        })
        .await;

        assert!(matches!(result, Err(DockerLspError::ClientRequest { .. })));
    }
}
