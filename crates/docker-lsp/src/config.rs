use dashmap::DashMap;
use docker_lsp_dockerfile::ExternalLinterSettings;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_lsp_server::ls_types::Uri;

/// Settings section requested from the client.
pub const CONFIG_SECTION: &str = "docker-lsp";

/// Root configuration for the docker-lsp server.
///
/// Provided by the LSP client via initialization options or workspace
/// settings. All fields use sensible defaults if not specified.
///
/// # Examples
///
/// ```
/// use docker_lsp::config::ServerConfig;
///
/// let json = r#"{
///     "diagnostics": { "disabled_collectors": ["compose-lint"] },
///     "external_linter": { "enabled": true }
/// }"#;
///
/// let config: ServerConfig = serde_json::from_str(json).unwrap();
/// assert!(config.external_linter.enabled);
/// assert_eq!(config.client_request_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub external_linter: ExternalLinterConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default = "default_client_request_timeout_ms")]
    pub client_request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsConfig::default(),
            external_linter: ExternalLinterConfig::default(),
            telemetry: TelemetryConfig::default(),
            client_request_timeout_ms: default_client_request_timeout_ms(),
        }
    }
}

impl ServerConfig {
    /// Reads settings sent by the client.
    ///
    /// Accepts either the bare settings object or one nested under the
    /// `docker-lsp` section. Returns `None` for null or malformed values.
    pub fn from_settings(value: &Value) -> Option<Self> {
        let settings = value.get(CONFIG_SECTION).unwrap_or(value);
        if settings.is_null() {
            return None;
        }
        match Self::deserialize(settings) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring malformed configuration: {}", e);
                None
            }
        }
    }

    pub fn client_request_timeout(&self) -> Duration {
        Duration::from_millis(self.client_request_timeout_ms)
    }
}

/// Controls which diagnostics are computed and how they are merged.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `disabled_collectors`: none
/// - `disabled_rules`: none
/// - `overlap_suppression`: disabled
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Collector names that are skipped.
    #[serde(default)]
    pub disabled_collectors: Vec<String>,
    /// Build check codes the built-in Dockerfile collector does not report.
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    #[serde(default)]
    pub overlap_suppression: OverlapSuppressionConfig,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_collectors: Vec::new(),
            disabled_rules: Vec::new(),
            overlap_suppression: OverlapSuppressionConfig::default(),
        }
    }
}

impl DiagnosticsConfig {
    pub fn is_collector_enabled(&self, name: &str) -> bool {
        self.enabled && !self.disabled_collectors.iter().any(|c| c == name)
    }
}

/// Drops a diagnostic when a later collector reports the same problem.
///
/// Two codes are equivalent when they appear together in one of `pairs`,
/// in either order.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OverlapSuppressionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_equivalent_codes")]
    pub pairs: Vec<(String, String)>,
}

impl Default for OverlapSuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pairs: default_equivalent_codes(),
        }
    }
}

impl OverlapSuppressionConfig {
    pub fn are_equivalent(&self, a: &str, b: &str) -> bool {
        self.pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

/// Configuration for the external hadolint-compatible linter.
///
/// # Defaults
///
/// - `enabled`: `false`
/// - `program`: `"hadolint"`
/// - `args`: `["--no-fail", "--format", "json", "-"]`
/// - `timeout_ms`: `10000`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalLinterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_linter_program")]
    pub program: String,
    #[serde(default = "default_linter_args")]
    pub args: Vec<String>,
    #[serde(default = "default_linter_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExternalLinterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: default_linter_program(),
            args: default_linter_args(),
            timeout_ms: default_linter_timeout_ms(),
        }
    }
}

impl ExternalLinterConfig {
    pub fn settings(&self) -> ExternalLinterSettings {
        ExternalLinterSettings {
            program: self.program.clone(),
            args: self.args.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl TelemetryConfig {
    /// Flush period, never shorter than one second.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }
}

// Default value functions
const fn default_true() -> bool {
    true
}

const fn default_client_request_timeout_ms() -> u64 {
    5000
}

const fn default_flush_interval() -> u64 {
    60
}

const fn default_linter_timeout_ms() -> u64 {
    10_000
}

fn default_linter_program() -> String {
    ExternalLinterSettings::default().program
}

fn default_linter_args() -> Vec<String> {
    ExternalLinterSettings::default().args
}

fn default_equivalent_codes() -> Vec<(String, String)> {
    vec![
        ("MaintainerDeprecated".into(), "DL4000".into()),
        ("JSONArgsRecommended".into(), "DL3025".into()),
    ]
}

/// Active configuration: one global value plus per-workspace-folder
/// overrides pulled from the client.
///
/// Readers get an `Arc` and never hold the lock across collector work.
#[derive(Debug, Default)]
pub struct ConfigStore {
    global: RwLock<Arc<ServerConfig>>,
    folders: DashMap<Uri, Arc<ServerConfig>>,
}

impl ConfigStore {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            global: RwLock::new(Arc::new(config)),
            folders: DashMap::new(),
        }
    }

    pub async fn global(&self) -> Arc<ServerConfig> {
        Arc::clone(&*self.global.read().await)
    }

    pub async fn set_global(&self, config: ServerConfig) {
        *self.global.write().await = Arc::new(config);
    }

    pub fn set_folder(&self, folder: Uri, config: ServerConfig) {
        self.folders.insert(folder, Arc::new(config));
    }

    pub fn clear_folders(&self) {
        self.folders.clear();
    }

    /// Configuration in effect for documents inside `folder`.
    pub async fn effective(&self, folder: Option<&Uri>) -> Arc<ServerConfig> {
        if let Some(config) = folder.and_then(|folder| self.folders.get(folder)) {
            return Arc::clone(config.value());
        }
        self.global().await
    }
}
