//! Immutable document snapshots shared between the store and collectors.

use std::sync::Arc;
use tower_lsp_server::ls_types::Uri;

use crate::syntax::compose::{self, ComposeOutline};
use crate::syntax::dockerfile::{self, DockerfileView};

/// Docker-ecosystem language a document is declared as.
///
/// # Examples
///
/// ```
/// use docker_lsp_core::LanguageId;
///
/// assert_eq!(LanguageId::from_identifier("dockerfile"), Some(LanguageId::Dockerfile));
/// assert_eq!(LanguageId::from_identifier("dockercompose"), Some(LanguageId::Compose));
/// assert_eq!(LanguageId::from_identifier("rust"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LanguageId {
    /// Build files (`Dockerfile`, `*.dockerfile`)
    Dockerfile,
    /// Compose manifests (`compose.yaml`, `docker-compose.yml`)
    Compose,
    /// Multi-target build definitions (`docker-bake.hcl`)
    Bake,
}

impl LanguageId {
    /// Parses a client-declared language identifier.
    ///
    /// `build-file` is accepted as an alias for `dockerfile`.
    pub fn from_identifier(id: &str) -> Option<Self> {
        match id {
            "dockerfile" | "build-file" => Some(Self::Dockerfile),
            "dockercompose" => Some(Self::Compose),
            "dockerbake" => Some(Self::Bake),
            _ => None,
        }
    }

    /// Canonical identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dockerfile => "dockerfile",
            Self::Compose => "dockercompose",
            Self::Bake => "dockerbake",
        }
    }
}

/// Format-specific structured view of a document.
///
/// Established once per snapshot from the declared language identifier, so
/// consumers match on the variant instead of probing the document's type.
#[derive(Debug, Clone)]
pub enum DocumentKind {
    Dockerfile(DockerfileView),
    Compose(ComposeOutline),
    Bake,
    /// Language identifier the server has no analysis for.
    Plain,
}

impl DocumentKind {
    fn analyze(language: Option<LanguageId>, text: &str) -> Self {
        match language {
            Some(LanguageId::Dockerfile) => Self::Dockerfile(dockerfile::parse(text)),
            Some(LanguageId::Compose) => Self::Compose(compose::outline(text)),
            Some(LanguageId::Bake) => Self::Bake,
            None => Self::Plain,
        }
    }
}

/// Immutable content of one open document at one version.
///
/// A snapshot never changes after construction; an accepted edit produces a
/// new snapshot that replaces the old one in the store. Readers holding the
/// old `Arc` keep a consistent view.
///
/// `generation` identifies the open/close lifecycle the snapshot belongs to,
/// so a document closed and reopened at the same version is still
/// distinguishable from its previous incarnation.
///
/// # Examples
///
/// ```
/// use docker_lsp_core::DocumentSnapshot;
/// use tower_lsp_server::ls_types::Uri;
///
/// let uri: Uri = "file:///project/Dockerfile".parse().unwrap();
/// let snapshot = DocumentSnapshot::new(uri, "dockerfile", 1, 0, "FROM scratch");
///
/// assert_eq!(snapshot.version(), 1);
/// assert_eq!(snapshot.as_dockerfile().unwrap().instructions().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    uri: Uri,
    language_id: String,
    language: Option<LanguageId>,
    version: i32,
    generation: u64,
    text: Arc<str>,
    kind: DocumentKind,
}

impl DocumentSnapshot {
    /// Creates a snapshot and builds its structured view.
    pub fn new(
        uri: Uri,
        language_id: impl Into<String>,
        version: i32,
        generation: u64,
        text: impl Into<Arc<str>>,
    ) -> Self {
        let language_id = language_id.into();
        let language = LanguageId::from_identifier(&language_id);
        let text = text.into();
        let kind = DocumentKind::analyze(language, &text);

        Self {
            uri,
            language_id,
            language,
            version,
            generation,
            text,
            kind,
        }
    }

    /// Creates the successor snapshot for an accepted edit.
    ///
    /// Keeps the URI, language and generation.
    pub fn successor(&self, version: i32, text: impl Into<Arc<str>>) -> Self {
        Self::new(
            self.uri.clone(),
            self.language_id.clone(),
            version,
            self.generation,
            text,
        )
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Language identifier exactly as declared by the client.
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn language(&self) -> Option<LanguageId> {
        self.language
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the raw text, cheap to clone.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    /// Parsed build-file view, if this is a Dockerfile.
    pub fn as_dockerfile(&self) -> Option<&DockerfileView> {
        match &self.kind {
            DocumentKind::Dockerfile(view) => Some(view),
            _ => None,
        }
    }

    /// Top-level outline, if this is a Compose manifest.
    pub fn as_compose(&self) -> Option<&ComposeOutline> {
        match &self.kind {
            DocumentKind::Compose(outline) => Some(outline),
            _ => None,
        }
    }
}
