//! Workspace folder bookkeeping.
//!
//! Maps a document URI to the workspace folder that contains it so collectors
//! can run relative to the right root.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tower_lsp_server::ls_types::{Uri, WorkspaceFolder};

/// Where a document lives relative to the open workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    /// Directory collectors run in.
    pub root: PathBuf,
    /// Document path relative to `root`, `/` separated.
    pub relative_path: String,
    /// Identifies the workspace for telemetry deduplication.
    pub key: String,
    /// The containing workspace folder, if any.
    pub folder: Option<Uri>,
}

#[derive(Debug, Default)]
pub struct WorkspaceFolders {
    folders: RwLock<Vec<WorkspaceFolder>>,
}

impl WorkspaceFolders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, folders: Vec<WorkspaceFolder>) {
        *self.folders.write().unwrap_or_else(PoisonError::into_inner) = folders;
    }

    pub fn folders(&self) -> Vec<WorkspaceFolder> {
        self.folders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolves the workspace context of `uri`.
    ///
    /// The deepest containing folder wins. Documents outside every folder,
    /// and non-file URIs, run in the system temporary directory.
    pub fn resolve(&self, uri: &Uri) -> WorkspaceContext {
        let document_path = local_path(uri);

        let best = document_path.as_deref().and_then(|document| {
            self.folders
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter_map(|folder| {
                    let root = local_path(&folder.uri)?;
                    document
                        .starts_with(&root)
                        .then(|| (root, folder.uri.clone()))
                })
                .max_by_key(|(root, _)| root.components().count())
        });

        match (best, document_path) {
            (Some((root, folder)), Some(document)) => WorkspaceContext {
                relative_path: relative(&document, &root),
                key: folder.as_str().to_string(),
                root,
                folder: Some(folder),
            },
            (_, document) => WorkspaceContext {
                root: std::env::temp_dir(),
                relative_path: document
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| uri.as_str().to_string()),
                key: String::new(),
                folder: None,
            },
        }
    }
}

/// Filesystem path of a `file:` URI; other schemes have none.
fn local_path(uri: &Uri) -> Option<PathBuf> {
    let is_file = uri
        .as_str()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"));
    if !is_file {
        return None;
    }
    uri.to_file_path().map(|path| path.to_path_buf())
}

fn relative(document: &Path, root: &Path) -> String {
    document
        .strip_prefix(root)
        .unwrap_or(document)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
