use dashmap::DashMap;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tower_lsp_server::ls_types::Uri;

use docker_lsp_core::{DockerLspError, DocumentSnapshot, Result};

struct Slot {
    snapshot: Arc<DocumentSnapshot>,
    leases: Arc<AtomicUsize>,
}

impl Slot {
    fn new(snapshot: Arc<DocumentSnapshot>) -> Self {
        Self {
            snapshot,
            leases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Lease on one document snapshot for the duration of an operation.
///
/// The snapshot stays readable after the document is edited or closed; the
/// lease is released when the handle drops.
pub struct DocumentHandle {
    snapshot: Arc<DocumentSnapshot>,
    leases: Arc<AtomicUsize>,
}

impl DocumentHandle {
    pub fn snapshot(&self) -> &Arc<DocumentSnapshot> {
        &self.snapshot
    }
}

impl Deref for DocumentHandle {
    type Target = DocumentSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

impl Drop for DocumentHandle {
    fn drop(&mut self) {
        self.leases.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("uri", &self.snapshot.uri().as_str())
            .field("version", &self.snapshot.version())
            .finish()
    }
}

/// Canonical state of every open document.
///
/// The store is the only writer of document content. Each entry holds an
/// immutable snapshot that is swapped whole on every accepted edit, so
/// readers never observe a partially applied change and never block on
/// collectors. Map locks are held for a lookup or a swap only.
///
/// # Examples
///
/// ```
/// use docker_lsp::document::DocumentStore;
/// use tower_lsp_server::ls_types::Uri;
///
/// let store = DocumentStore::new();
/// let uri: Uri = "file:///project/Dockerfile".parse().unwrap();
///
/// store.open(uri.clone(), "dockerfile", 1, "FROM scratch".into());
/// assert!(store.overwrite(&uri, 2, "FROM alpine".into()));
/// assert!(!store.overwrite(&uri, 2, "FROM busybox".into()));
/// assert_eq!(store.version(&uri).unwrap(), 2);
/// ```
pub struct DocumentStore {
    documents: DashMap<Uri, Slot>,
    generations: AtomicU64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            generations: AtomicU64::new(0),
        }
    }

    /// Inserts a document, replacing any previous entry for the URI.
    ///
    /// A replaced entry starts a new lifecycle: its snapshots, and jobs
    /// holding them, are no longer current.
    pub fn open(
        &self,
        uri: Uri,
        language_id: &str,
        version: i32,
        text: String,
    ) -> Arc<DocumentSnapshot> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(DocumentSnapshot::new(
            uri.clone(),
            language_id,
            version,
            generation,
            text,
        ));

        if self
            .documents
            .insert(uri, Slot::new(Arc::clone(&snapshot)))
            .is_some()
        {
            tracing::debug!(
                "reopened {} without close, starting generation {}",
                snapshot.uri().as_str(),
                generation
            );
        }
        snapshot
    }

    /// Replaces the content when `version` is strictly newer than the stored one.
    ///
    /// Returns false for stale versions and unknown URIs; the store is left
    /// untouched in both cases.
    pub fn overwrite(&self, uri: &Uri, version: i32, text: String) -> bool {
        let current = match self.documents.get(uri) {
            Some(slot) => Arc::clone(&slot.snapshot),
            None => {
                tracing::debug!("ignoring change for unopened document {}", uri.as_str());
                return false;
            }
        };
        if version <= current.version() {
            tracing::debug!(
                "ignoring stale change for {}: version {} <= {}",
                uri.as_str(),
                version,
                current.version()
            );
            return false;
        }

        // Built outside the map lock; the structured view may be expensive.
        let next = Arc::new(current.successor(version, text));

        let Some(mut slot) = self.documents.get_mut(uri) else {
            return false;
        };
        if slot.snapshot.generation() != current.generation() || version <= slot.snapshot.version() {
            tracing::debug!("lost overwrite race for {}", uri.as_str());
            return false;
        }
        slot.snapshot = next;
        true
    }

    /// Leases the current snapshot.
    pub fn read(&self, uri: &Uri) -> Result<DocumentHandle> {
        let slot = self.documents.get(uri).ok_or_else(|| not_found(uri))?;
        slot.leases.fetch_add(1, Ordering::AcqRel);
        Ok(DocumentHandle {
            snapshot: Arc::clone(&slot.snapshot),
            leases: Arc::clone(&slot.leases),
        })
    }

    /// Current snapshot without taking a lease.
    pub fn get(&self, uri: &Uri) -> Result<Arc<DocumentSnapshot>> {
        self.documents
            .get(uri)
            .map(|slot| Arc::clone(&slot.snapshot))
            .ok_or_else(|| not_found(uri))
    }

    pub fn version(&self, uri: &Uri) -> Result<i32> {
        self.documents
            .get(uri)
            .map(|slot| slot.snapshot.version())
            .ok_or_else(|| not_found(uri))
    }

    /// Removes a document. Outstanding handles stay valid.
    pub fn close(&self, uri: &Uri) -> Option<Arc<DocumentSnapshot>> {
        self.documents.remove(uri).map(|(_, slot)| slot.snapshot)
    }

    pub fn keys(&self) -> HashSet<Uri> {
        self.documents
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Live handles on the current entry of `uri`, across its versions.
    pub fn leases(&self, uri: &Uri) -> usize {
        self.documents
            .get(uri)
            .map_or(0, |slot| slot.leases.load(Ordering::Acquire))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(uri: &Uri) -> DockerLspError {
    DockerLspError::NotFound {
        uri: uri.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn uri(path: &str) -> Uri {
        Uri::from_file_path(path).unwrap()
    }

    #[test]
    fn test_open_and_read() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "FROM scratch".into());

        let handle = assert_ok!(store.read(&uri));
        assert_eq!(handle.text(), "FROM scratch");
        assert_eq!(handle.version(), 1);
        assert_eq!(handle.language_id(), "dockerfile");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_increasing_overwrites() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "v1".into());

        for version in 2..=10 {
            assert!(store.overwrite(&uri, version, format!("v{version}")));
        }

        assert_eq!(store.version(&uri).unwrap(), 10);
        assert_eq!(store.get(&uri).unwrap().text(), "v10");
    }

    #[test]
    fn test_stale_overwrite_is_rejected() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 5, "current".into());

        assert!(!store.overwrite(&uri, 5, "same version".into()));
        assert!(!store.overwrite(&uri, 3, "older".into()));

        let snapshot = store.get(&uri).unwrap();
        assert_eq!(snapshot.version(), 5);
        assert_eq!(snapshot.text(), "current");
    }

    #[test]
    fn test_overwrite_unknown_uri() {
        let store = DocumentStore::new();
        assert!(!store.overwrite(&uri("/nowhere/Dockerfile"), 2, "x".into()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_generation() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        let opened = store.open(uri.clone(), "dockerfile", 1, "a".into());
        store.overwrite(&uri, 2, "b".into());

        assert_eq!(store.get(&uri).unwrap().generation(), opened.generation());
    }

    #[test]
    fn test_close_makes_document_not_found() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "FROM scratch".into());

        let removed = store.close(&uri).unwrap();
        assert_eq!(removed.version(), 1);
        assert!(store.close(&uri).is_none());

        assert!(assert_err!(store.read(&uri)).is_not_found());
        assert!(assert_err!(store.get(&uri)).is_not_found());
        assert!(assert_err!(store.version(&uri)).is_not_found());
        assert!(!store.overwrite(&uri, 2, "x".into()));
    }

    #[test]
    fn test_handle_outlives_close() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "FROM scratch".into());

        let handle = store.read(&uri).unwrap();
        store.close(&uri);

        assert_eq!(handle.text(), "FROM scratch");
    }

    #[test]
    fn test_handle_keeps_its_snapshot_across_edits() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "old".into());

        let handle = store.read(&uri).unwrap();
        store.overwrite(&uri, 2, "new".into());

        assert_eq!(handle.text(), "old");
        assert_eq!(store.get(&uri).unwrap().text(), "new");
    }

    #[test]
    fn test_leases_are_released_on_drop() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "x".into());

        let first = store.read(&uri).unwrap();
        let second = store.read(&uri).unwrap();
        assert_eq!(store.leases(&uri), 2);

        drop(first);
        assert_eq!(store.leases(&uri), 1);

        store.overwrite(&uri, 2, "y".into());
        assert_eq!(store.leases(&uri), 1);

        drop(second);
        assert_eq!(store.leases(&uri), 0);
    }

    #[test]
    fn test_lease_released_on_panic() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 1, "x".into());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _handle = store.read(&uri).unwrap();
            panic!("job failed while holding a handle");
        }));

        assert!(result.is_err());
        assert_eq!(store.leases(&uri), 0);
    }

    #[test]
    fn test_reopen_starts_new_generation() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        let first = store.open(uri.clone(), "dockerfile", 1, "a".into());
        store.close(&uri);
        let second = store.open(uri.clone(), "dockerfile", 1, "a".into());

        assert_ne!(first.generation(), second.generation());
        assert_eq!(store.version(&uri).unwrap(), 1);
    }

    #[test]
    fn test_keys() {
        let store = DocumentStore::new();
        let a = uri("/project/a/Dockerfile");
        let b = uri("/project/b/compose.yaml");
        store.open(a.clone(), "dockerfile", 1, String::new());
        store.open(b.clone(), "dockercompose", 1, String::new());

        let keys = store.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&a));
        assert!(keys.contains(&b));
    }

    #[test]
    fn test_concurrent_overwrites_never_decrease_version() {
        let store = DocumentStore::new();
        let uri = uri("/project/Dockerfile");
        store.open(uri.clone(), "dockerfile", 0, String::new());

        std::thread::scope(|scope| {
            for thread in 0..4 {
                let store = &store;
                let uri = &uri;
                scope.spawn(move || {
                    for step in 0..250 {
                        let version = step * 4 + thread + 1;
                        store.overwrite(uri, version, format!("v{version}"));
                        let observed = store.version(uri).unwrap();
                        assert!(observed >= version);
                    }
                });
            }
        });

        assert_eq!(store.version(&uri).unwrap(), 1000);
        assert_eq!(store.get(&uri).unwrap().text(), "v1000");
    }
}
