//! Document open/change/close handling.
//!
//! Each handler mutates the store synchronously and only then queues
//! diagnostics work, so store updates apply in notification arrival order.

use tower_lsp_server::ls_types::Uri;

use crate::state::ServerState;

/// Stores a newly opened document and schedules its first diagnostics run.
pub fn handle_document_open(
    state: &ServerState,
    uri: Uri,
    language_id: &str,
    version: i32,
    text: String,
) {
    let snapshot = state.store.open(uri.clone(), language_id, version, text);
    if snapshot.language().is_none() {
        tracing::debug!(
            "no collectors for language {:?} ({})",
            language_id,
            uri.as_str()
        );
    }
    state.pipeline.schedule(&uri);
}

/// Applies a full-content change.
///
/// Returns true when the change was accepted and diagnostics were scheduled.
/// Stale or unknown versions are ignored.
pub fn handle_document_change(state: &ServerState, uri: Uri, version: i32, text: String) -> bool {
    if !state.store.overwrite(&uri, version, text) {
        tracing::debug!("ignoring change to {} at v{}", uri.as_str(), version);
        return false;
    }
    state.pipeline.schedule(&uri)
}

/// Removes a closed document and clears its diagnostics.
pub fn handle_document_close(state: &ServerState, uri: Uri) {
    if !state.pipeline.close(&uri) {
        tracing::debug!("close for unknown document {}", uri.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_state, uri};
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_change_close() {
        let (state, notifier) = test_state();
        let uri = uri("/project/Dockerfile");

        handle_document_open(&state, uri.clone(), "dockerfile", 1, "FROM alpine\n".into());
        assert!(handle_document_change(
            &state,
            uri.clone(),
            2,
            "FROM alpine:3\n".into()
        ));
        assert!(!handle_document_change(
            &state,
            uri.clone(),
            2,
            "FROM ignored\n".into()
        ));
        assert_eq!(state.store.get(&uri).unwrap().text(), "FROM alpine:3\n");

        handle_document_close(&state, uri.clone());
        assert!(state.store.get(&uri).is_err());
        assert!(notifier.wait_for(1, Duration::from_secs(5)).await);

        let last = notifier.for_uri(&uri).pop().unwrap();
        assert_eq!(last.version, None);
        assert!(last.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_change_of_unknown_document_is_ignored() {
        let (state, notifier) = test_state();
        let uri = uri("/project/Dockerfile");

        assert!(!handle_document_change(&state, uri.clone(), 1, "FROM a".into()));
        handle_document_close(&state, uri);
        assert!(state.store.is_empty());
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_language_is_stored() {
        let (state, notifier) = test_state();
        let uri = uri("/project/notes.txt");

        handle_document_open(&state, uri.clone(), "plaintext", 1, "hello".into());
        state.queues.flush(&uri).await;

        assert_eq!(state.store.version(&uri).unwrap(), 1);
        let published = notifier.for_uri(&uri);
        assert_eq!(published.len(), 1);
        assert!(published[0].diagnostics.is_empty());
    }
}
