//! Code actions handler implementation.
//!
//! Collectors embed quick fixes in the diagnostics they publish; the editor
//! sends those diagnostics back with the request, so no analysis is re-run.

use std::collections::HashMap;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, TextEdit, WorkspaceEdit,
};

use docker_lsp_core::{quick_fixes, ranges_overlap};

use crate::state::ServerState;

/// Handles code action requests.
///
/// Returns one quick fix per suggestion attached to a diagnostic that
/// overlaps the requested range. Gracefully degrades by returning an empty
/// vec for documents that are not open.
pub fn handle_code_actions(state: &ServerState, params: CodeActionParams) -> Vec<CodeActionOrCommand> {
    let uri = params.text_document.uri;
    if let Err(e) = state.store.version(&uri) {
        tracing::debug!("no code actions: {}", e);
        return vec![];
    }

    let mut actions = Vec::new();
    for diagnostic in &params.context.diagnostics {
        if !ranges_overlap(diagnostic.range, params.range) {
            continue;
        }
        for fix in quick_fixes(diagnostic) {
            let edit = TextEdit {
                range: fix.target_range(diagnostic),
                new_text: fix.edit,
            };
            let mut changes = HashMap::new();
            changes.insert(uri.clone(), vec![edit]);

            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: fix.title,
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![diagnostic.clone()]),
                edit: Some(WorkspaceEdit {
                    changes: Some(changes),
                    ..Default::default()
                }),
                is_preferred: Some(true),
                ..Default::default()
            }));
        }
    }
    actions
}
