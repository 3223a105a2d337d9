use docker_lsp_core::rule_code;
use tower_lsp_server::ls_types::Diagnostic;

use crate::config::OverlapSuppressionConfig;

/// Concatenates collector results in registration order.
///
/// With suppression enabled, a diagnostic is dropped when a later collector
/// reported an equivalent code on exactly the same range.
pub fn merge(
    batches: Vec<(&'static str, Vec<Diagnostic>)>,
    policy: &OverlapSuppressionConfig,
) -> Vec<Diagnostic> {
    if !policy.enabled {
        return batches
            .into_iter()
            .flat_map(|(_, diagnostics)| diagnostics)
            .collect();
    }

    let mut merged = Vec::new();
    for (index, (collector, diagnostics)) in batches.iter().enumerate() {
        let later = &batches[index + 1..];
        for diagnostic in diagnostics {
            if let Some(superseding) = superseded_by(diagnostic, later, policy) {
                tracing::debug!(
                    "{} diagnostic {:?} superseded by {}",
                    collector,
                    rule_code(diagnostic),
                    superseding
                );
                continue;
            }
            merged.push(diagnostic.clone());
        }
    }
    merged
}

fn superseded_by(
    diagnostic: &Diagnostic,
    later: &[(&'static str, Vec<Diagnostic>)],
    policy: &OverlapSuppressionConfig,
) -> Option<&'static str> {
    let code = rule_code(diagnostic)?;
    later.iter().find_map(|(collector, diagnostics)| {
        diagnostics
            .iter()
            .any(|other| {
                other.range == diagnostic.range
                    && rule_code(other).is_some_and(|other_code| policy.are_equivalent(code, other_code))
            })
            .then_some(*collector)
    })
}
