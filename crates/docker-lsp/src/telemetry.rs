//! Best-effort usage accounting.
//!
//! Analyses are recorded at most once per workspace, collector and language.
//! Failures reported through the supervisory boundary are buffered as well.
//! Nothing here can fail the caller: a disabled recorder ignores everything
//! and a full buffer drops the oldest event.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Upper bound on buffered events between two flushes.
const MAX_BUFFERED_EVENTS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A collector analysed a document of `language` in `workspace`.
    Analysis {
        workspace: String,
        collector: &'static str,
        language: String,
    },
    /// A collector or background task failed.
    Failure { task: String, message: String },
}

#[derive(Debug)]
pub struct AnalysisRecorder {
    enabled: AtomicBool,
    seen: Mutex<HashSet<(String, &'static str, String)>>,
    events: Mutex<VecDeque<TelemetryEvent>>,
}

impl AnalysisRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            seen: Mutex::new(HashSet::new()),
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Records an analysis. Returns true when this combination was new.
    pub fn record_analysis(&self, workspace: &str, collector: &'static str, language: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let key = (workspace.to_string(), collector, language.to_string());
        let newly_seen = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        if newly_seen {
            self.push(TelemetryEvent::Analysis {
                workspace: workspace.to_string(),
                collector,
                language: language.to_string(),
            });
        }
        newly_seen
    }

    pub fn record_failure(&self, task: &str, message: impl Into<String>) {
        if !self.is_enabled() {
            return;
        }
        self.push(TelemetryEvent::Failure {
            task: task.to_string(),
            message: message.into(),
        });
    }

    fn push(&self, event: TelemetryEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == MAX_BUFFERED_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Takes all buffered events.
    pub fn drain(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Drains the buffer and logs a summary. Returns the number of events.
    pub fn flush(&self) -> usize {
        let events = self.drain();
        if events.is_empty() {
            return 0;
        }

        let failures = events
            .iter()
            .filter(|event| matches!(event, TelemetryEvent::Failure { .. }))
            .count();
        tracing::info!(
            analyses = events.len() - failures,
            failures,
            "telemetry flush"
        );
        for event in &events {
            tracing::debug!(?event, "telemetry event");
        }
        events.len()
    }
}

impl Default for AnalysisRecorder {
    fn default() -> Self {
        Self::new(true)
    }
}
