//! Failure isolation for asynchronous work.
//!
//! Every future the server spawns runs through [`run_supervised`], which turns
//! a returned error or a panic into a [`TaskFailure`] and reports it through a
//! single path: an error log plus an [`AnalysisRecorder`] failure event.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use docker_lsp_core::DockerLspError;

use crate::telemetry::AnalysisRecorder;

#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("task {label} panicked: {message}")]
    Panicked { label: String, message: String },

    #[error("task {label} failed: {source}")]
    Failed {
        label: String,
        #[source]
        source: DockerLspError,
    },
}

impl TaskFailure {
    pub fn label(&self) -> &str {
        match self {
            Self::Panicked { label, .. } | Self::Failed { label, .. } => label,
        }
    }
}

/// Extracts the message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Polls `future` to completion, converting a panic into its message.
pub async fn catch_panic<F: Future>(future: F) -> Result<F::Output, String> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn report(recorder: &AnalysisRecorder, failure: &TaskFailure) {
    tracing::error!("{}", failure);
    recorder.record_failure(failure.label(), failure.to_string());
}

/// Runs `future` inside the supervisory boundary.
///
/// Returns `None` when the future failed or panicked; the failure has
/// already been reported.
pub async fn run_supervised<F, T>(label: &str, recorder: &AnalysisRecorder, future: F) -> Option<T>
where
    F: Future<Output = docker_lsp_core::Result<T>>,
{
    let failure = match catch_panic(future).await {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(source)) => TaskFailure::Failed {
            label: label.to_string(),
            source,
        },
        Err(message) => TaskFailure::Panicked {
            label: label.to_string(),
            message,
        },
    };
    report(recorder, &failure);
    None
}

/// Spawns `future` on the runtime inside the supervisory boundary.
pub fn spawn_supervised<F>(
    label: impl Into<String>,
    recorder: Arc<AnalysisRecorder>,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = docker_lsp_core::Result<()>> + Send + 'static,
{
    let label = label.into();
    tokio::spawn(async move {
        run_supervised(&label, &recorder, future).await;
    })
}
