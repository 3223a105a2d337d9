//! Per-document serialized job execution.
//!
//! Each open document owns a FIFO queue drained by one worker task, so jobs
//! for the same document never overlap while different documents proceed
//! independently. Jobs are never cancelled; superseded work is discarded by
//! the pipeline at publish time instead.

use dashmap::DashMap;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_lsp_server::ls_types::Uri;

use crate::supervisor;
use crate::telemetry::AnalysisRecorder;

struct QueuedJob {
    label: &'static str,
    job: BoxFuture<'static, ()>,
}

struct Worker {
    sender: mpsc::UnboundedSender<QueuedJob>,
    handle: JoinHandle<()>,
}

pub struct DocumentQueues {
    workers: DashMap<Uri, Worker>,
    /// Workers of closed documents that may still be draining.
    retired: DashMap<Uri, Vec<JoinHandle<()>>>,
    recorder: Arc<AnalysisRecorder>,
}

impl DocumentQueues {
    pub fn new(recorder: Arc<AnalysisRecorder>) -> Self {
        Self {
            workers: DashMap::new(),
            retired: DashMap::new(),
            recorder,
        }
    }

    /// Appends a job to the queue of `uri`, creating the queue on first use.
    ///
    /// Never blocks. A panic inside `job` is contained and reported; the
    /// worker moves on to the next job.
    pub fn enqueue<F>(&self, uri: Uri, label: &'static str, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let queued = QueuedJob {
            label,
            job: Box::pin(job),
        };

        let mut worker = self
            .workers
            .entry(uri.clone())
            .or_insert_with(|| self.start_worker(&uri));

        if let Err(mpsc::error::SendError(returned)) = worker.sender.send(queued) {
            // Only possible when the worker task died outside a job.
            tracing::warn!("restarting queue worker for {}", uri.as_str());
            *worker = self.start_worker(&uri);
            if worker.sender.send(returned).is_err() {
                tracing::error!("dropping {} job for {}", label, uri.as_str());
            }
        }
    }

    fn start_worker(&self, uri: &Uri) -> Worker {
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedJob>();
        let predecessors = self
            .retired
            .remove(uri)
            .map(|(_, handles)| handles)
            .unwrap_or_default();
        let recorder = Arc::clone(&self.recorder);

        let handle = tokio::spawn(async move {
            // A reopened document waits until its previous queue has drained.
            for predecessor in predecessors {
                if let Err(e) = predecessor.await {
                    tracing::debug!("previous queue worker ended abnormally: {}", e);
                }
            }
            while let Some(QueuedJob { label, job }) = receiver.recv().await {
                supervisor::run_supervised(label, &recorder, async move {
                    job.await;
                    Ok::<_, docker_lsp_core::DockerLspError>(())
                })
                .await;
            }
        });

        Worker { sender, handle }
    }

    /// Stops accepting jobs for `uri`.
    ///
    /// Jobs already queued still run in order; the worker exits once they
    /// are done.
    pub fn retire(&self, uri: &Uri) {
        let Some((_, worker)) = self.workers.remove(uri) else {
            return;
        };
        drop(worker.sender);

        self.retired.retain(|_, handles| {
            handles.retain(|handle| !handle.is_finished());
            !handles.is_empty()
        });
        self.retired
            .entry(uri.clone())
            .or_default()
            .push(worker.handle);
    }

    /// Resolves once every job queued for `uri` before this call has run.
    ///
    /// Returns immediately when `uri` has no active queue.
    pub async fn flush(&self, uri: &Uri) {
        if !self.is_active(uri) {
            return;
        }
        let (done, finished) = oneshot::channel();
        self.enqueue(uri.clone(), "flush", async move {
            let _ = done.send(());
        });
        let _ = finished.await;
    }

    pub fn is_active(&self, uri: &Uri) -> bool {
        self.workers.contains_key(uri)
    }

    /// Number of documents with an active queue.
    pub fn active_queues(&self) -> usize {
        self.workers.len()
    }
}
