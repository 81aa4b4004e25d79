//! Job polling as a cancellable background task.
//!
//! [`spawn`] starts a Tokio task that asks the backend for the job's status
//! once per interval until the job reaches a terminal state. The returned
//! [`PollHandle`] owns the task's lifecycle:
//!
//! ```text
//!   spawn ──▶ tick ──▶ GET /status/{id} ──▶ PollEvent::Status ──┐
//!               ▲              │                                │ terminal?
//!               │              └──▶ PollEvent::Error (retry) ───┤
//!               └────────────────────────── no ─────────────────┘
//!                                                               │ yes
//!                                                  join() ◀─────┘ JobOutcome
//! ```
//!
//! At most one status request is in flight: the next tick is awaited only
//! after the previous response has been handled, so no request is ever issued
//! after a terminal response. Failed requests are logged and retried on the
//! next tick; only a backend-reported `FAILED` ends the loop with a failed
//! outcome. Cancellation races both the tick and the in-flight request.

use crate::api::{Backend, JobStatus};
use crate::config::ClientConfig;
use crate::error::{PollError, ScarfError};
use crate::job::UploadJob;
use crate::progress::ProgressCallback;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Something observable happened during polling.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A status response arrived; the job record after applying it.
    Status(UploadJob),
    /// A status request failed; polling continues.
    Error(PollError),
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// `status == COMPLETED`; `result` holds the payload, if any.
    Completed(UploadJob),
    /// `status == FAILED`; `error` holds the backend's message, if any.
    Failed(UploadJob),
}

impl JobOutcome {
    pub fn job(&self) -> &UploadJob {
        match self {
            JobOutcome::Completed(job) | JobOutcome::Failed(job) => job,
        }
    }
}

/// A boxed stream of poll events; ends after the terminal status.
pub type PollEventStream = Pin<Box<dyn Stream<Item = PollEvent> + Send>>;

/// Stops a poll loop from anywhere; cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<Notify>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

/// Handle to a running poll loop.
#[derive(Debug)]
pub struct PollHandle {
    job_id: String,
    events: mpsc::UnboundedReceiver<PollEvent>,
    cancel: CancelHandle,
    task: JoinHandle<Result<JobOutcome, ScarfError>>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Next event, or `None` once the loop has ended and all events are read.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Ask the loop to stop; [`PollHandle::join`] then returns
    /// [`ScarfError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the loop to end. Unread events are discarded.
    pub async fn join(self) -> Result<JobOutcome, ScarfError> {
        let PollHandle {
            job_id,
            events,
            task,
            ..
        } = self;
        // The loop treats a closed channel as cancellation; keep it open.
        let _events = events;
        task.await
            .map_err(|e| ScarfError::Internal(format!("poller for job '{job_id}' panicked: {e}")))?
    }

    /// Consume the handle as a stream of events.
    ///
    /// Dropping the stream stops the loop at its next event.
    pub fn into_stream(self) -> PollEventStream {
        Box::pin(UnboundedReceiverStream::new(self.events))
    }
}

/// Start polling `job_id` every `config.poll_interval()`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn(backend: Arc<dyn Backend>, job_id: impl Into<String>, config: &ClientConfig) -> PollHandle {
    let job_id = job_id.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = Arc::new(Notify::new());

    let loop_state = PollLoop {
        backend,
        job_id: job_id.clone(),
        interval: config.poll_interval(),
        max_polls: config.max_polls,
        callback: config.progress_callback.clone(),
        events: tx,
        cancel: Arc::clone(&cancel),
    };

    info!(
        "Polling job '{}' every {}ms",
        job_id,
        config.poll_interval().as_millis()
    );

    PollHandle {
        job_id,
        events: rx,
        cancel: CancelHandle(cancel),
        task: tokio::spawn(loop_state.run()),
    }
}

struct PollLoop {
    backend: Arc<dyn Backend>,
    job_id: String,
    interval: Duration,
    max_polls: Option<u32>,
    callback: Option<ProgressCallback>,
    events: mpsc::UnboundedSender<PollEvent>,
    cancel: Arc<Notify>,
}

impl PollLoop {
    async fn run(self) -> Result<JobOutcome, ScarfError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut job = UploadJob::new(self.job_id.clone());
        let mut attempt: u32 = 0;

        loop {
            if let Some(max) = self.max_polls {
                if attempt >= max {
                    warn!("Job '{}': giving up after {} polls", self.job_id, attempt);
                    return Err(ScarfError::PollLimitReached {
                        job_id: self.job_id,
                        polls: attempt,
                    });
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.notified() => return Err(self.cancelled()),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let response = tokio::select! {
                biased;
                _ = self.cancel.notified() => return Err(self.cancelled()),
                r = self.backend.status(&self.job_id) => r,
            };

            match response {
                Ok(response) => {
                    job.apply(response);
                    debug!(
                        "Job '{}' poll {}: {} {}% {}",
                        self.job_id, attempt, job.status, job.progress, job.message
                    );
                    if let Some(ref cb) = self.callback {
                        cb.on_status(&job);
                    }
                    let delivered = self.events.send(PollEvent::Status(job.clone())).is_ok();

                    match job.status {
                        JobStatus::Completed => {
                            info!("Job '{}' completed after {} polls", self.job_id, attempt);
                            return Ok(JobOutcome::Completed(job));
                        }
                        JobStatus::Failed => {
                            warn!(
                                "Job '{}' failed: {}",
                                self.job_id,
                                job.error.as_deref().unwrap_or("no error message")
                            );
                            return Ok(JobOutcome::Failed(job));
                        }
                        JobStatus::Pending | JobStatus::Running if !delivered => {
                            return Err(self.cancelled());
                        }
                        JobStatus::Pending | JobStatus::Running => {}
                    }
                }
                Err(cause) => {
                    let err = PollError {
                        job_id: self.job_id.clone(),
                        attempt,
                        cause,
                    };
                    warn!("{err}");
                    if let Some(ref cb) = self.callback {
                        cb.on_poll_error(attempt, err.cause.to_string());
                    }
                    if self.events.send(PollEvent::Error(err)).is_err() {
                        return Err(self.cancelled());
                    }
                }
            }
        }
    }

    fn cancelled(&self) -> ScarfError {
        info!("Polling of job '{}' cancelled", self.job_id);
        ScarfError::Cancelled {
            job_id: self.job_id.clone(),
        }
    }
}
