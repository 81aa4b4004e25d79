//! The upload → poll → render state machine.
//!
//! [`AnalysisSession`] owns one [`UiState`] and publishes every change through
//! a `tokio::sync::watch` channel. Front-ends (the CLI progress bar, a TUI, a
//! web handler) subscribe and redraw; they never hold references into the
//! session's internals.
//!
//! ```text
//!   Idle ──submit──▶ Uploading ──job_id──▶ Polling ──COMPLETED──▶ Completed
//!    ▲                   │                    │
//!    │                   └──error──┐          └──FAILED──▶ Failed
//!    └──────── reset ◀─────────────┴─────────────────────────┘
//! ```
//!
//! Validation of the selected file happens before the `Uploading` transition,
//! so a rejected submission leaves the published state untouched.

use crate::api::{Backend, HttpBackend};
use crate::config::ClientConfig;
use crate::error::ScarfError;
use crate::job::UploadJob;
use crate::poller::{self, CancelHandle, JobOutcome};
use crate::report::ReportResult;
use crate::upload::{self, UploadFile};
use crate::view::ReportView;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

/// Where the session is in the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Polling,
    Completed,
    Failed,
}

impl Phase {
    /// A job is in flight; new submissions are rejected.
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Uploading | Phase::Polling)
    }
}

/// Everything a front-end needs to draw the current screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiState {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub job: Option<UploadJob>,
    /// `Status: RUNNING (40%) - Extracting claims` while polling.
    pub status_line: Option<String>,
    /// The failure message exactly as received (backend `error` for a failed
    /// job, `detail` or transport description for a failed upload).
    pub error: Option<String>,
    /// User-facing alert text for the last failure.
    pub notice: Option<String>,
    pub report: Option<ReportView>,
}

impl UiState {
    pub fn drop_zone_visible(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Failed)
    }

    pub fn loading_visible(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn results_visible(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub job_id: String,
    pub file_name: String,
    pub report: ReportResult,
    pub view: ReportView,
    /// The `result` payload as received, `None` when the backend sent none.
    pub raw: Option<serde_json::Value>,
}

/// Drives one document at a time through upload, polling and rendering.
pub struct AnalysisSession {
    backend: Arc<dyn Backend>,
    config: ClientConfig,
    state: watch::Sender<UiState>,
    generation: AtomicU64,
    active: Mutex<Option<CancelHandle>>,
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("config", &self.config)
            .field("phase", &self.state.borrow().phase)
            .finish_non_exhaustive()
    }
}

impl AnalysisSession {
    pub fn new(backend: Arc<dyn Backend>, config: ClientConfig) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            backend,
            config,
            state,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Session over the production HTTP backend.
    pub fn connect(config: ClientConfig) -> Result<Self, ScarfError> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// State changes as a stream, starting with the current state.
    pub fn state_stream(&self) -> WatchStream<UiState> {
        WatchStream::new(self.subscribe())
    }

    /// Stop any in-flight poll and return to `Idle`.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel();
        self.state.send_replace(UiState::default());
        info!("Session reset");
    }

    /// Cancel the active poll loop, if any. The pending `submit` returns
    /// [`ScarfError::Cancelled`].
    pub fn cancel(&self) -> bool {
        let handle = match self.active.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(h) => {
                h.cancel();
                true
            }
            None => false,
        }
    }

    /// Upload the first of `files`, poll its job to a terminal state and
    /// build the report view.
    ///
    /// # Errors
    /// - `NoFileSelected`, `NotAccepted`, `FileNotFound`, `PermissionDenied`,
    ///   `ReadFailed`: nothing was sent; the state is unchanged.
    /// - `Busy`: another submission is uploading or polling.
    /// - `UploadFailed`, `MissingJobId`, `JobFailed`, `InvalidResult`,
    ///   `PollLimitReached`: the state moved to `Failed`.
    /// - `Cancelled`: [`AnalysisSession::cancel`] or [`AnalysisSession::reset`]
    ///   was called while polling.
    pub async fn submit(&self, files: &[PathBuf]) -> Result<AnalysisOutput, ScarfError> {
        if self.state.borrow().phase.is_busy() {
            return Err(ScarfError::Busy);
        }

        let file = upload::prepare(files, &self.config.accept)
            .await
            .inspect_err(|e| warn!("Submission rejected: {e}"))?;

        let generation = self.begin(&file.file_name)?;
        let result = self.run(generation, file).await;

        if let Ok(mut guard) = self.active.lock() {
            if !self.is_stale(generation) {
                guard.take();
            }
        }
        result
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// `Idle | Completed | Failed → Uploading`, atomically against other
    /// submissions.
    fn begin(&self, file_name: &str) -> Result<u64, ScarfError> {
        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.phase.is_busy() {
                busy = true;
                return false;
            }
            *s = UiState {
                phase: Phase::Uploading,
                file_name: Some(file_name.to_string()),
                status_line: Some(format!("Uploading {file_name}...")),
                ..UiState::default()
            };
            true
        });
        if busy {
            return Err(ScarfError::Busy);
        }
        Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Apply `f` only if no reset or newer submission happened since
    /// `generation` started.
    fn update(&self, generation: u64, f: impl FnOnce(&mut UiState)) {
        self.state.send_if_modified(|s| {
            if self.is_stale(generation) {
                return false;
            }
            f(s);
            true
        });
    }

    fn fail(&self, generation: u64, job_id: Option<&str>, error: String, notice: String) {
        warn!("{notice}");
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_job_failed(job_id, error.clone());
        }
        self.update(generation, |s| {
            s.phase = Phase::Failed;
            s.status_line = None;
            s.error = Some(error);
            s.notice = Some(notice);
        });
    }

    async fn run(&self, generation: u64, file: UploadFile) -> Result<AnalysisOutput, ScarfError> {
        let callback = self.config.progress_callback.clone();

        // ── Upload ───────────────────────────────────────────────────────
        if let Some(ref cb) = callback {
            cb.on_upload_start(&file.file_name, file.bytes.len());
        }
        info!("Uploading '{}' ({} bytes)", file.file_name, file.bytes.len());

        let uploaded = self.backend.upload(&file).await;
        if self.is_stale(generation) {
            info!("Session reset during upload, dropping '{}'", file.file_name);
            return Err(ScarfError::Cancelled {
                job_id: uploaded.ok().and_then(|r| r.job_id).unwrap_or_default(),
            });
        }

        let job_id = match uploaded {
            Ok(response) => match response.job_id.filter(|id| !id.is_empty()) {
                Some(id) => id,
                None => {
                    let err = ScarfError::MissingJobId;
                    self.fail(
                        generation,
                        None,
                        "response did not contain a job_id".into(),
                        format!("Error uploading file: {err}"),
                    );
                    return Err(err);
                }
            },
            Err(source) => {
                let error = source.user_message();
                let err = ScarfError::UploadFailed { source };
                self.fail(generation, None, error, format!("Error uploading file: {err}"));
                return Err(err);
            }
        };

        info!("Upload accepted, job '{}'", job_id);
        if let Some(ref cb) = callback {
            cb.on_job_created(&job_id);
        }

        // ── Poll ─────────────────────────────────────────────────────────
        // The generation check and the handle store share the lock that
        // `cancel` takes, so a reset either sees this handle or stops us here.
        let mut handle = {
            let mut guard = match self.active.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if self.is_stale(generation) {
                return Err(ScarfError::Cancelled { job_id });
            }
            let handle = poller::spawn(Arc::clone(&self.backend), job_id.clone(), &self.config);
            *guard = Some(handle.cancel_handle());
            handle
        };
        self.update(generation, |s| {
            s.phase = Phase::Polling;
            s.job = Some(UploadJob::new(job_id.clone()));
            s.status_line = Some("Processing...".to_string());
        });

        while let Some(event) = handle.next_event().await {
            if let poller::PollEvent::Status(job) = event {
                self.update(generation, |s| {
                    s.status_line = Some(job.status_line());
                    s.job = Some(job);
                });
            }
        }

        let outcome = match handle.join().await {
            Ok(outcome) => outcome,
            Err(err @ ScarfError::Cancelled { .. }) => {
                self.update(generation, |s| *s = UiState::default());
                return Err(err);
            }
            Err(err) => {
                let error = err.to_string();
                self.fail(generation, Some(&job_id), error.clone(), format!("Processing Failed: {error}"));
                return Err(err);
            }
        };

        // ── Terminal ─────────────────────────────────────────────────────
        match outcome {
            JobOutcome::Failed(job) => {
                let error = job.error.clone().unwrap_or_default();
                self.fail(
                    generation,
                    Some(&job_id),
                    error.clone(),
                    format!("Processing Failed: {error}"),
                );
                Err(ScarfError::JobFailed { job_id, error })
            }
            JobOutcome::Completed(job) => {
                let report = match ReportResult::from_payload(job.result.as_ref()) {
                    Ok(r) => r,
                    Err(e) => {
                        let detail = e.to_string();
                        self.fail(
                            generation,
                            Some(&job_id),
                            format!("unreadable result: {detail}"),
                            format!("Processing Failed: unreadable result: {detail}"),
                        );
                        return Err(ScarfError::InvalidResult { job_id, detail });
                    }
                };
                let view = ReportView::build(&report);
                info!(
                    "Job '{}' rendered: {} sections, {} claims",
                    job_id, view.summary.sections, view.summary.claims
                );
                if let Some(ref cb) = callback {
                    cb.on_job_complete(&job_id, &view.summary);
                }

                let raw = job.result.clone();
                let shown = view.clone();
                self.update(generation, |s| {
                    s.phase = Phase::Completed;
                    s.status_line = Some(job.status_line());
                    s.job = Some(job);
                    s.report = Some(shown);
                });

                Ok(AnalysisOutput {
                    job_id,
                    file_name: file.file_name,
                    report,
                    view,
                    raw,
                })
            }
        }
    }
}
