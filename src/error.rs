//! Error types for the scarf-client library.
//!
//! Two layers of error reflect two distinct failure scopes:
//!
//! * [`ApiError`]: a single HTTP exchange with the backend failed
//!   (connection refused, non-2xx status, undecodable body). It carries no
//!   opinion about whether the caller should give up.
//!
//! * [`ScarfError`]: **Fatal** for the operation in progress (the upload was
//!   rejected, the job failed, the local file cannot be read). Returned as
//!   `Err(ScarfError)` from the top-level `analyze*` functions and from the
//!   session/chat entry points.
//!
//! While polling, an `ApiError` is wrapped in a [`PollError`] and treated as
//! **non-fatal**: it is reported and the next tick simply tries again. Only a
//! backend-reported `FAILED` status ends the loop with an error.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scarf-client library.
#[derive(Debug, Error)]
pub enum ScarfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A submission carried no files at all.
    #[error("No file selected")]
    NoFileSelected,

    /// Selected file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not in the declared accept-list.
    #[error("File '{path}' is not an accepted type (accepted: {accept})")]
    NotAccepted { path: PathBuf, accept: String },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Session errors ────────────────────────────────────────────────────
    /// A submission arrived while another job is still uploading or polling.
    #[error("A job is already in progress; wait for it to finish or reset the session")]
    Busy,

    // ── Backend errors ────────────────────────────────────────────────────
    /// Upload request failed at the transport level or returned non-2xx.
    #[error("Upload Failed: {source}")]
    UploadFailed {
        #[source]
        source: ApiError,
    },

    /// Upload returned 2xx but the body carried no job identifier.
    #[error("Upload Failed: response did not contain a job_id")]
    MissingJobId,

    /// The backend reported `status: FAILED` for the job.
    #[error("Processing Failed: {error}")]
    JobFailed { job_id: String, error: String },

    /// The job completed but its `result` payload has an unexpected shape.
    #[error("Job '{job_id}' completed with an unreadable result: {detail}")]
    InvalidResult { job_id: String, detail: String },

    /// The optional poll budget was exhausted before a terminal status.
    #[error("Job '{job_id}' still not finished after {polls} status requests\nIncrease --max-polls or omit it to poll indefinitely.")]
    PollLimitReached { job_id: String, polls: u32 },

    /// Polling was cancelled by the caller.
    #[error("Polling of job '{job_id}' was cancelled")]
    Cancelled { job_id: String },

    /// A one-shot request (status, query, health) failed.
    #[error("Request to {endpoint} failed: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: ApiError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the rendered report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed HTTP exchange with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure; no response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    ///
    /// `detail` is the FastAPI-style `{"detail": …}` message when the body
    /// carried one.
    #[error("HTTP {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The body could not be decoded into the expected JSON shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// The message a user should see for this failure.
    ///
    /// Prefers the backend's own `detail` over the bare status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(d), ..
            } => d.clone(),
            other => other.to_string(),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// A non-fatal error for a single status poll.
///
/// Reported through [`crate::progress::JobProgressCallback::on_poll_error`]
/// and [`crate::poller::PollEvent::Error`]; the loop continues on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Status poll {attempt} for job '{job_id}' failed: {cause}")]
pub struct PollError {
    pub job_id: String,
    /// 1-indexed request number within this poll loop.
    pub attempt: u32,
    #[source]
    pub cause: ApiError,
}
