//! The client-side record of one backend job.

use crate::api::{JobStatus, StatusResponse};
use serde::{Deserialize, Serialize};

/// A job as last reported by the backend.
///
/// Created from the `job_id` of a successful upload and overwritten by each
/// status response; the client never derives state the backend did not send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadJob {
    pub job_id: String,
    pub status: JobStatus,
    /// 0–100.
    pub progress: u8,
    pub message: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl UploadJob {
    /// A freshly created job that has not been polled yet.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            progress: 0,
            message: String::new(),
            result: None,
            error: None,
        }
    }

    /// Overwrite this record with a status response.
    pub fn apply(&mut self, response: StatusResponse) {
        self.status = response.status;
        self.progress = clamp_progress(response.progress);
        self.message = response.message;
        self.result = response.result;
        self.error = response.error;
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Status: RUNNING (40%) - Extracting claims`
    pub fn status_line(&self) -> String {
        format!(
            "Status: {} ({}%) - {}",
            self.status, self.progress, self.message
        )
    }
}

/// Round a JSON progress number into 0–100; NaN reads as 0.
fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}
