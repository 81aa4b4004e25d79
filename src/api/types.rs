//! Wire types for the backend's HTTP contract.
//!
//! Field names match the JSON exactly. Optional fields carry `#[serde(default)]`
//! so a partially-populated response still decodes; the session decides what a
//! missing value means.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `POST /upload` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Lifecycle of a backend job as reported by `GET /status/{job_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// `COMPLETED` and `FAILED` end the poll loop.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /status/{job_id}` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    /// A JSON number; the backend sends integers but floats are tolerated.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /api/query` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

/// `POST /api/query` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// `POST /api/upload` response body (chat-document flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub chunks_processed: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /health` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// FastAPI's error envelope: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    /// Extract a human-readable message; validation errors arrive as arrays.
    pub(crate) fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_running_decodes() {
        let body = json!({"status": "RUNNING", "progress": 40, "message": "Extracting claims"});
        let s: StatusResponse = serde_json::from_value(body).unwrap();
        assert_eq!(s.status, JobStatus::Running);
        assert_eq!(s.progress, 40.0);
        assert_eq!(s.message, "Extracting claims");
        assert!(s.result.is_none());
        assert!(!s.status.is_terminal());
    }

    #[test]
    fn status_missing_progress_and_message_default() {
        let s: StatusResponse = serde_json::from_str(r#"{"status":"PENDING"}"#).unwrap();
        assert_eq!(s.progress, 0.0);
        assert_eq!(s.message, "");
    }

    #[test]
    fn status_failed_carries_error() {
        let s: StatusResponse =
            serde_json::from_str(r#"{"status":"FAILED","progress":60,"message":"","error":"boom"}"#)
                .unwrap();
        assert!(s.status.is_terminal());
        assert_eq!(s.error.as_deref(), Some("boom"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let r = serde_json::from_str::<StatusResponse>(r#"{"status":"QUEUED"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn upload_response_without_job_id() {
        let r: UploadResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(r.job_id.is_none());
    }

    #[test]
    fn query_answer_citations_optional() {
        let a: QueryAnswer = serde_json::from_str(r#"{"answer":"42"}"#).unwrap();
        assert!(a.citations.is_empty());
    }

    #[test]
    fn error_detail_string_and_array() {
        let d: ErrorDetail = serde_json::from_str(r#"{"detail":"Database not configured."}"#).unwrap();
        assert_eq!(d.message(), "Database not configured.");
        let d: ErrorDetail = serde_json::from_str(r#"{"detail":[{"loc":["body"]}]}"#).unwrap();
        assert!(d.message().starts_with('['));
    }

    #[test]
    fn job_status_display_matches_wire() {
        assert_eq!(JobStatus::Completed.to_string(), "COMPLETED");
        let v = serde_json::to_value(JobStatus::Running).unwrap();
        assert_eq!(v, json!("RUNNING"));
    }
}
