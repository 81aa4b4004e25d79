//! Shared helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use scarf_client::api::{DocumentUploadResponse, HealthResponse, QueryAnswer, UploadResponse};
use scarf_client::{ApiError, Backend, JobStatus, StatusResponse, UploadFile};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A backend that replays scripted replies. The last status reply repeats
/// once the script is down to one entry.
#[derive(Default)]
pub struct ScriptedBackend {
    uploads: Mutex<VecDeque<Result<UploadResponse, ApiError>>>,
    statuses: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    pub uploaded: Mutex<Vec<String>>,
    pub status_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_ok(self, job_id: &str) -> Self {
        self.upload_reply(Ok(UploadResponse {
            job_id: Some(job_id.to_string()),
        }))
    }

    pub fn upload_reply(self, reply: Result<UploadResponse, ApiError>) -> Self {
        self.uploads.lock().unwrap().push_back(reply);
        self
    }

    pub fn status(self, reply: Result<StatusResponse, ApiError>) -> Self {
        self.statuses.lock().unwrap().push_back(reply);
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        self.uploaded.lock().unwrap().push(file.file_name.clone());
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no upload scripted".into())))
    }

    async fn status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut q = self.statuses.lock().unwrap();
        if q.len() > 1 {
            return q.pop_front().unwrap();
        }
        q.front()
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Transport("no status scripted".into())))
    }

    async fn query(&self, _question: &str) -> Result<QueryAnswer, ApiError> {
        Err(ApiError::Transport("query not scripted".into()))
    }

    async fn upload_document(&self, _file: &UploadFile) -> Result<DocumentUploadResponse, ApiError> {
        Err(ApiError::Transport("ingest not scripted".into()))
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: "ok".into(),
            message: None,
        })
    }
}

pub fn status(status: JobStatus, progress: f64, message: &str) -> StatusResponse {
    StatusResponse {
        status,
        progress,
        message: message.to_string(),
        result: None,
        error: None,
    }
}

/// A completed status carrying a small but complete report.
pub fn completed_with_report() -> StatusResponse {
    let mut s = status(JobStatus::Completed, 100.0, "Done");
    s.result = Some(sample_result());
    s
}

pub fn sample_result() -> serde_json::Value {
    serde_json::json!({
        "doc": {"sections": [
            {"section_id": "s1", "title": "Abstract", "content": "We study drug A in 40 adults."},
            {"section_id": "s2", "title": "Results", "content": "Blood pressure fell by 12 mmHg."}
        ]},
        "claims": {"claims": [
            {"claim_id": "c1", "statement": "Drug A lowers blood pressure.", "confidence": "high",
             "evidence": [{"text": "12 mmHg reduction", "source": "Results"}]},
            {"claim_id": "c2", "statement": "The effect is durable."}
        ]},
        "gaps": {"analysis": [
            {"claim_id": "c2", "signals": [{"signal": "No follow-up beyond 4 weeks"}]}
        ]},
        "validation": {"report": [
            {"claim_id": "c2", "questions": [{"question": "What happens after 6 months?"}]}
        ]}
    })
}

/// Write a small PDF-looking file into `dir`.
pub fn pdf_in(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.4\n%test\n").unwrap();
    path
}
