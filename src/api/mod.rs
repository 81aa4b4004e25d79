//! The backend seam: everything the client needs from the analysis service.
//!
//! ```text
//!  upload ──▶ POST /upload            → { job_id }
//!  status ──▶ GET  /status/{job_id}   → { status, progress, message, result?, error? }
//!  query  ──▶ POST /api/query         → { answer, citations? }
//!  ingest ──▶ POST /api/upload        → { filename }
//!  health ──▶ GET  /health            → { status }
//! ```
//!
//! [`Backend`] is a trait so the session and the poller can be driven by a
//! scripted fake in tests; [`http::HttpBackend`] is the production
//! implementation over `reqwest`.

pub mod http;
pub mod types;

use crate::error::ApiError;
use crate::upload::UploadFile;
use async_trait::async_trait;

pub use http::HttpBackend;
pub use types::{
    DocumentUploadResponse, HealthResponse, JobStatus, QueryAnswer, StatusResponse, UploadResponse,
};

/// One HTTP exchange per method; no retries happen at this layer.
///
/// Implementations must be `Send + Sync`: the poller calls [`Backend::status`]
/// from a spawned task while the session holds its own `Arc` to the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submit a document for analysis and obtain a job identifier.
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError>;

    /// Fetch the current status of a job.
    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;

    /// Ask a question about the indexed chat document.
    async fn query(&self, question: &str) -> Result<QueryAnswer, ApiError>;

    /// Index a document for the chat flow.
    async fn upload_document(&self, file: &UploadFile) -> Result<DocumentUploadResponse, ApiError>;

    /// Liveness probe.
    async fn health(&self) -> Result<HealthResponse, ApiError>;
}
