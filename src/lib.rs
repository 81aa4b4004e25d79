//! # scarf-client
//!
//! Client for a SCARF document-analysis backend: upload a document, poll the
//! analysis job until it finishes, and render the claims, evidence, gaps and
//! validation questions it produced.
//!
//! ## Flow Overview
//!
//! ```text
//! File
//!  │
//!  ├─ 1. Select   first candidate wins, checked against the accept-list
//!  ├─ 2. Upload   POST /upload (multipart `file`) → job_id
//!  ├─ 3. Poll     GET /status/{job_id} every interval until COMPLETED/FAILED
//!  ├─ 4. View     ReportResult → structure view + critique view + summary
//!  └─ 5. Render   text / Markdown / HTML / JSON
//! ```
//!
//! [`AnalysisSession`] drives these steps as a state machine and publishes a
//! [`UiState`] after every transition; the `analyze*` functions wrap it for
//! callers who only want the result. [`ChatSession`] covers the separate
//! question/answer contract.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scarf_client::{analyze, render, ClientConfig, ReportFormat};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let output = analyze(&[PathBuf::from("paper.pdf")], &config).await?;
//!     println!("{}", render(&output.view, Some(&output.file_name), ReportFormat::Text)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scarf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scarf-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod flow;
pub mod job;
pub mod poller;
pub mod progress;
pub mod render;
pub mod report;
pub mod session;
pub mod upload;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{Backend, HttpBackend, JobStatus, StatusResponse};
pub use chat::{ChatMessage, ChatSession, DocumentUploadStatus, Role};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ApiError, PollError, ScarfError};
pub use flow::{
    analyze, analyze_sync, analyze_to_file, fetch_status, health, render_saved, watch_job, watch_stream,
    JobReport,
};
pub use job::UploadJob;
pub use poller::{JobOutcome, PollEvent, PollHandle};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{render, ReportFormat};
pub use report::ReportResult;
pub use session::{AnalysisOutput, AnalysisSession, Phase, UiState};
pub use upload::UploadFile;
pub use view::{ReportSummary, ReportView};
