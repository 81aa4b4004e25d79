//! One-call entry points over the HTTP backend.
//!
//! These wrap [`AnalysisSession`] and the poller for callers that want a
//! result, not a state machine to observe: submit a file and wait, watch a
//! job someone else started, fetch a single status, render a saved payload.

use crate::api::{Backend, HealthResponse, HttpBackend};
use crate::config::ClientConfig;
use crate::error::ScarfError;
use crate::job::UploadJob;
use crate::poller::{self, JobOutcome, PollEventStream};
use crate::render::{self, ReportFormat};
use crate::report::ReportResult;
use crate::session::{AnalysisOutput, AnalysisSession};
use crate::view::ReportView;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A terminal job and its rendered report.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: UploadJob,
    pub report: ReportResult,
    pub view: ReportView,
}

/// Upload the first of `files`, poll until the job finishes and build the
/// report view.
///
/// # Errors
/// See [`AnalysisSession::submit`].
pub async fn analyze(files: &[PathBuf], config: &ClientConfig) -> Result<AnalysisOutput, ScarfError> {
    AnalysisSession::connect(config.clone())?.submit(files).await
}

/// Analyze and write the rendered report to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    files: &[PathBuf],
    output_path: impl AsRef<Path>,
    format: ReportFormat,
    config: &ClientConfig,
) -> Result<AnalysisOutput, ScarfError> {
    let output = analyze(files, config).await?;
    let rendered = render::render(&output.view, Some(&output.file_name), format)?;
    write_atomic(output_path.as_ref(), &rendered).await?;
    Ok(output)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(files: &[PathBuf], config: &ClientConfig) -> Result<AnalysisOutput, ScarfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScarfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(files, config))
}

/// A single status request, no polling.
pub async fn fetch_status(job_id: &str, config: &ClientConfig) -> Result<UploadJob, ScarfError> {
    let backend = HttpBackend::new(config)?;
    let response = backend
        .status(job_id)
        .await
        .map_err(|source| ScarfError::RequestFailed {
            endpoint: format!("/status/{job_id}"),
            source,
        })?;
    let mut job = UploadJob::new(job_id);
    job.apply(response);
    Ok(job)
}

/// Poll a job that was started elsewhere until it finishes.
pub async fn watch_job(job_id: &str, config: &ClientConfig) -> Result<JobReport, ScarfError> {
    let backend = Arc::new(HttpBackend::new(config)?);
    match poller::spawn(backend, job_id, config).join().await? {
        JobOutcome::Completed(job) => job_report(job),
        JobOutcome::Failed(job) => Err(ScarfError::JobFailed {
            job_id: job.job_id,
            error: job.error.unwrap_or_default(),
        }),
    }
}

/// Poll a job, yielding every status and error as it happens.
///
/// The stream ends after the terminal status; dropping it stops polling.
pub fn watch_stream(job_id: &str, config: &ClientConfig) -> Result<PollEventStream, ScarfError> {
    let backend = Arc::new(HttpBackend::new(config)?);
    Ok(poller::spawn(backend, job_id, config).into_stream())
}

/// Turn a completed job into its report.
pub fn job_report(job: UploadJob) -> Result<JobReport, ScarfError> {
    let report = ReportResult::from_payload(job.result.as_ref()).map_err(|e| {
        ScarfError::InvalidResult {
            job_id: job.job_id.clone(),
            detail: e.to_string(),
        }
    })?;
    let view = ReportView::build(&report);
    Ok(JobReport { job, report, view })
}

/// Render a saved `result` payload (or a whole status response carrying one).
pub fn render_saved(json: &str, document: Option<&str>, format: ReportFormat) -> Result<String, ScarfError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| ScarfError::InvalidResult {
        job_id: "<saved>".into(),
        detail: e.to_string(),
    })?;
    let payload = match value.get("result") {
        Some(inner) if value.get("status").is_some() => inner,
        _ => &value,
    };
    let report = ReportResult::from_payload(Some(payload)).map_err(|e| ScarfError::InvalidResult {
        job_id: "<saved>".into(),
        detail: e.to_string(),
    })?;
    render::render(&ReportView::build(&report), document, format)
}

/// Liveness probe.
pub async fn health(config: &ClientConfig) -> Result<HealthResponse, ScarfError> {
    let backend = HttpBackend::new(config)?;
    backend.health().await.map_err(|source| ScarfError::RequestFailed {
        endpoint: "/health".into(),
        source,
    })
}

/// Write `contents` to `path` through a sibling temp file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), ScarfError> {
    let write_err = |e| ScarfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
