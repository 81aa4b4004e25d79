//! File selection: turn a user's candidate files into one upload payload.
//!
//! A drop or picker selection may carry several files; exactly one is sent
//! per submission and the first one wins. The only client-side check is the
//! declared accept-list (by extension, case-insensitive). Size and content are
//! left for the backend to judge.

use crate::error::ScarfError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file read into memory and ready for a multipart `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    /// Name sent in the multipart `filename` parameter.
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Pick the first candidate; the rest are ignored.
pub fn select_first(files: &[PathBuf]) -> Result<&Path, ScarfError> {
    let first = files.first().ok_or(ScarfError::NoFileSelected)?;
    if files.len() > 1 {
        debug!("{} files selected; keeping '{}'", files.len(), first.display());
    }
    Ok(first)
}

/// Check `path` against an accept-list such as `[".pdf"]`.
///
/// An empty list accepts everything.
pub fn is_accepted(path: &Path, accept: &[String]) -> bool {
    if accept.is_empty() {
        return true;
    }
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return false,
    };
    accept
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

/// Content type for the multipart part, from the extension.
pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Select the first of `files`, validate it and read it into memory.
pub async fn prepare(files: &[PathBuf], accept: &[String]) -> Result<UploadFile, ScarfError> {
    let path = select_first(files)?.to_path_buf();

    if !is_accepted(&path, accept) {
        return Err(ScarfError::NotAccepted {
            path,
            accept: accept.join(", "),
        });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScarfError::FileNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScarfError::PermissionDenied { path });
        }
        Err(e) => return Err(ScarfError::ReadFailed { path, source: e }),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    info!("Prepared '{}' ({} bytes)", file_name, bytes.len());

    Ok(UploadFile {
        mime: mime_for(&path).to_string(),
        path,
        file_name,
        bytes,
    })
}
