//! `reqwest` implementation of [`Backend`].
//!
//! ## URL construction
//!
//! Endpoints are built by appending path segments to the configured base URL
//! rather than by string concatenation, so a base with a path prefix
//! (`https://host/scarf/`) works and a job id containing `/` or `?` is
//! percent-encoded instead of changing the route.

use crate::api::types::{
    DocumentUploadResponse, ErrorDetail, HealthResponse, QueryAnswer, QueryRequest,
    StatusResponse, UploadResponse,
};
use crate::api::Backend;
use crate::config::ClientConfig;
use crate::error::{ApiError, ScarfError};
use crate::upload::UploadFile;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the analysis backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Build a client from the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ScarfError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ScarfError::InvalidConfig(format!("base URL '{}': {e}", config.base_url))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScarfError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `segments` below the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn multipart(file: &UploadFile) -> Result<Form, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ApiError::Transport(format!("invalid content type '{}': {e}", file.mime)))?;
        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        let url = self.endpoint(&["upload"])?;
        debug!("POST {} ({} bytes)", url, file.bytes.len());
        let form = Self::multipart(file)?;
        send_json(self.client.post(url).multipart(form)).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.endpoint(&["status", job_id])?;
        debug!("GET {}", url);
        send_json(self.client.get(url)).await
    }

    async fn query(&self, question: &str) -> Result<QueryAnswer, ApiError> {
        let url = self.endpoint(&["api", "query"])?;
        debug!("POST {}", url);
        let body = QueryRequest {
            question: question.to_string(),
        };
        send_json(self.client.post(url).json(&body)).await
    }

    async fn upload_document(&self, file: &UploadFile) -> Result<DocumentUploadResponse, ApiError> {
        let url = self.endpoint(&["api", "upload"])?;
        debug!("POST {} ({} bytes)", url, file.bytes.len());
        let form = Self::multipart(file)?;
        send_json(self.client.post(url).multipart(form)).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.endpoint(&["health"])?;
        send_json(self.client.get(url)).await
    }
}

/// Send a request and decode a 2xx JSON body into `T`.
///
/// Non-2xx responses become [`ApiError::Status`], picking up FastAPI's
/// `detail` field when the body has one.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Transport(format!("request timed out: {e}"))
        } else {
            ApiError::Transport(e.to_string())
        }
    })?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorDetail>(&body)
            .ok()
            .map(|d| d.message());
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
