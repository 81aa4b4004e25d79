//! Configuration types for talking to the analysis backend.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. There are no config files: the CLI maps its flags
//! (and their `SCARF_*` environment variables) onto the builder, and library
//! callers set only what they care about.

use crate::error::ScarfError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Interval between two status requests.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Floor for the poll interval, whichever way the config was built.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Configuration for a client session.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use scarf_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://analysis.internal:8000")
///     .poll_interval_ms(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend base URL. Default: `http://localhost:8000`.
    ///
    /// Job endpoints live at `{base}/upload` and `{base}/status/{id}`, the chat
    /// endpoints at `{base}/api/query` and `{base}/api/upload`.
    pub base_url: String,

    /// Milliseconds between status requests. Default: 2000.
    ///
    /// The first request is issued one interval after polling starts.
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 30.
    ///
    /// Uploads of large documents go through the same client, so keep this
    /// comfortably above the expected upload time.
    pub request_timeout_secs: u64,

    /// Stop polling after this many status requests. Default: None (poll
    /// until the backend reports a terminal status).
    pub max_polls: Option<u32>,

    /// Accepted file extensions, e.g. `[".pdf"]`. Empty accepts everything.
    pub accept: Vec<String>,

    /// Receives upload and polling events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: 30,
            max_polls: None,
            accept: vec![".pdf".to_string()],
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_polls", &self.max_polls)
            .field("accept", &self.accept)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(MIN_POLL_INTERVAL_MS);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn max_polls(mut self, n: Option<u32>) -> Self {
        self.config.max_polls = n;
        self
    }

    pub fn accept<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accept = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ScarfError> {
        let c = &self.config;
        let url = Url::parse(&c.base_url).map_err(|e| {
            ScarfError::InvalidConfig(format!("base URL '{}' is not a valid URL: {e}", c.base_url))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScarfError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ScarfError::InvalidConfig(
                "Poll interval must be ≥ 10ms".into(),
            ));
        }
        if c.max_polls == Some(0) {
            return Err(ScarfError::InvalidConfig(
                "max_polls must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}
