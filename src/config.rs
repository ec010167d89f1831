//! Configuration types for a conversion session.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The defaults reproduce the behaviour the
//! conversion service expects from its own web front-end: high quality,
//! no speaker notes, a status poll every two seconds.

use crate::error::ClientError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default service endpoint when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Suggested filename when the service does not name a converted file.
pub const DEFAULT_DOWNLOAD_NAME: &str = "converted_file";

/// Configuration for a [`crate::session::ConversionSession`].
///
/// # Example
/// ```rust
/// use pdf_convert_client::{ClientConfig, Quality};
///
/// let config = ClientConfig::builder()
///     .base_url("https://convert.example.com/api")
///     .quality(Quality::Medium)
///     .poll_interval_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_interval().as_millis(), 500);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the conversion service; `/convert`, `/status/{id}` and
    /// `/download/{id}` are resolved beneath it.
    pub base_url: String,

    /// `quality` form field sent with every submission. Default: high.
    pub quality: Quality,

    /// `includeNotes` form field sent with every submission. Default: false.
    pub include_notes: bool,

    /// Delay between status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Maximum status queries in flight during one poll tick. Default: 8.
    pub status_concurrency: usize,

    /// Per-request timeout in seconds. Default: None (wait indefinitely).
    ///
    /// Without a timeout a hung status query stalls its tick; the next tick
    /// only starts once it returns.
    pub request_timeout_secs: Option<u64>,

    /// Filename offered when a result has no converted name.
    pub default_download_name: String,

    /// Optional observer for conversion events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            quality: Quality::default(),
            include_notes: false,
            poll_interval_ms: 2000,
            status_concurrency: 8,
            request_timeout_secs: None,
            default_download_name: DEFAULT_DOWNLOAD_NAME.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("quality", &self.quality)
            .field("include_notes", &self.include_notes)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("status_concurrency", &self.status_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_download_name", &self.default_download_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
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

    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn include_notes(mut self, v: bool) -> Self {
        self.config.include_notes = v;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn status_concurrency(mut self, n: usize) -> Self {
        self.config.status_concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn default_download_name(mut self, name: impl Into<String>) -> Self {
        self.config.default_download_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let c = &self.config;
        let url = reqwest::Url::parse(&c.base_url).map_err(|e| {
            ClientError::InvalidConfig(format!("base URL '{}' is invalid: {e}", c.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "Poll interval must be ≥ 1 ms".into(),
            ));
        }
        if c.status_concurrency == 0 {
            return Err(ClientError::InvalidConfig(
                "Status concurrency must be ≥ 1".into(),
            ));
        }
        if c.default_download_name.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "Default download name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output quality requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    /// (default)
    #[default]
    High,
}

impl Quality {
    /// The form-field value the service understands.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
