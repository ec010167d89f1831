//! Data model shared by the session, the service client and the renderers.
//!
//! The wire types ([`SubmitResponse`], [`StatusResponse`], [`ConversionResult`])
//! mirror the conversion service's camelCase JSON exactly; everything else is
//! owned by the client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media type accepted by intake.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A file accepted into the selection.
///
/// Two files are the same selection entry when both `name` and `size` match.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl SelectedFile {
    /// The `(name, size)` pair used for deduplication.
    pub fn key(&self) -> (&str, u64) {
        (&self.name, self.size)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Conversion status of one submitted file.
///
/// The service reports free-form strings; anything that is neither a
/// success nor a failure keyword is treated as still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl ResultStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "completed" => ResultStatus::Success,
            "failed" | "error" => ResultStatus::Failed,
            _ => ResultStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::Success => "success",
            ResultStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultStatus::Success)
    }

    /// No further status change is expected.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::Pending)
    }
}

impl From<String> for ResultStatus {
    fn from(s: String) -> Self {
        ResultStatus::parse(&s)
    }
}

impl From<ResultStatus> for String {
    fn from(s: ResultStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per submitted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub converted_name: String,
    /// Last status reported by the service, except that an unfinished
    /// result arriving without a `file_id` is set to
    /// [`ResultStatus::Failed`] by the session, since it can never be polled.
    #[serde(default)]
    pub status: ResultStatus,
    /// Output size in bytes; known only after success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Opaque handle used for status queries and downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Last progress value reported by a status query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl ConversionResult {
    /// Whether the poll loop should ask about this result.
    pub fn needs_poll(&self) -> bool {
        !self.status.is_terminal() && self.file_id.is_some()
    }

    /// Apply a status-query response in place.
    pub fn apply_status(&mut self, update: &StatusResponse) {
        self.status = ResultStatus::parse(&update.status);
        if update.progress.is_some() {
            self.progress = update.progress;
        }
    }
}

/// Body of `POST /convert`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<ConversionResult>,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Body of `GET /status/{fileId}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}
