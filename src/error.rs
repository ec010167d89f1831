//! Error types for the pdf-convert-client library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ClientError`]: a session command could not complete (bad config,
//!   nothing selected, the submission was rejected, a download is missing
//!   its handle). Submission failures also reset the session.
//!
//! * [`ServiceError`]: a single call to the conversion service failed.
//!   During polling these are **non-fatal**: the item is skipped for that
//!   tick and the loop carries on.
//!
//! * [`IntakeError`]: a selection was rejected as a whole. This is a
//!   warning for the user; the session is left untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::session::ConversionSession`] commands and the
/// download helpers.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Command preconditions ─────────────────────────────────────────────
    /// `convert()` was called with an empty selection.
    #[error("No files selected for conversion")]
    NoFilesSelected,

    /// The result at `index` has no file id, or there is no such result.
    #[error("Result #{index} has no file id; nothing to download")]
    MissingFileId { index: usize },

    // ── Submission ────────────────────────────────────────────────────────
    /// The service rejected the batch or could not be reached.
    ///
    /// The session has already been reset when this is returned.
    #[error("{message}")]
    SubmissionFailed { message: String },

    /// The round was cancelled through a [`crate::session::CancelHandle`].
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Files ─────────────────────────────────────────────────────────────
    /// A file picked for selection could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A converted file could not be fetched.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// A converted file could not be written to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A failed call to the conversion service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    /// No response arrived (connection refused, reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The body was not the JSON shape the service promises.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// The server-supplied message, if the service sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ServiceError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ServiceError::Http {
                status: status.as_u16(),
                message: None,
            }
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

/// Why a selection was rejected without changing the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    /// None of the candidates was a PDF.
    #[error("Please select PDF files only")]
    NoPdfFiles,

    /// Every PDF candidate is already in the selection.
    #[error("Selected files are already in the list")]
    AllDuplicates,
}
