//! # pdf-convert-client
//!
//! Submit PDF files to a remote conversion service, follow each file's
//! conversion status, and download the converted outputs.
//!
//! ## Session Overview
//!
//! ```text
//! select ──▶ convert ──────────────────────────────▶ download
//! (dedupe)    ├─ 1. Upload  one multipart POST /convert
//!             ├─ 2. Poll    GET /status/{id} every interval
//!             └─ 3. Done    every result success or failed
//! ```
//!
//! A [`ConversionSession`] owns the selection and the results. It is driven
//! by explicit commands (`select`, `remove`, `clear`, `convert`, `reset`,
//! `download_target`), and the only concurrent actor is a [`CancelHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_convert_client::{ClientConfig, ConversionSession, FileCandidate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000/api")
//!         .build()?;
//!     let mut session = ConversionSession::http(config)?;
//!
//!     session.select(vec![FileCandidate::from_path("slides.pdf").await?])?;
//!     for result in session.convert().await? {
//!         println!("{} → {} ({})", result.original_name, result.converted_name, result.status);
//!     }
//!     let target = session.download_target(0)?;
//!     println!("fetch {} as {}", target.url, target.filename);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfconv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-convert-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod download;
pub mod error;
pub mod format;
pub mod model;
pub mod progress;
pub mod render;
pub mod service;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, Quality};
pub use download::{sanitize_filename, save_to_dir};
pub use error::{ClientError, IntakeError, ServiceError};
pub use format::{escape_html, format_file_size};
pub use model::{ConversionResult, ResultStatus, SelectedFile, StatusResponse, SubmitResponse};
pub use progress::{
    ConversionProgressCallback, NoopProgressCallback, ProgressCallback, ProgressSnapshot,
};
pub use render::{render_results_html, render_selection_html};
pub use service::{ConversionService, HttpConversionService, SubmitOptions};
pub use session::{
    CancelHandle, ConversionSession, Controls, DownloadTarget, FileCandidate, Phase, SessionState,
};
