//! Fetching converted files to disk.
//!
//! The session only resolves *what* to download ([`DownloadTarget`]); this
//! module performs the transfer. Bodies are streamed into a temp file in the
//! destination directory and renamed into place, so an interrupted transfer
//! never leaves a truncated file under the final name.

use crate::config::DEFAULT_DOWNLOAD_NAME;
use crate::error::ClientError;
use crate::session::DownloadTarget;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters that are unsafe in a filename on any mainstream platform.
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).unwrap());

/// Make a server- or user-supplied name safe to use as a single path component.
///
/// Falls back to [`DEFAULT_DOWNLOAD_NAME`] when nothing usable remains.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_");
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Download `target` into `dir`, returning the written path.
pub async fn save_to_dir(
    client: &Client,
    target: &DownloadTarget,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, ClientError> {
    let dir = dir.as_ref();
    let path = dir.join(sanitize_filename(&target.filename));
    let download_failed = |reason: String| ClientError::DownloadFailed {
        url: target.url.clone(),
        reason,
    };
    let write_failed = |source: std::io::Error| ClientError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;

    debug!("GET {}", target.url);
    let response = client
        .get(&target.url)
        .send()
        .await
        .map_err(|e| download_failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| download_failed(e.to_string()))?;
        tmp.write_all(&chunk).map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    tmp.flush().map_err(write_failed)?;
    tmp.persist(&path).map_err(|e| write_failed(e.error))?;

    info!("Saved {} ({} bytes)", path.display(), written);
    Ok(path)
}
