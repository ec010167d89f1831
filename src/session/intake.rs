//! File intake: turning candidates into selection entries.
//!
//! Candidates are filtered in two passes: first by media type, then by the
//! `(name, size)` identity against what is already selected. Each pass that
//! empties the batch rejects the whole call so the caller can warn the user.

use crate::error::{ClientError, IntakeError};
use crate::model::{SelectedFile, PDF_MEDIA_TYPE};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// A file offered for selection (browse or drop) but not yet accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

impl FileCandidate {
    /// Build a candidate from in-memory bytes, sniffing the media type.
    pub fn from_bytes(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = sniff_media_type(&name, &content).to_string();
        Self {
            size: content.len() as u64,
            name,
            media_type,
            content,
        }
    }

    /// Read a local file into a candidate.
    ///
    /// The candidate's name is the file name without its directory.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read candidate {} ({} bytes)", name, content.len());
        Ok(Self::from_bytes(name, content))
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

impl From<FileCandidate> for SelectedFile {
    fn from(c: FileCandidate) -> Self {
        SelectedFile {
            name: c.name,
            size: c.size,
            media_type: c.media_type,
            content: c.content,
        }
    }
}

/// `application/pdf` for a `.pdf` extension or `%PDF` magic bytes.
fn sniff_media_type(name: &str, content: &[u8]) -> &'static str {
    let has_pdf_ext = Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf_ext || content.starts_with(b"%PDF") {
        PDF_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}

/// Append the novel PDF candidates to `files`, returning how many were added.
pub(crate) fn add_files(
    files: &mut Vec<SelectedFile>,
    candidates: Vec<FileCandidate>,
) -> Result<usize, IntakeError> {
    let offered = candidates.len();
    let pdfs: Vec<FileCandidate> = candidates.into_iter().filter(FileCandidate::is_pdf).collect();
    if pdfs.is_empty() {
        warn!("Rejected selection of {} file(s): no PDFs", offered);
        return Err(IntakeError::NoPdfFiles);
    }

    let mut seen: HashSet<(String, u64)> = files
        .iter()
        .map(|f| (f.name.clone(), f.size))
        .collect();
    let fresh: Vec<SelectedFile> = pdfs
        .into_iter()
        .filter(|c| seen.insert((c.name.clone(), c.size)))
        .map(SelectedFile::from)
        .collect();

    if fresh.is_empty() {
        warn!("Rejected selection: every PDF is already selected");
        return Err(IntakeError::AllDuplicates);
    }

    let added = fresh.len();
    files.extend(fresh);
    debug!("Selected {} new file(s), {} total", added, files.len());
    Ok(added)
}

/// Remove the entry at `index`; out of range is a no-op.
pub(crate) fn remove_file(files: &mut Vec<SelectedFile>, index: usize) -> Option<SelectedFile> {
    if index < files.len() {
        Some(files.remove(index))
    } else {
        debug!("Ignoring remove of index {} ({} selected)", index, files.len());
        None
    }
}
