//! The conversion session controller.
//!
//! A [`ConversionSession`] owns the selection and the results of one user
//! session and drives them through the phases below. Every command takes
//! `&mut self`, so there is never more than one mutator; the only thing
//! that may act from another task is a [`CancelHandle`].
//!
//! ```text
//!          select/remove/clear
//!   Idle ─────────────────────▶ Idle
//!    │ convert()
//!    ▼
//!  Uploading ──(rejected / network error / cancel)──▶ reset ─▶ Idle
//!    │ all results already succeeded
//!    ├──────────────────────────────────────────────▶ Done
//!    ▼
//!  Polling ──(cancel)──▶ reset ─▶ Idle
//!    │ every result terminal
//!    ▼
//!   Done ──convert()──▶ Uploading
//! ```

pub mod intake;
pub mod poll;

pub use intake::FileCandidate;
pub use poll::CancelHandle;

use crate::config::ClientConfig;
use crate::error::{ClientError, IntakeError};
use crate::model::{ConversionResult, ResultStatus, SelectedFile};
use crate::progress::{ConversionProgressCallback, ProgressSnapshot};
use crate::service::{ConversionService, HttpConversionService, SubmitOptions};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fallback message when a rejected submission carries none.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed";

/// Where the session is in a conversion round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Polling,
    Done,
}

/// Everything a session owns.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub files: Vec<SelectedFile>,
    /// True exactly while a round is in flight.
    pub converting: bool,
    pub results: Vec<ConversionResult>,
}

/// Which commands a front-end should currently offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub can_clear: bool,
    pub can_convert: bool,
}

impl Controls {
    fn for_state(state: &SessionState) -> Self {
        let enabled = !state.files.is_empty() && !state.converting;
        Self {
            can_clear: enabled,
            can_convert: enabled,
        }
    }
}

/// A resolved download: fetch `url` and save it as `filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub filename: String,
}

/// Drives selection, conversion and download for one user session.
pub struct ConversionSession {
    service: Arc<dyn ConversionService>,
    config: ClientConfig,
    state: SessionState,
    phase: Phase,
    cancel: CancelHandle,
}

impl ConversionSession {
    pub fn new(service: Arc<dyn ConversionService>, config: ClientConfig) -> Self {
        Self {
            service,
            config,
            state: SessionState::default(),
            phase: Phase::Idle,
            cancel: CancelHandle::new(),
        }
    }

    /// A session talking HTTP to `config.base_url`.
    pub fn http(config: ClientConfig) -> Result<Self, ClientError> {
        let service = HttpConversionService::new(&config)?;
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.state.files
    }

    pub fn results(&self) -> &[ConversionResult] {
        &self.state.results
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_converting(&self) -> bool {
        self.state.converting
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(&self.state)
    }

    /// A handle that cancels the round in flight from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Add the novel PDFs among `candidates`; returns how many were added.
    ///
    /// Rejects the whole batch, leaving the selection untouched, when it
    /// holds no PDF or only files already selected.
    pub fn select(&mut self, candidates: Vec<FileCandidate>) -> Result<usize, IntakeError> {
        intake::add_files(&mut self.state.files, candidates)
    }

    /// Remove the file at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<SelectedFile> {
        intake::remove_file(&mut self.state.files, index)
    }

    /// Clear files and results once `confirm` agrees.
    ///
    /// `confirm` receives the number of selected files and is not called
    /// when nothing is selected. Returns whether anything was cleared.
    pub fn clear(&mut self, confirm: impl FnOnce(usize) -> bool) -> bool {
        if self.state.files.is_empty() {
            return false;
        }
        if !confirm(self.state.files.len()) {
            debug!("Clear declined");
            return false;
        }
        self.state.files.clear();
        self.state.results.clear();
        info!("Selection cleared");
        true
    }

    /// Drop everything and return to Idle, stopping any polling.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.state = SessionState::default();
        self.phase = Phase::Idle;
        debug!("Session reset");
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Submit every selected file and poll until each result is terminal.
    ///
    /// On success the session is in [`Phase::Done`] and the results are
    /// returned. A rejected submission or a cancellation resets the session
    /// before the error is returned.
    pub async fn convert(&mut self) -> Result<&[ConversionResult], ClientError> {
        if self.state.files.is_empty() {
            return Err(ClientError::NoFilesSelected);
        }

        self.cancel.rearm();
        self.state.converting = true;
        self.state.results.clear();
        self.phase = Phase::Uploading;

        let total_files = self.state.files.len();
        info!("Submitting {} file(s) to {}", total_files, self.config.base_url);
        if let Some(cb) = self.callback() {
            cb.on_conversion_start(total_files);
        }

        let service = Arc::clone(&self.service);
        let cancel = self.cancel.clone();
        let options = SubmitOptions::from_config(&self.config);

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = service.submit(&self.state.files, options) => Some(r),
        };

        // A cancel that lands together with the reply still wins.
        if cancel.is_cancelled() {
            return Err(self.abort_cancelled());
        }

        let response = match submitted {
            None => return Err(self.abort_cancelled()),
            Some(Ok(resp)) if resp.is_success() => resp,
            Some(Ok(resp)) => {
                warn!("Service rejected submission: status={}", resp.status);
                return Err(self.fail(resp.message));
            }
            Some(Err(e)) => {
                warn!("Submission failed: {}", e);
                return Err(self.fail(e.server_message().map(str::to_string)));
            }
        };

        self.state.results = response.results;
        info!("Service accepted {} result(s)", self.state.results.len());
        if let Some(cb) = self.callback() {
            cb.on_upload_complete(&self.state.results);
        }

        if self.state.results.iter().all(|r| r.status.is_success()) {
            debug!("Every result already succeeded; skipping polling");
            let total = self.state.results.len();
            self.report_progress(ProgressSnapshot::new(total, total));
            self.finish();
            return Ok(&self.state.results);
        }

        // Without a handle a pending result could never leave Pending.
        for r in self.state.results.iter_mut() {
            if !r.status.is_terminal() && r.file_id.is_none() {
                warn!(
                    file = %r.original_name,
                    reported = %r.status,
                    "Service returned no file id for an unfinished result; \
                     it cannot be polled and is marked failed locally"
                );
                r.status = ResultStatus::Failed;
            }
        }

        self.phase = Phase::Polling;
        self.report_progress(self.snapshot());

        let mut ticks = poll::ticks(self.config.poll_interval());
        let concurrency = self.config.status_concurrency;

        while !self.all_terminal() {
            let results = &self.state.results;
            let tick = async {
                ticks.next().await;
                poll::run_tick(service.as_ref(), results, concurrency).await
            };

            let updates = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                u = tick => Some(u),
            };

            // A tick that completed alongside the cancel is dropped unapplied.
            let Some(updates) = updates.filter(|_| !cancel.is_cancelled()) else {
                return Err(self.abort_cancelled());
            };
            self.apply_updates(updates);
            self.report_progress(self.snapshot());
        }

        self.finish();
        Ok(&self.state.results)
    }

    // ── Download ─────────────────────────────────────────────────────────

    /// Resolve the download for result `index`.
    ///
    /// Fails with [`ClientError::MissingFileId`] when the result has no
    /// file id. Nothing in the session changes either way.
    pub fn download_target(&self, index: usize) -> Result<DownloadTarget, ClientError> {
        let Some((result, file_id)) = self
            .state
            .results
            .get(index)
            .and_then(|r| r.file_id.as_deref().map(|id| (r, id)))
        else {
            warn!("No file id for result #{}; download skipped", index);
            return Err(ClientError::MissingFileId { index });
        };

        let filename = if result.converted_name.trim().is_empty() {
            self.config.default_download_name.clone()
        } else {
            result.converted_name.clone()
        };

        Ok(DownloadTarget {
            url: self.service.download_url(file_id),
            filename,
        })
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn callback(&self) -> Option<&Arc<dyn ConversionProgressCallback>> {
        self.config.progress_callback.as_ref()
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let completed = self
            .state
            .results
            .iter()
            .filter(|r| r.status.is_success())
            .count();
        ProgressSnapshot::new(completed, self.state.results.len())
    }

    fn all_terminal(&self) -> bool {
        self.state.results.iter().all(|r| r.status.is_terminal())
    }

    fn report_progress(&self, snapshot: ProgressSnapshot) {
        debug!("{} {}%", snapshot.label(), snapshot.percent());
        if let Some(cb) = self.callback() {
            cb.on_progress(&snapshot);
        }
    }

    fn apply_updates(&mut self, updates: Vec<poll::TickUpdate>) {
        for (idx, file_id, outcome) in updates {
            match outcome {
                Ok(update) => {
                    if let Some(r) = self.state.results.get_mut(idx) {
                        r.apply_status(&update);
                        debug!("Status of {}: {}", file_id, r.status);
                    }
                }
                Err(e) => {
                    warn!("Status query for {} failed: {}", file_id, e);
                    if let Some(cb) = self.callback() {
                        cb.on_poll_error(&file_id, &e.to_string());
                    }
                }
            }
        }
    }

    fn finish(&mut self) {
        self.state.converting = false;
        self.phase = Phase::Done;
        let succeeded = self
            .state
            .results
            .iter()
            .filter(|r| r.status.is_success())
            .count();
        info!(
            "Conversion complete: {}/{} succeeded",
            succeeded,
            self.state.results.len()
        );
        if let Some(cb) = self.callback() {
            cb.on_conversion_complete(&self.state.results);
        }
    }

    fn fail(&mut self, message: Option<String>) -> ClientError {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        self.reset();
        if let Some(cb) = self.callback() {
            cb.on_conversion_failed(&message);
        }
        ClientError::SubmissionFailed { message }
    }

    fn abort_cancelled(&mut self) -> ClientError {
        info!("Conversion cancelled; resetting session");
        self.reset();
        ClientError::Cancelled
    }
}
