//! Session controller tests against a scripted in-process service.
//!
//! The fake answers `submit` with a canned response and replays a queue of
//! status answers per file id, recording every call it receives.

use async_trait::async_trait;
use pdf_convert_client::{
    CancelHandle, ClientConfig, ClientError, ConversionProgressCallback, ConversionResult,
    ConversionService, ConversionSession, FileCandidate, IntakeError, Phase, ProgressSnapshot,
    Quality, ResultStatus, SelectedFile, ServiceError, StatusResponse, SubmitOptions,
    SubmitResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedService {
    submit_reply: Mutex<Option<Result<SubmitResponse, ServiceError>>>,
    hang_submit: bool,
    statuses: Mutex<HashMap<String, VecDeque<Result<StatusResponse, ServiceError>>>>,
    status_calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<(Vec<String>, SubmitOptions)>>,
    cancel_on_status: Mutex<Option<CancelHandle>>,
    cancel_on_submit: Mutex<Option<CancelHandle>>,
    status_delay: Option<Duration>,
    in_flight: Mutex<HashMap<String, usize>>,
    peak_in_flight: AtomicUsize,
}

impl ScriptedService {
    fn replying(reply: Result<SubmitResponse, ServiceError>) -> Self {
        Self {
            submit_reply: Mutex::new(Some(reply)),
            ..Default::default()
        }
    }

    fn script(self, file_id: &str, replies: Vec<Result<StatusResponse, ServiceError>>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(file_id.to_string(), replies.into());
        self
    }

    fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversionService for ScriptedService {
    async fn submit(
        &self,
        files: &[SelectedFile],
        options: SubmitOptions,
    ) -> Result<SubmitResponse, ServiceError> {
        self.submitted
            .lock()
            .unwrap()
            .push((files.iter().map(|f| f.name.clone()).collect(), options));
        if let Some(handle) = self.cancel_on_submit.lock().unwrap().as_ref() {
            handle.cancel();
        }
        if self.hang_submit {
            futures::future::pending::<()>().await;
        }
        self.submit_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ServiceError::Network("no reply scripted".into())))
    }

    async fn status(&self, file_id: &str) -> Result<StatusResponse, ServiceError> {
        self.status_calls.lock().unwrap().push(file_id.to_string());
        if let Some(delay) = self.status_delay {
            let now = {
                let mut in_flight = self.in_flight.lock().unwrap();
                let n = in_flight.entry(file_id.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            *self.in_flight.lock().unwrap().get_mut(file_id).unwrap() -= 1;
        }
        if let Some(handle) = self.cancel_on_status.lock().unwrap().as_ref() {
            handle.cancel();
        }
        self.statuses
            .lock()
            .unwrap()
            .get_mut(file_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(status("processing", None)))
    }

    fn download_url(&self, file_id: &str) -> String {
        format!("http://svc.test/download/{file_id}")
    }
}

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
    poll_errors: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
    completions: Mutex<usize>,
}

impl ConversionProgressCallback for Recorder {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(*snapshot);
    }

    fn on_poll_error(&self, file_id: &str, _error: &str) {
        self.poll_errors.lock().unwrap().push(file_id.to_string());
    }

    fn on_conversion_complete(&self, _results: &[ConversionResult]) {
        *self.completions.lock().unwrap() += 1;
    }

    fn on_conversion_failed(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

fn status(s: &str, progress: Option<f64>) -> StatusResponse {
    StatusResponse {
        status: s.to_string(),
        progress,
    }
}

fn result(name: &str, status: &str, file_id: Option<&str>) -> ConversionResult {
    ConversionResult {
        original_name: format!("{name}.pdf"),
        converted_name: format!("{name}.pptx"),
        status: ResultStatus::parse(status),
        size: (status == "success").then_some(4096),
        file_id: file_id.map(str::to_string),
        progress: None,
    }
}

fn accepted(results: Vec<ConversionResult>) -> Result<SubmitResponse, ServiceError> {
    Ok(SubmitResponse {
        status: "success".into(),
        message: None,
        results,
    })
}

fn pdf(name: &str, size: usize) -> FileCandidate {
    let mut content = b"%PDF-1.7\n".to_vec();
    content.resize(size.max(content.len()), b'.');
    FileCandidate::from_bytes(name, content)
}

fn session_with(
    service: Arc<ScriptedService>,
    recorder: Arc<Recorder>,
) -> ConversionSession {
    let config = ClientConfig::builder()
        .poll_interval_ms(5)
        .progress_callback(recorder)
        .build()
        .unwrap();
    ConversionSession::new(service, config)
}

fn names(session: &ConversionSession) -> Vec<String> {
    session.files().iter().map(|f| f.name.clone()).collect()
}

// ── Selection ────────────────────────────────────────────────────────────────

#[test]
fn non_pdf_selection_never_mutates_files() {
    let mut s = session_with(Arc::default(), Arc::default());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s
        .select(vec![FileCandidate::from_bytes("photo.jpg", vec![0xFF, 0xD8])])
        .unwrap_err();
    assert_eq!(err, IntakeError::NoPdfFiles);
    assert_eq!(names(&s), vec!["a.pdf"]);
}

#[test]
fn duplicate_selection_never_mutates_files() {
    let mut s = session_with(Arc::default(), Arc::default());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();

    let err = s.select(vec![pdf("b.pdf", 30), pdf("a.pdf", 20)]).unwrap_err();
    assert_eq!(err, IntakeError::AllDuplicates);
    assert_eq!(names(&s), vec!["a.pdf", "b.pdf"]);
}

#[test]
fn mixed_batch_appends_novel_subset_in_arrival_order() {
    let mut s = session_with(Arc::default(), Arc::default());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let added = s
        .select(vec![pdf("c.pdf", 40), pdf("a.pdf", 20), pdf("b.pdf", 30)])
        .unwrap();
    assert_eq!(added, 2);
    assert_eq!(names(&s), vec!["a.pdf", "c.pdf", "b.pdf"]);
}

#[test]
fn remove_out_of_range_and_valid() {
    let mut s = session_with(Arc::default(), Arc::default());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30), pdf("c.pdf", 40)])
        .unwrap();

    assert!(s.remove(3).is_none());
    assert!(s.remove(usize::MAX).is_none());
    assert_eq!(names(&s), vec!["a.pdf", "b.pdf", "c.pdf"]);

    assert_eq!(s.remove(0).map(|f| f.name), Some("a.pdf".to_string()));
    assert_eq!(names(&s), vec!["b.pdf", "c.pdf"]);
}

#[tokio::test]
async fn confirmed_clear_empties_files_and_results() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![result(
        "a", "success", Some("f1"),
    )])));
    let mut s = session_with(service, Arc::default());

    assert!(!s.clear(|_| true), "clearing nothing is a no-op");

    s.select(vec![pdf("a.pdf", 20)]).unwrap();
    s.convert().await.unwrap();
    assert_eq!(s.results().len(), 1);

    assert!(s.clear(|n| n == 1));
    assert!(s.files().is_empty());
    assert!(s.results().is_empty());
    assert!(!s.controls().can_convert);
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_success_submit_skips_polling() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![
        result("a", "success", Some("f1")),
        result("b", "success", Some("f2")),
    ])));
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();

    let results = s.convert().await.unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(s.phase(), Phase::Done);
    assert!(!s.is_converting());
    assert!(service.status_calls().is_empty());
    let snapshots = recorder.snapshots.lock().unwrap().clone();
    assert_eq!(snapshots, vec![ProgressSnapshot::new(2, 2)]);
    assert_eq!(snapshots[0].percent(), 100);
    assert_eq!(*recorder.completions.lock().unwrap(), 1);
}

#[tokio::test]
async fn submission_carries_files_and_fixed_fields() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![])));
    let mut s = session_with(service.clone(), Arc::default());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();
    s.convert().await.unwrap();

    let submitted = service.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    let (files, options) = &submitted[0];
    assert_eq!(files, &vec!["a.pdf".to_string(), "b.pdf".to_string()]);
    assert_eq!(options.quality, Quality::High);
    assert!(!options.include_notes);
}

#[tokio::test]
async fn polling_queries_only_pending_items_until_all_succeed() {
    let service = ScriptedService::replying(accepted(vec![
        result("a", "success", Some("f1")),
        result("b", "processing", Some("f2")),
        result("c", "pending", Some("f3")),
    ]))
    .script(
        "f2",
        vec![Ok(status("processing", Some(50.0))), Ok(status("completed", Some(100.0)))],
    )
    .script("f3", vec![Ok(status("success", None))]);
    let service = Arc::new(service);
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30), pdf("c.pdf", 40)])
        .unwrap();

    let results = s.convert().await.unwrap();
    assert!(results.iter().all(|r| r.status == ResultStatus::Success));
    assert_eq!(results[1].progress, Some(100.0));

    let mut calls = service.status_calls();
    assert!(!calls.contains(&"f1".to_string()), "succeeded item was polled");
    calls.sort();
    assert_eq!(calls, vec!["f2", "f2", "f3"]);

    let snapshots = recorder.snapshots.lock().unwrap().clone();
    let completed: Vec<usize> = snapshots.iter().map(|s| s.completed).collect();
    assert_eq!(completed, vec![1, 2, 3]);
    for snap in &snapshots {
        let expected = (100.0 * snap.completed as f64 / snap.total as f64).round() as u8;
        assert_eq!(snap.percent(), expected);
    }
    assert_eq!(
        snapshots.iter().map(|s| s.percent()).collect::<Vec<_>>(),
        vec![33, 67, 100]
    );
    assert!(snapshots.last().is_some_and(ProgressSnapshot::is_finished));
    assert!(!snapshots[0].is_finished());
    assert_eq!(s.phase(), Phase::Done);
    assert!(!s.is_converting());
}

#[tokio::test]
async fn poll_errors_are_skipped_and_retried_next_tick() {
    let service = ScriptedService::replying(accepted(vec![result(
        "a",
        "processing",
        Some("f1"),
    )]))
    .script(
        "f1",
        vec![
            Err(ServiceError::Network("reset by peer".into())),
            Ok(status("success", None)),
        ],
    );
    let service = Arc::new(service);
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    s.convert().await.unwrap();

    assert_eq!(service.status_calls(), vec!["f1", "f1"]);
    assert_eq!(recorder.poll_errors.lock().unwrap().clone(), vec!["f1"]);
    assert_eq!(s.results()[0].status, ResultStatus::Success);
}

#[tokio::test]
async fn failed_and_unhandled_items_end_the_round() {
    let service = ScriptedService::replying(accepted(vec![
        result("a", "processing", Some("f1")),
        result("b", "processing", None),
    ]))
    .script("f1", vec![Ok(status("failed", None))]);
    let service = Arc::new(service);
    let mut s = session_with(service.clone(), Arc::default());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();

    let results = s.convert().await.unwrap();
    assert_eq!(results[0].status, ResultStatus::Failed);
    // Never polled: the failure is local, not reported by the service.
    assert_eq!(results[1].status, ResultStatus::Failed);
    assert!(results[1].file_id.is_none());
    assert_eq!(service.status_calls(), vec!["f1"]);
    assert_eq!(s.phase(), Phase::Done);
}

#[tokio::test]
async fn http_500_resets_session_with_server_message() {
    let service = Arc::new(ScriptedService::replying(Err(ServiceError::Http {
        status: 500,
        message: Some("converter crashed".into()),
    })));
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service, recorder.clone());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s.convert().await.unwrap_err();
    assert!(
        matches!(&err, ClientError::SubmissionFailed { message } if message == "converter crashed")
    );
    assert!(s.files().is_empty());
    assert!(s.results().is_empty());
    assert!(!s.is_converting());
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(
        recorder.failures.lock().unwrap().clone(),
        vec!["converter crashed"]
    );
}

#[tokio::test]
async fn error_status_body_resets_session_with_fallback_message() {
    let service = Arc::new(ScriptedService::replying(Ok(SubmitResponse {
        status: "error".into(),
        message: None,
        results: vec![result("a", "pending", Some("f1"))],
    })));
    let mut s = session_with(service.clone(), Arc::default());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s.convert().await.unwrap_err();
    assert_eq!(err.to_string(), "Conversion failed");
    assert!(s.files().is_empty());
    assert!(s.results().is_empty());
    assert!(!s.is_converting());
    assert!(service.status_calls().is_empty());
}

#[tokio::test]
async fn cancel_during_polling_stops_queries_and_clears_results() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![result(
        "a",
        "processing",
        Some("f1"),
    )])));
    let mut s = session_with(service.clone(), Arc::default());
    *service.cancel_on_status.lock().unwrap() = Some(s.cancel_handle());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s.convert().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(s.results().is_empty());
    assert!(s.files().is_empty());
    assert!(!s.is_converting());
    assert_eq!(s.phase(), Phase::Idle);

    let calls_at_reset = service.status_calls().len();
    assert_eq!(calls_at_reset, 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(service.status_calls().len(), calls_at_reset);
    assert!(s.results().is_empty());
}

#[tokio::test]
async fn cancel_racing_final_tick_discards_its_answers() {
    let service = ScriptedService::replying(accepted(vec![result(
        "a",
        "processing",
        Some("f1"),
    )]))
    .script("f1", vec![Ok(status("success", Some(100.0)))]);
    let service = Arc::new(service);
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    *service.cancel_on_status.lock().unwrap() = Some(s.cancel_handle());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s.convert().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(service.status_calls(), vec!["f1"]);
    assert!(s.results().is_empty());
    assert!(s.files().is_empty());
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(*recorder.completions.lock().unwrap(), 0);
}

#[tokio::test]
async fn cancel_arriving_with_submit_reply_skips_fast_path() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![result(
        "a", "success", Some("f1"),
    )])));
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    *service.cancel_on_submit.lock().unwrap() = Some(s.cancel_handle());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let err = s.convert().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(s.results().is_empty());
    assert_eq!(s.phase(), Phase::Idle);
    assert!(recorder.snapshots.lock().unwrap().is_empty());
    assert_eq!(*recorder.completions.lock().unwrap(), 0);
}

#[tokio::test]
async fn cancel_during_upload_resets() {
    let service = Arc::new(ScriptedService {
        hang_submit: true,
        ..Default::default()
    });
    let mut s = session_with(service, Arc::default());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let cancel = s.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    let err = s.convert().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(s.files().is_empty());
    assert_eq!(s.phase(), Phase::Idle);
}

#[tokio::test]
async fn reconvert_after_done_starts_fresh_round() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![result(
        "a", "success", Some("f1"),
    )])));
    let mut s = session_with(service.clone(), Arc::default());
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    s.convert().await.unwrap();
    s.reset();
    assert!(s.files().is_empty());
    assert_eq!(s.phase(), Phase::Idle);

    // A stale cancellation from reset must not abort the next round.
    s.select(vec![pdf("a.pdf", 20)]).unwrap();
    let results = s.convert().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(service.submitted.lock().unwrap().len(), 2);
}

// ── Download ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_target_is_gated_on_file_id() {
    let service = Arc::new(ScriptedService::replying(accepted(vec![
        result("a", "success", Some("f1")),
        result("b", "success", None),
    ])));
    let mut s = session_with(service, Arc::default());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();
    s.convert().await.unwrap();

    let target = s.download_target(0).unwrap();
    assert_eq!(target.url, "http://svc.test/download/f1");
    assert_eq!(target.filename, "a.pptx");

    let before = s.results().to_vec();
    assert!(matches!(
        s.download_target(1),
        Err(ClientError::MissingFileId { index: 1 })
    ));
    assert_eq!(s.results(), before.as_slice());
}

// ── Tick scheduling ──────────────────────────────────────────────────────────

#[tokio::test]
async fn slow_status_queries_never_overlap() {
    let service = ScriptedService {
        status_delay: Some(Duration::from_millis(30)),
        ..ScriptedService::replying(accepted(vec![
            result("a", "processing", Some("f1")),
            result("b", "processing", Some("f2")),
        ]))
    }
    .script(
        "f1",
        vec![Ok(status("processing", None)), Ok(status("success", None))],
    )
    .script(
        "f2",
        vec![
            Ok(status("processing", None)),
            Ok(status("processing", None)),
            Ok(status("success", None)),
        ],
    );
    let service = Arc::new(service);
    let recorder = Arc::new(Recorder::default());
    let mut s = session_with(service.clone(), recorder.clone());
    s.select(vec![pdf("a.pdf", 20), pdf("b.pdf", 30)]).unwrap();

    s.convert().await.unwrap();

    assert_eq!(service.peak_in_flight.load(Ordering::SeqCst), 1);
    let calls = service.status_calls();
    assert_eq!(calls.iter().filter(|c| *c == "f1").count(), 2);
    assert_eq!(calls.iter().filter(|c| *c == "f2").count(), 3);
    // One snapshot when polling starts, then one per completed tick.
    let ticks = recorder.snapshots.lock().unwrap().len() - 1;
    assert_eq!(ticks, 3);
}

#[tokio::test]
async fn zero_poll_interval_from_struct_literal_still_converts() {
    let service = Arc::new(
        ScriptedService::replying(accepted(vec![result("a", "processing", Some("f1"))]))
            .script("f1", vec![Ok(status("success", None))]),
    );
    let config = ClientConfig {
        poll_interval_ms: 0,
        status_concurrency: 0,
        ..ClientConfig::default()
    };
    let mut s = ConversionSession::new(service.clone(), config);
    s.select(vec![pdf("a.pdf", 20)]).unwrap();

    let results = s.convert().await.unwrap();
    assert_eq!(results[0].status, ResultStatus::Success);
    assert_eq!(service.status_calls(), vec!["f1"]);
}
