//! Status polling: serialized ticks with cooperative cancellation.
//!
//! One tick queries every result that still needs it, waits for all of
//! those queries, and only then hands the answers back for the session to
//! apply. The interval is consumed as a stream with
//! [`MissedTickBehavior::Skip`], so a tick that outlives the interval
//! delays the next one instead of overlapping it.

use crate::model::{ConversionResult, StatusResponse};
use crate::error::ServiceError;
use crate::service::ConversionService;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::Stream;

const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Stops an in-flight conversion round from another task.
///
/// Obtain one with [`crate::session::ConversionSession::cancel_handle`].
/// Cancelling resets the session: the round's results are discarded and
/// no further status queries are issued.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation of the current round.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Re-arm for a new round.
    pub(crate) fn rearm(&self) {
        self.tx.send_replace(false);
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Interval ticks for the poll loop; the first tick fires one period from now.
///
/// A zero period is raised to one millisecond.
pub(crate) fn ticks(period: Duration) -> impl Stream<Item = Instant> + Unpin {
    let period = period.max(MIN_TICK_PERIOD);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    IntervalStream::new(interval)
}

/// Outcome of one status query, keyed by the result's index.
pub(crate) type TickUpdate = (usize, String, Result<StatusResponse, ServiceError>);

/// Query every result that needs it, at most `concurrency` at a time.
pub(crate) async fn run_tick(
    service: &dyn ConversionService,
    results: &[ConversionResult],
    concurrency: usize,
) -> Vec<TickUpdate> {
    let targets: Vec<(usize, String)> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.needs_poll())
        .filter_map(|(i, r)| r.file_id.clone().map(|id| (i, id)))
        .collect();

    stream::iter(targets)
        .map(|(idx, file_id)| async move {
            let outcome = service.status(&file_id).await;
            (idx, file_id, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
