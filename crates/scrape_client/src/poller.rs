//! Status polling task.
//!
//! [`status_updates`] is a finite stream: one item per fetch, ending right
//! after the first terminal record. Whether to fetch again is decided by the
//! [`PollerState`] machine on every tick, never by a status captured earlier.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, Stream, StreamExt};
use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use scrape_core::{Job, JobId, PollTransition, PollerState};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{ClientEvent, EventSink, ScrapeApi, StatusUpdate};

struct PollLoop {
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    period: Duration,
    ticker: Option<Interval>,
    machine: PollerState,
}

impl PollLoop {
    async fn next_update(&mut self) -> Option<StatusUpdate> {
        self.machine.begin();
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        while self.machine.should_fetch() {
            ticker.tick().await;
            monitor_debug!("Fetching status for {}", self.job_id);
            match self.api.job_status(&self.job_id).await {
                Ok(job) => match self.machine.observe(job.status) {
                    PollTransition::Settled(_) => return Some(StatusUpdate::Settled(job)),
                    // A backward move leaves the last status in place; skip it.
                    PollTransition::Continue if self.machine.last_status() == Some(job.status) => {
                        return Some(StatusUpdate::Snapshot(job))
                    }
                    PollTransition::Continue | PollTransition::Ignored => {}
                },
                Err(err) => {
                    self.machine.observe_failure();
                    return Some(StatusUpdate::FetchFailed(err));
                }
            }
        }
        None
    }
}

/// Polls `job_id` every `period` (first fetch immediately) until it settles.
pub fn status_updates(
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    period: Duration,
) -> impl Stream<Item = StatusUpdate> + Send {
    let state = PollLoop {
        api,
        job_id,
        period,
        ticker: None,
        machine: PollerState::new(),
    };
    stream::unfold(state, |mut state| async move {
        let update = state.next_update().await?;
        Some((update, state))
    })
}

/// Drives [`status_updates`] into `sink` until settlement or cancellation.
///
/// Returns the terminal job record, or `None` if cancelled first.
pub async fn run_status_poller(
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    period: Duration,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) -> Option<Job> {
    let updates = status_updates(api, job_id.clone(), period);
    futures_util::pin_mut!(updates);

    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => {
                monitor_debug!("Status poller for {} cancelled", job_id);
                return None;
            }
            update = updates.next() => update?,
        };

        let settled = match &update {
            StatusUpdate::Settled(job) => {
                monitor_info!("Job {} settled as {}", job_id, job.status);
                Some(job.clone())
            }
            StatusUpdate::FetchFailed(err) => {
                monitor_warn!("Status fetch for {} failed: {}", job_id, err);
                None
            }
            StatusUpdate::Snapshot(_) => None,
        };
        sink.emit(ClientEvent::Status {
            job_id: job_id.clone(),
            update,
        });
        if settled.is_some() {
            return settled;
        }
    }
}
