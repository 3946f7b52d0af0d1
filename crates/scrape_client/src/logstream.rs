//! Live log stream for one job.
//!
//! [`log_events`] never ends on its own unless the reconnect policy gives up:
//! a dropped channel is reported, then re-opened with exponential backoff.
//! Connection state changes are part of the stream so observers can show
//! them instead of silently losing history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, Stream, StreamExt};
use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use scrape_core::{ConnectionState, JobId, LogRecord};
use tokio_util::sync::CancellationToken;

use crate::api::ByteStream;
use crate::sse::{SseDecoder, SseEvent};
use crate::{
    ApiError, ClientEvent, EventSink, FailureKind, LogEvent, ParseError, ReconnectPolicy,
    ScrapeApi,
};

/// Decodes one event payload into a record.
pub fn parse_record(event: &SseEvent) -> Result<LogRecord, ParseError> {
    if event.data.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(&event.data).map_err(|err| ParseError::Json(err.to_string()))
}

struct LogStream {
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    policy: ReconnectPolicy,
    body: Option<ByteStream>,
    decoder: SseDecoder,
    pending: VecDeque<LogEvent>,
    /// Consecutive attempts that produced no record.
    failures: u32,
    base_delay: Duration,
    delay: Duration,
    wait: Option<Duration>,
    delivered_on_connection: bool,
    finished: bool,
}

impl LogStream {
    fn new(api: Arc<dyn ScrapeApi>, job_id: JobId, policy: ReconnectPolicy) -> Self {
        let base_delay = policy.bounded(policy.initial_delay);
        let mut pending = VecDeque::new();
        pending.push_back(LogEvent::Connection(ConnectionState::Connecting));
        Self {
            api,
            job_id,
            policy,
            body: None,
            decoder: SseDecoder::new(),
            pending,
            failures: 0,
            base_delay,
            delay: base_delay,
            wait: None,
            delivered_on_connection: false,
            finished: false,
        }
    }

    async fn next_event(&mut self) -> Option<LogEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            match self.body.as_mut() {
                Some(body) => match body.next().await {
                    Some(Ok(chunk)) => self.decode(&chunk),
                    Some(Err(err)) => self.connection_lost(err),
                    None => self.connection_lost(ApiError::new(
                        FailureKind::Network,
                        "log stream closed by server",
                    )),
                },
                None => self.connect().await,
            }
        }
    }

    fn decode(&mut self, chunk: &[u8]) {
        for event in self.decoder.feed(chunk) {
            if let Some(ms) = event.retry {
                self.base_delay = self.policy.bounded(Duration::from_millis(ms));
            }
            match parse_record(&event) {
                Ok(record) => {
                    if !self.delivered_on_connection {
                        self.delivered_on_connection = true;
                        self.failures = 0;
                        self.delay = self.base_delay;
                    }
                    self.pending.push_back(LogEvent::Record(record));
                }
                Err(err) => self.pending.push_back(LogEvent::Malformed(err)),
            }
        }
    }

    async fn connect(&mut self) {
        if let Some(wait) = self.wait.take() {
            tokio::time::sleep(wait).await;
            self.pending
                .push_back(LogEvent::Connection(ConnectionState::Connecting));
        }
        let last_event_id = self.decoder.last_event_id().map(str::to_owned);
        match self
            .api
            .open_logs(&self.job_id, last_event_id.as_deref())
            .await
        {
            Ok(body) => {
                monitor_info!("Log stream for {} open", self.job_id);
                self.body = Some(body);
                self.delivered_on_connection = false;
                self.pending
                    .push_back(LogEvent::Connection(ConnectionState::Open));
            }
            Err(err) => self.connection_lost(err),
        }
    }

    fn connection_lost(&mut self, err: ApiError) {
        monitor_warn!("Log stream for {} dropped: {}", self.job_id, err);
        if self.decoder.pending_bytes() > 0 {
            monitor_debug!(
                "Discarding {} bytes of a partial event",
                self.decoder.pending_bytes()
            );
        }
        self.body = None;
        self.decoder.reset();
        self.pending.push_back(LogEvent::Dropped(err));

        self.failures += 1;
        if !self.policy.allows_attempt(self.failures) {
            monitor_warn!(
                "Giving up on log stream for {} after {} attempts",
                self.job_id,
                self.failures - 1
            );
            self.pending
                .push_back(LogEvent::Connection(ConnectionState::Closed));
            self.finished = true;
            return;
        }

        let delay = self.delay;
        self.delay = self.policy.next_delay(delay);
        self.wait = Some(delay);
        self.pending
            .push_back(LogEvent::Connection(ConnectionState::Retrying {
                attempt: self.failures,
                delay_ms: delay.as_millis() as u64,
            }));
    }
}

/// Streams log events for `job_id`, reconnecting per `policy`.
pub fn log_events(
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    policy: ReconnectPolicy,
) -> impl Stream<Item = LogEvent> + Send {
    stream::unfold(LogStream::new(api, job_id, policy), |mut state| async move {
        let event = state.next_event().await?;
        Some((event, state))
    })
}

/// Drives [`log_events`] into `sink` until cancelled or the policy gives up.
///
/// Dropping the stream on cancellation closes the HTTP connection.
pub async fn run_log_stream(
    api: Arc<dyn ScrapeApi>,
    job_id: JobId,
    policy: ReconnectPolicy,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    let events = log_events(api, job_id.clone(), policy);
    futures_util::pin_mut!(events);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                monitor_debug!("Log stream for {} cancelled", job_id);
                return;
            }
            event = events.next() => event,
        };
        let Some(event) = event else {
            return;
        };
        if let LogEvent::Malformed(err) = &event {
            monitor_warn!("Dropping log record for {}: {}", job_id, err);
        }
        sink.emit(ClientEvent::Log {
            job_id: job_id.clone(),
            event,
        });
    }
}
