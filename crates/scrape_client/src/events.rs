use bytes::Bytes;
use scrape_core::{ConnectionState, Job, JobId, LogRecord, ResultFile};
use tokio::sync::mpsc;

use crate::{ApiError, FileOpError, ParseError, SubmissionError};

/// One observation from the status poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Snapshot(Job),
    FetchFailed(ApiError),
    /// Terminal record; always the last item of a poll sequence.
    Settled(Job),
}

/// One observation from the log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Record(LogRecord),
    Malformed(ParseError),
    /// The channel failed; a `Connection` event with the follow-up state comes next.
    Dropped(ApiError),
    Connection(ConnectionState),
}

/// Everything the IO side reports back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Submitted(Result<JobId, SubmissionError>),
    Status { job_id: JobId, update: StatusUpdate },
    Log { job_id: JobId, event: LogEvent },
    Files(Result<Vec<ResultFile>, ApiError>),
    Downloaded {
        filename: String,
        result: Result<Bytes, FileOpError>,
    },
    Deleted {
        filename: String,
        result: Result<(), FileOpError>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ClientEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }
}
