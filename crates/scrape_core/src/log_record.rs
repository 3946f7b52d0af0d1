use serde::{Deserialize, Serialize};

use crate::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// One server-pushed line of job progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
    pub level: LogLevel,
}

impl LogRecord {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            level,
        }
    }

    /// `[timestamp] message`, the line format used for exports.
    pub fn export_line(&self) -> String {
        format!("[{}] {}", self.timestamp, self.message)
    }
}

/// Append-only buffer of streamed records, in arrival order.
///
/// The only way to remove records is [`LogBuffer::clear`], which empties the
/// whole buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogBuffer {
    records: Vec<LogRecord>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn export(&self) -> String {
        self.records
            .iter()
            .map(LogRecord::export_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Filename used when saving an exported buffer.
pub fn log_export_filename(job_id: Option<&JobId>) -> String {
    match job_id {
        Some(job_id) => format!("scraper-logs-{job_id}.txt"),
        None => "scraper-logs.txt".to_string(),
    }
}

/// Liveness of a job's log channel, as published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Retrying {
        attempt: u32,
        delay_ms: u64,
    },
    Closed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Retrying { .. } => "retrying",
            ConnectionState::Closed => "closed",
        }
    }
}
