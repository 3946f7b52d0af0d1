use std::fmt;

use scrape_core::FormError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
        }
    }
}

/// Failure of one request against the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

/// Why a job could not be created. The only error class shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("a submission is already in flight")]
    InFlight,
    #[error("submission request failed: {0}")]
    Request(ApiError),
}

impl SubmissionError {
    /// Short message suitable for inline display.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Invalid(err) => err.to_string(),
            SubmissionError::InFlight => self.to_string(),
            SubmissionError::Request(err) => match err.status_code() {
                Some(code) => format!("HTTP error: {code}"),
                None => "request failed, please try again".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Download,
    Delete,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOp::Download => write!(f, "download"),
            FileOp::Delete => write!(f, "delete"),
        }
    }
}

/// A download or delete that failed; the snapshot is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{op} of {filename} failed: {source}")]
pub struct FileOpError {
    pub op: FileOp,
    pub filename: String,
    pub source: ApiError,
}

/// A single streamed event whose payload is not a log record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("event carried no data")]
    Empty,
    #[error("invalid log record: {0}")]
    Json(String),
}
