//! Scrape monitor client: backend API, status poller, log stream and file manager.
mod api;
mod config;
mod error;
mod events;
mod filename;
mod files;
mod logstream;
mod monitor;
mod persist;
mod poller;
mod sse;
mod submit;

pub use api::{ByteStream, HttpScrapeApi, ScrapeApi};
pub use config::{
    parse_base_url, ClientConfig, ReconnectPolicy, DEFAULT_BASE_URL, MIN_RECONNECT_DELAY,
};
pub use error::{ApiError, FailureKind, FileOp, FileOpError, ParseError, SubmissionError};
pub use events::{ChannelEventSink, ClientEvent, EventSink, LogEvent, StatusUpdate};
pub use filename::local_filename;
pub use files::ResultsFileManager;
pub use logstream::{log_events, parse_record, run_log_stream};
pub use monitor::MonitorHandle;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{run_status_poller, status_updates};
pub use sse::{SseDecoder, SseEvent};
pub use submit::JobSubmitter;
