//! Scrape monitor core: pure coordinator state machine and domain types.
mod effect;
mod files;
mod form;
mod job;
mod log_record;
mod msg;
mod poller;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use files::{format_file_size, FileSnapshot, ResultFile};
pub use form::{
    estimated_minutes, parse_max_results, FormError, ScrapeForm, ScrapeRequest,
    DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE,
};
pub use job::{Job, JobId, JobStatus};
pub use log_record::{log_export_filename, ConnectionState, LogBuffer, LogLevel, LogRecord};
pub use msg::Msg;
pub use poller::{PollTransition, PollerState};
pub use state::AppState;
pub use update::update;
pub use view_model::{AppViewModel, FileRowView, JobStatusView};
