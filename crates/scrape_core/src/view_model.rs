use chrono::NaiveDateTime;

use crate::{ConnectionState, Job, JobId, JobStatus, LogRecord};

/// Snapshot for rendering; log records are borrowed from the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel<'a> {
    pub active_job: Option<JobId>,
    pub running: bool,
    pub submitting: bool,
    pub submission_error: Option<String>,
    pub status: Option<JobStatusView>,
    pub settled: bool,
    pub logs: &'a [LogRecord],
    pub auto_scroll: bool,
    pub stream: ConnectionState,
    pub files: Vec<FileRowView>,
    pub files_loaded: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: Option<String>,
    pub error: Option<String>,
    pub result_files: Vec<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl JobStatusView {
    pub(crate) fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            progress: job.progress.clone(),
            error: job.error.clone(),
            result_files: job.result_files.clone(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub filename: String,
    pub size: String,
    pub created_at: NaiveDateTime,
    pub busy: bool,
}
