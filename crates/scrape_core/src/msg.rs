use crate::{ConnectionState, Job, JobId, LogRecord, ResultFile, ScrapeForm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted the job form.
    FormSubmitted(ScrapeForm),
    /// Remote service accepted the submission.
    JobCreated { job_id: JobId },
    /// Submission was rejected or the request failed.
    SubmissionFailed { message: String },
    /// User attached to an existing job id.
    WatchRequested { job_id: JobId },
    /// User asked to stop observing the active job.
    StopClicked,
    /// Status poller fetched a job record.
    StatusFetched { job_id: JobId, job: Job },
    /// Status poller failed one fetch.
    StatusFetchFailed { job_id: JobId, message: String },
    /// Log stream delivered one record.
    LogReceived { job_id: JobId, record: LogRecord },
    /// Log stream dropped one malformed record.
    LogRecordRejected { job_id: JobId, message: String },
    /// Log stream connection changed state.
    StreamStateChanged {
        job_id: JobId,
        state: ConnectionState,
    },
    ClearLogsClicked,
    ExportLogsClicked,
    AutoScrollToggled(bool),
    RefreshFilesClicked,
    /// Files manager fetched a full snapshot.
    FilesRefreshed(Vec<ResultFile>),
    FilesRefreshFailed { message: String },
    DownloadClicked { filename: String },
    DownloadFinished { filename: String, bytes: u64 },
    DownloadFailed { filename: String, message: String },
    /// User asked to delete; confirmation still pending.
    DeleteClicked { filename: String },
    DeleteConfirmed { filename: String },
    DeleteCancelled { filename: String },
    FileDeleted { filename: String },
    FileDeleteFailed { filename: String, message: String },
    /// Render tick to coalesce output.
    Tick,
    NoOp,
}
