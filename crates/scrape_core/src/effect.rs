use crate::{JobId, JobStatus, ScrapeRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitJob(ScrapeRequest),
    /// Acquire the per-job resources: status poller and log stream.
    StartWatching { job_id: JobId },
    /// Release the per-job resources. Always emitted before a new `StartWatching`.
    StopWatching { job_id: JobId },
    /// One-shot completion signal for a job that reached a terminal state.
    JobCompleted { job_id: JobId, status: JobStatus },
    ScrollToLatest,
    SaveLogExport { filename: String, contents: String },
    RefreshFiles,
    DownloadFile { filename: String },
    /// Ask the user to confirm a delete; answer comes back as a `Msg`.
    ConfirmDelete { filename: String },
    DeleteFile { filename: String },
}
