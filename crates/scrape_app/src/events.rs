use scrape_client::{ClientEvent, LogEvent, StatusUpdate};
use scrape_core::Msg;

/// Translates a client event into the coordinator's vocabulary.
///
/// Successful downloads are handled by the caller, which must save the bytes
/// before the download can be reported as finished.
pub fn to_msg(event: ClientEvent) -> Msg {
    match event {
        ClientEvent::Submitted(Ok(job_id)) => Msg::JobCreated { job_id },
        ClientEvent::Submitted(Err(err)) => Msg::SubmissionFailed {
            message: err.user_message(),
        },
        ClientEvent::Status { job_id, update } => match update {
            StatusUpdate::Snapshot(job) | StatusUpdate::Settled(job) => {
                Msg::StatusFetched { job_id, job }
            }
            StatusUpdate::FetchFailed(err) => Msg::StatusFetchFailed {
                job_id,
                message: err.to_string(),
            },
        },
        ClientEvent::Log { job_id, event } => match event {
            LogEvent::Record(record) => Msg::LogReceived { job_id, record },
            LogEvent::Malformed(err) => Msg::LogRecordRejected {
                job_id,
                message: err.to_string(),
            },
            // The follow-up connection state carries what the view needs.
            LogEvent::Dropped(_) => Msg::NoOp,
            LogEvent::Connection(state) => Msg::StreamStateChanged { job_id, state },
        },
        ClientEvent::Files(Ok(files)) => Msg::FilesRefreshed(files),
        ClientEvent::Files(Err(err)) => Msg::FilesRefreshFailed {
            message: err.to_string(),
        },
        ClientEvent::Downloaded { filename, result } => match result {
            Ok(bytes) => Msg::DownloadFinished {
                filename,
                bytes: bytes.len() as u64,
            },
            Err(err) => Msg::DownloadFailed {
                filename,
                message: err.to_string(),
            },
        },
        ClientEvent::Deleted { filename, result } => match result {
            Ok(()) => Msg::FileDeleted { filename },
            Err(err) => Msg::FileDeleteFailed {
                filename,
                message: err.to_string(),
            },
        },
    }
}
