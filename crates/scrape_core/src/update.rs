use monitor_logging::{monitor_debug, monitor_info, monitor_warn};

use crate::{log_export_filename, AppState, Effect, JobId, Msg, PollTransition};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FormSubmitted(form) => {
            if state.is_running() || state.is_submitting() {
                monitor_debug!("Ignoring submission while a job is running or in flight");
                return (state, Vec::new());
            }
            match form.validate() {
                Ok(request) => {
                    state.begin_submission();
                    vec![Effect::SubmitJob(request)]
                }
                Err(err) => {
                    state.fail_submission(err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::JobCreated { job_id } => {
            monitor_info!("Job created job_id={}", job_id);
            watch_job(&mut state, job_id)
        }
        Msg::SubmissionFailed { message } => {
            state.fail_submission(message);
            Vec::new()
        }
        Msg::WatchRequested { job_id } => {
            if state.is_active(&job_id) && state.is_running() {
                Vec::new()
            } else {
                watch_job(&mut state, job_id)
            }
        }
        Msg::StopClicked => match state.release_job() {
            Some(job_id) => vec![Effect::StopWatching { job_id }],
            None => Vec::new(),
        },
        Msg::StatusFetched { job_id, job } => {
            if !state.is_active(&job_id) {
                monitor_debug!("Dropping status for inactive job {}", job_id);
                return (state, Vec::new());
            }
            if job.job_id != job_id {
                monitor_warn!(
                    "Status response for {} carried job_id {}",
                    job_id,
                    job.job_id
                );
            }
            match state.apply_status(job) {
                PollTransition::Settled(status) => {
                    monitor_info!("Job {} settled with status {}", job_id, status);
                    vec![Effect::JobCompleted { job_id, status }]
                }
                PollTransition::Continue | PollTransition::Ignored => Vec::new(),
            }
        }
        Msg::StatusFetchFailed { job_id, message } => {
            if state.is_active(&job_id) {
                monitor_warn!("Status fetch for {} failed: {}", job_id, message);
                state.apply_poll_failure();
            }
            Vec::new()
        }
        Msg::LogReceived { job_id, record } => {
            if !state.is_active(&job_id) {
                return (state, Vec::new());
            }
            state.push_log(record);
            if state.auto_scroll() {
                vec![Effect::ScrollToLatest]
            } else {
                Vec::new()
            }
        }
        Msg::LogRecordRejected { job_id, message } => {
            monitor_warn!("Dropped malformed log record for {}: {}", job_id, message);
            Vec::new()
        }
        Msg::StreamStateChanged { job_id, state: stream } => {
            if state.is_active(&job_id) {
                state.set_stream_state(stream);
            }
            Vec::new()
        }
        Msg::ClearLogsClicked => {
            state.clear_logs();
            Vec::new()
        }
        Msg::ExportLogsClicked => {
            if state.logs().is_empty() {
                Vec::new()
            } else {
                vec![Effect::SaveLogExport {
                    filename: log_export_filename(state.active_job()),
                    contents: state.logs().export(),
                }]
            }
        }
        Msg::AutoScrollToggled(enabled) => {
            state.set_auto_scroll(enabled);
            if enabled && !state.logs().is_empty() {
                vec![Effect::ScrollToLatest]
            } else {
                Vec::new()
            }
        }
        Msg::RefreshFilesClicked => {
            state.files_mut().set_refreshing(true);
            state.mark_dirty();
            vec![Effect::RefreshFiles]
        }
        Msg::FilesRefreshed(files) => {
            state.replace_files(files);
            Vec::new()
        }
        Msg::FilesRefreshFailed { message } => {
            monitor_warn!("File list refresh failed: {}", message);
            state.files_mut().set_refreshing(false);
            Vec::new()
        }
        Msg::DownloadClicked { filename } => vec![Effect::DownloadFile { filename }],
        Msg::DownloadFinished { filename, bytes } => {
            monitor_info!("Downloaded {} ({} bytes)", filename, bytes);
            Vec::new()
        }
        Msg::DownloadFailed { filename, message } => {
            monitor_warn!("Download of {} failed: {}", filename, message);
            Vec::new()
        }
        Msg::DeleteClicked { filename } => {
            if !state.files().contains(&filename) {
                monitor_warn!("Refusing to delete {}: not in the file list", filename);
                Vec::new()
            } else if state.files().is_busy(&filename) {
                Vec::new()
            } else {
                vec![Effect::ConfirmDelete { filename }]
            }
        }
        Msg::DeleteConfirmed { filename } => {
            if !state.files().contains(&filename) {
                monitor_warn!("Refusing to delete {}: not in the file list", filename);
                Vec::new()
            } else if state.files_mut().mark_busy(&filename) {
                state.mark_dirty();
                vec![Effect::DeleteFile { filename }]
            } else {
                monitor_debug!("Delete of {} already in flight", filename);
                Vec::new()
            }
        }
        Msg::DeleteCancelled { .. } => Vec::new(),
        Msg::FileDeleted { filename } => {
            monitor_info!("Deleted {}", filename);
            state.files_mut().clear_busy(&filename);
            state.mark_dirty();
            vec![Effect::RefreshFiles]
        }
        Msg::FileDeleteFailed { filename, message } => {
            monitor_warn!("Delete of {} failed: {}", filename, message);
            if state.files_mut().clear_busy(&filename) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Releases the previous job's resources before acquiring the new ones.
fn watch_job(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    if let Some(previous) = state.switch_job(job_id.clone()) {
        effects.push(Effect::StopWatching { job_id: previous });
    }
    effects.push(Effect::StartWatching { job_id });
    effects
}
