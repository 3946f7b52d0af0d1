use crate::view_model::{AppViewModel, FileRowView, JobStatusView};
use crate::{
    format_file_size, ConnectionState, FileSnapshot, Job, JobId, LogBuffer, LogRecord,
    PollTransition, PollerState, ResultFile,
};

/// Coordinator state: the active job, its observations, and the file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    active_job: Option<JobId>,
    running: bool,
    submitting: bool,
    submission_error: Option<String>,
    poller: PollerState,
    job: Option<Job>,
    logs: LogBuffer,
    auto_scroll: bool,
    stream: ConnectionState,
    files: FileSnapshot,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            active_job: None,
            running: false,
            submitting: false,
            submission_error: None,
            poller: PollerState::Idle,
            job: None,
            logs: LogBuffer::new(),
            auto_scroll: true,
            stream: ConnectionState::Connecting,
            files: FileSnapshot::new(),
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel<'_> {
        AppViewModel {
            active_job: self.active_job.clone(),
            running: self.running,
            submitting: self.submitting,
            submission_error: self.submission_error.clone(),
            status: self.job.as_ref().map(JobStatusView::from_job),
            settled: self.poller.is_settled(),
            logs: self.logs.records(),
            auto_scroll: self.auto_scroll,
            stream: self.stream,
            files: self
                .files
                .files()
                .iter()
                .map(|file| FileRowView {
                    filename: file.filename.clone(),
                    size: format_file_size(file.size),
                    created_at: file.created_at,
                    busy: self.files.is_busy(&file.filename),
                })
                .collect(),
            files_loaded: self.files.is_loaded(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the view changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.active_job.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn poller(&self) -> PollerState {
        self.poller
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn files(&self) -> &FileSnapshot {
        &self.files
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub(crate) fn is_active(&self, job_id: &JobId) -> bool {
        self.active_job.as_ref() == Some(job_id)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin_submission(&mut self) {
        self.submitting = true;
        self.submission_error = None;
        self.mark_dirty();
    }

    pub(crate) fn fail_submission(&mut self, message: String) {
        self.submitting = false;
        self.submission_error = Some(message);
        self.mark_dirty();
    }

    /// Switches to `job_id` and returns the job that was previously observed.
    pub(crate) fn switch_job(&mut self, job_id: JobId) -> Option<JobId> {
        let previous = self.active_job.replace(job_id);
        self.submitting = false;
        self.running = true;
        self.poller = PollerState::Idle;
        self.poller.begin();
        self.job = None;
        self.logs.clear();
        self.stream = ConnectionState::Connecting;
        self.mark_dirty();
        previous
    }

    /// Forgets the active job and returns it.
    pub(crate) fn release_job(&mut self) -> Option<JobId> {
        let previous = self.active_job.take();
        if previous.is_some() {
            self.running = false;
            self.stream = ConnectionState::Closed;
            self.mark_dirty();
        }
        previous
    }

    pub(crate) fn apply_status(&mut self, job: Job) -> PollTransition {
        let transition = self.poller.observe(job.status);
        match transition {
            PollTransition::Ignored => {}
            PollTransition::Continue => {
                // A discarded backward move keeps the previous record.
                if self.poller.last_status() == Some(job.status) {
                    self.job = Some(job);
                }
                self.mark_dirty();
            }
            PollTransition::Settled(_) => {
                self.job = Some(job);
                self.running = false;
                self.mark_dirty();
            }
        }
        transition
    }

    pub(crate) fn apply_poll_failure(&mut self) {
        self.poller.observe_failure();
    }

    pub(crate) fn push_log(&mut self, record: LogRecord) {
        self.logs.push(record);
        self.mark_dirty();
    }

    pub(crate) fn clear_logs(&mut self) {
        if !self.logs.is_empty() {
            self.logs.clear();
            self.mark_dirty();
        }
    }

    pub(crate) fn set_auto_scroll(&mut self, enabled: bool) {
        if self.auto_scroll != enabled {
            self.auto_scroll = enabled;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_stream_state(&mut self, state: ConnectionState) {
        if self.stream != state {
            self.stream = state;
            self.mark_dirty();
        }
    }

    pub(crate) fn replace_files(&mut self, files: Vec<ResultFile>) {
        self.files.replace(files);
        self.mark_dirty();
    }

    pub(crate) fn files_mut(&mut self) -> &mut FileSnapshot {
        &mut self.files
    }
}
