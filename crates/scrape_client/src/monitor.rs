use std::sync::Arc;

use monitor_logging::{monitor_debug, monitor_info};
use scrape_core::{JobId, ScrapeRequest};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::logstream::run_log_stream;
use crate::poller::run_status_poller;
use crate::{
    ApiError, ClientConfig, ClientEvent, EventSink, HttpScrapeApi, JobSubmitter,
    ResultsFileManager, ScrapeApi,
};

/// Background tasks bound to one job or one refresher.
struct TaskGroup {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Cancels every task and waits until all of them have returned.
    async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

struct Watch {
    job_id: JobId,
    group: TaskGroup,
}

/// Executes client-side work on the tokio runtime and reports through a sink.
///
/// Every method must be called from within a tokio runtime.
pub struct MonitorHandle {
    api: Arc<dyn ScrapeApi>,
    config: ClientConfig,
    sink: Arc<dyn EventSink>,
    submitter: Arc<JobSubmitter>,
    files: ResultsFileManager,
    watch: Mutex<Option<Watch>>,
    refresher: Mutex<Option<TaskGroup>>,
}

impl MonitorHandle {
    pub fn new(config: ClientConfig, sink: Arc<dyn EventSink>) -> Result<Self, ApiError> {
        let api: Arc<dyn ScrapeApi> = Arc::new(HttpScrapeApi::new(config.clone())?);
        Ok(Self::with_api(api, config, sink))
    }

    pub fn with_api(
        api: Arc<dyn ScrapeApi>,
        config: ClientConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let files = ResultsFileManager::new(api.clone(), config.files_refresh_interval);
        Self {
            submitter: Arc::new(JobSubmitter::new(api.clone())),
            api,
            config,
            sink,
            files,
            watch: Mutex::new(None),
            refresher: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> Arc<dyn ScrapeApi> {
        self.api.clone()
    }

    /// Submits in the background; the outcome arrives as [`ClientEvent::Submitted`].
    pub fn submit(&self, request: ScrapeRequest) {
        let submitter = self.submitter.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = submitter.submit(&request).await;
            sink.emit(ClientEvent::Submitted(result));
        });
    }

    /// Starts the status poller and log stream for `job_id`.
    ///
    /// Any previous watch is fully torn down first, so at most one job is
    /// observed at a time.
    pub async fn watch(&self, job_id: JobId) {
        let mut current = self.watch.lock().await;
        if let Some(previous) = current.take() {
            monitor_debug!("Releasing watch on {}", previous.job_id);
            previous.group.shutdown().await;
        }

        monitor_info!("Watching job {}", job_id);
        let mut group = TaskGroup::new();
        group.tasks.push(tokio::spawn({
            let api = self.api.clone();
            let job_id = job_id.clone();
            let period = self.config.poll_interval;
            let sink = self.sink.clone();
            let cancel = group.cancel.child_token();
            async move {
                run_status_poller(api, job_id, period, sink, cancel).await;
            }
        }));
        group.tasks.push(tokio::spawn(run_log_stream(
            self.api.clone(),
            job_id.clone(),
            self.config.reconnect.clone(),
            self.sink.clone(),
            group.cancel.child_token(),
        )));
        *current = Some(Watch { job_id, group });
    }

    /// Stops watching `job_id`. A no-op when another job (or none) is watched.
    pub async fn unwatch(&self, job_id: &JobId) {
        let mut current = self.watch.lock().await;
        if current.as_ref().is_some_and(|watch| &watch.job_id == job_id) {
            if let Some(watch) = current.take() {
                monitor_info!("Stopped watching job {}", watch.job_id);
                watch.group.shutdown().await;
            }
        }
    }

    pub async fn watched_job(&self) -> Option<JobId> {
        self.watch
            .lock()
            .await
            .as_ref()
            .map(|watch| watch.job_id.clone())
    }

    /// Starts periodic file-list refreshes; the first happens immediately.
    pub async fn start_files_refresh(&self) {
        let mut refresher = self.refresher.lock().await;
        if refresher.is_some() {
            return;
        }
        let mut group = TaskGroup::new();
        let files = self.files.clone();
        let sink = self.sink.clone();
        let cancel = group.cancel.child_token();
        group.tasks.push(tokio::spawn(async move {
            files.run(sink, cancel).await;
        }));
        *refresher = Some(group);
    }

    pub async fn stop_files_refresh(&self) {
        if let Some(group) = self.refresher.lock().await.take() {
            group.shutdown().await;
        }
    }

    /// One-off refresh, reported as [`ClientEvent::Files`].
    pub fn refresh_files(&self) {
        let files = self.files.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.emit(ClientEvent::Files(files.refresh().await));
        });
    }

    pub fn download(&self, filename: String) {
        let files = self.files.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = files.download(&filename).await;
            sink.emit(ClientEvent::Downloaded { filename, result });
        });
    }

    pub fn delete(&self, filename: String) {
        let files = self.files.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = files.delete(&filename).await;
            sink.emit(ClientEvent::Deleted { filename, result });
        });
    }

    pub async fn health(&self) -> Result<(), ApiError> {
        self.api.health().await
    }

    /// Releases the watched job and the file refresher.
    pub async fn shutdown(&self) {
        if let Some(watch) = self.watch.lock().await.take() {
            watch.group.shutdown().await;
        }
        self.stop_files_refresh().await;
    }
}
