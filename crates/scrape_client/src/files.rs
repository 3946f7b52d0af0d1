use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use scrape_core::ResultFile;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{ApiError, ClientEvent, EventSink, FileOp, FileOpError, ScrapeApi};

/// Lists, fetches and deletes result files on the backend.
#[derive(Clone)]
pub struct ResultsFileManager {
    api: Arc<dyn ScrapeApi>,
    interval: Duration,
}

impl ResultsFileManager {
    pub fn new(api: Arc<dyn ScrapeApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    pub async fn refresh(&self) -> Result<Vec<ResultFile>, ApiError> {
        let files = self.api.list_files().await?;
        monitor_debug!("Backend lists {} result files", files.len());
        Ok(files)
    }

    pub async fn download(&self, filename: &str) -> Result<Bytes, FileOpError> {
        let bytes = self
            .api
            .download(filename)
            .await
            .map_err(|source| file_error(FileOp::Download, filename, source))?;
        monitor_info!("Downloaded {} ({} bytes)", filename, bytes.len());
        Ok(bytes)
    }

    pub async fn delete(&self, filename: &str) -> Result<(), FileOpError> {
        self.api
            .delete_file(filename)
            .await
            .map_err(|source| file_error(FileOp::Delete, filename, source))?;
        monitor_info!("Deleted {}", filename);
        Ok(())
    }

    /// Refreshes immediately, then every interval, until cancelled.
    pub async fn run(&self, sink: Arc<dyn EventSink>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.refresh() => result,
            };
            if let Err(err) = &result {
                monitor_warn!("File list refresh failed: {}", err);
            }
            sink.emit(ClientEvent::Files(result));
        }
    }
}

fn file_error(op: FileOp, filename: &str, source: ApiError) -> FileOpError {
    monitor_warn!("{} of {} failed: {}", op, filename, source);
    FileOpError {
        op,
        filename: filename.to_string(),
        source,
    }
}
