use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{RequestBuilder, Response};
use scrape_core::{Job, JobId, ResultFile, ScrapeRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::map_reqwest_error;
use crate::{ApiError, ClientConfig, FailureKind};

/// Raw body of the log event stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// The backend contract the monitor relies on.
#[async_trait::async_trait]
pub trait ScrapeApi: Send + Sync {
    /// `POST /api/scrape`.
    async fn submit(&self, request: &ScrapeRequest) -> Result<JobId, ApiError>;

    /// `GET /api/status/{job_id}`.
    async fn job_status(&self, job_id: &JobId) -> Result<Job, ApiError>;

    /// `GET /api/logs/{job_id}`, returning the undecoded event-stream body.
    async fn open_logs(
        &self,
        job_id: &JobId,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, ApiError>;

    /// `GET /api/files`.
    async fn list_files(&self) -> Result<Vec<ResultFile>, ApiError>;

    /// `GET /api/download/{filename}`.
    async fn download(&self, filename: &str) -> Result<Bytes, ApiError>;

    /// `DELETE /api/files/{filename}`.
    async fn delete_file(&self, filename: &str) -> Result<(), ApiError>;

    /// `GET /health`.
    async fn health(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<ResultFile>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// [`ScrapeApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpScrapeApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpScrapeApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // No client-wide timeout: it would also cut the long-lived log stream.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::new(
                    FailureKind::InvalidUrl,
                    format!("{} cannot carry a path", self.config.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let response = self.send(self.client.get(url)).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl ScrapeApi for HttpScrapeApi {
    async fn submit(&self, request: &ScrapeRequest) -> Result<JobId, ApiError> {
        let url = self.endpoint(&["api", "scrape"])?;
        let response = self.send(self.client.post(url).json(request)).await?;
        let body: SubmitResponse = response.json().await.map_err(map_reqwest_error)?;
        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<Job, ApiError> {
        self.get_json(&["api", "status", job_id.as_str()]).await
    }

    async fn open_logs(
        &self,
        job_id: &JobId,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, ApiError> {
        let url = self.endpoint(&["api", "logs", job_id.as_str()])?;
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = last_event_id {
            request = request.header("Last-Event-ID", id);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response)?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }

    async fn list_files(&self) -> Result<Vec<ResultFile>, ApiError> {
        let body: FileListResponse = self.get_json(&["api", "files"]).await?;
        Ok(body.files)
    }

    async fn download(&self, filename: &str) -> Result<Bytes, ApiError> {
        let url = self.endpoint(&["api", "download", filename])?;
        let response = self.send(self.client.get(url)).await?;
        response.bytes().await.map_err(map_reqwest_error)
    }

    async fn delete_file(&self, filename: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "files", filename])?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn health(&self) -> Result<(), ApiError> {
        let body: HealthResponse = self.get_json(&["health"]).await?;
        if body.status == "healthy" {
            Ok(())
        } else {
            Err(ApiError::new(
                FailureKind::Decode,
                format!("backend reported status {:?}", body.status),
            ))
        }
    }
}
