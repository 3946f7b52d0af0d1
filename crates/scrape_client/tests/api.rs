use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scrape_client::{
    ClientConfig, FailureKind, FileOp, HttpScrapeApi, JobSubmitter, ResultsFileManager, ScrapeApi,
    SubmissionError,
};
use scrape_core::{JobId, ScrapeForm};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> Arc<dyn ScrapeApi> {
    let config = ClientConfig::from_base_url(&server.uri()).expect("base url");
    Arc::new(HttpScrapeApi::new(config).expect("client"))
}

fn file_json(name: &str, size: u64) -> serde_json::Value {
    json!({
        "filename": name,
        "size": size,
        "created_at": "2024-03-01T09:15:00.123456",
        "modified_at": "2024-03-01T09:20:00"
    })
}

#[tokio::test]
async fn submit_posts_normalized_form_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .and(body_json(json!({
            "url": "https://example.com/listing",
            "date_debut": "2024-01-01",
            "date_fin": null,
            "search_term": "rust",
            "max_results": 50
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc123",
            "status": "pending",
            "message": "Scraping job started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = JobSubmitter::new(api_for(&server));
    let form = ScrapeForm {
        url: " https://example.com/listing ".to_string(),
        date_start: "2024-01-01".to_string(),
        search_term: "rust".to_string(),
        max_results: "abc".to_string(),
        ..ScrapeForm::default()
    };

    let job_id = submitter.submit_form(&form).await.expect("submitted");
    assert_eq!(job_id, JobId::new("abc123"));
    assert!(!submitter.is_in_flight());
}

#[tokio::test]
async fn submit_maps_server_error_to_status_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let submitter = JobSubmitter::new(api_for(&server));
    let err = submitter
        .submit_form(&ScrapeForm::new("https://example.com"))
        .await
        .unwrap_err();

    match &err {
        SubmissionError::Request(api) => assert_eq!(api.kind, FailureKind::HttpStatus(500)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_message(), "HTTP error: 500");
    assert!(!submitter.is_in_flight());
}

#[tokio::test]
async fn submit_without_url_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let submitter = JobSubmitter::new(api_for(&server));
    let err = submitter
        .submit_form(&ScrapeForm::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Invalid(_)));
}

#[tokio::test]
async fn second_submission_is_rejected_while_first_is_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "job_id": "slow" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let submitter = Arc::new(JobSubmitter::new(api_for(&server)));
    let first = {
        let submitter = submitter.clone();
        tokio::spawn(async move {
            submitter
                .submit_form(&ScrapeForm::new("https://example.com"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = submitter
        .submit_form(&ScrapeForm::new("https://example.com"))
        .await;
    assert_eq!(second, Err(SubmissionError::InFlight));
    assert_eq!(first.await.unwrap(), Ok(JobId::new("slow")));
}

#[tokio::test]
async fn job_status_accepts_null_result_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc123",
            "status": "running",
            "progress": "Scraping page 2",
            "result_files": null,
            "error": null,
            "created_at": "2024-03-01T09:15:00.123456",
            "completed_at": null
        })))
        .mount(&server)
        .await;

    let job = api_for(&server)
        .job_status(&JobId::new("abc123"))
        .await
        .expect("status");
    assert_eq!(job.progress.as_deref(), Some("Scraping page 2"));
    assert!(job.result_files.is_empty());
    assert!(!job.is_terminal());
}

#[tokio::test]
async fn files_manager_lists_downloads_and_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file_json("results_1.csv", 2048), file_json("results_2.xlsx", 10)]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/download/results_1.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("a,b\n1,2\n", "text/csv"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/results_1.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File results_1.csv deleted successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file_json("results_2.xlsx", 10)]
        })))
        .mount(&server)
        .await;

    let manager = ResultsFileManager::new(api_for(&server), Duration::from_secs(10));

    let files = manager.refresh().await.expect("list");
    let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["results_1.csv", "results_2.xlsx"]);
    assert_eq!(files[0].size, 2048);

    let bytes = manager.download("results_1.csv").await.expect("download");
    assert_eq!(&bytes[..], b"a,b\n1,2\n");

    manager.delete("results_1.csv").await.expect("delete");
    let files = manager.refresh().await.expect("list");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "results_2.xlsx");
}

#[tokio::test]
async fn delete_of_missing_file_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/gone.csv"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "File not found" })),
        )
        .mount(&server)
        .await;

    let manager = ResultsFileManager::new(api_for(&server), Duration::from_secs(10));
    let err = manager.delete("gone.csv").await.unwrap_err();
    assert_eq!(err.op, FileOp::Delete);
    assert_eq!(err.filename, "gone.csv");
    assert_eq!(err.source.status_code(), Some(404));
}

#[tokio::test]
async fn download_encodes_awkward_filenames() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/my%20results.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x", "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let manager = ResultsFileManager::new(api_for(&server), Duration::from_secs(10));
    let bytes = manager.download("my results.csv").await.expect("download");
    assert_eq!(&bytes[..], b"x");
}

#[tokio::test]
async fn health_checks_reported_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .mount(&server)
        .await;

    api_for(&server).health().await.expect("healthy");
}
