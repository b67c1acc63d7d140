//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock fetcher, upscaler and page scraper injected, so the whole job
//! pipeline runs without network access or a GPU.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use imgup_core::{
    testing::{MockFetcher, MockPageScraper, MockUpscaler},
    AdmissionQueue, Config, FetchStage, JobOrchestrator, JobStore, SqliteJobStore, StagingStore,
    UpscaleStage,
};

pub const PUBLIC_URL: &str = "http://imgup.test";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/process", json!({
///         "images": ["http://x/a.jpg"]
///     })).await;
///
///     assert_status!(response, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - mark URLs as failing
    pub fetcher: Arc<MockFetcher>,
    /// Mock upscaler - script failures, gate invocations
    pub upscaler: Arc<MockUpscaler>,
    /// Mock page scraper - register pages for crawl submissions
    pub scraper: Arc<MockPageScraper>,
    pub orchestrator: Arc<JobOrchestrator>,
    /// Temporary directory for the test database and job files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response for non-JSON endpoints
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_upscaler(MockUpscaler::new())
    }

    /// Create a test fixture around a preconfigured upscaler.
    pub fn with_upscaler(upscaler: MockUpscaler) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("test.db");
        config.storage.process_root = temp_dir.path().join("processes");
        config.server.public_url = PUBLIC_URL.to_string();

        let job_store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::new(&config.database.path).expect("Failed to create job store"),
        );

        let fetcher = Arc::new(MockFetcher::new());
        let upscaler = Arc::new(upscaler);
        let scraper = Arc::new(MockPageScraper::new());

        let orchestrator = Arc::new(
            JobOrchestrator::new(
                Arc::clone(&job_store),
                StagingStore::new(&config.storage.process_root),
                FetchStage::new(fetcher.clone(), config.fetcher.concurrency),
                UpscaleStage::new(upscaler.clone(), &config.upscaler),
                AdmissionQueue::new(config.queue.concurrency),
                config.server.public_url.clone(),
            )
            .with_scraper(scraper.clone()),
        );

        let state = Arc::new(imgup_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
            job_store,
        ));
        let router = imgup_server::api::create_router(state);

        Self {
            router,
            fetcher,
            upscaler,
            scraper,
            orchestrator,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and keep the body as bytes.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            content_type,
            bytes,
        }
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_terminal(&self, id: &str) -> Value {
        for _ in 0..400 {
            let response = self.get(&format!("/api/process/{}", id)).await;
            let status = response.body["status"].as_str().unwrap_or_default();
            if status == "completed" || status == "failed" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached a terminal status", id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
