//! API integration tests.
//!
//! These tests exercise the HTTP surface end to end with mock fetcher,
//! upscaler and page scraper behind a real orchestrator.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestFixture, PUBLIC_URL};
use imgup_core::{testing::MockUpscaler, ScrapedPage};

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["server"]["public_url"], PUBLIC_URL);
    assert_eq!(response.body["fetcher"]["proxy_configured"], false);
    assert!(response.body["fetcher"].get("proxy").is_none());
}

#[tokio::test]
async fn test_queue_status_idle() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/queue").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queued"], 0);
    assert_eq!(response.body["active"], 0);
    assert_eq!(response.body["concurrency"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/health").await;

    let response = fixture.get_raw("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .content_type
        .unwrap_or_default()
        .starts_with("text/plain"));
    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("imgup_http_requests_total"));
    assert!(text.contains("imgup_jobs_by_status"));
}

// =============================================================================
// Process lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_and_complete_process() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/process",
            json!({ "images": ["http://x/a.jpg", "http://x/b.jpg"], "title": "Batch" }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    let id = response.body["id"].as_str().unwrap().to_string();

    let result = fixture.wait_for_terminal(&id).await;
    assert_eq!(result["status"], "completed");
    assert_eq!(result["title"], "Batch");
    assert_eq!(result["remaining"], 0);

    let images = result["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let prefix = format!("{}/api/static/{}/output/", PUBLIC_URL, id);
    for image in images {
        assert!(image.as_str().unwrap().starts_with(&prefix));
    }
}

#[tokio::test]
async fn test_title_defaults_to_id() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/process", json!({ "images": ["http://x/a.jpg"] }))
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();

    let result = fixture.get(&format!("/api/process/{}", id)).await;
    assert_status!(result, StatusCode::OK);
    assert_eq!(result.body["title"], id.as_str());
}

#[tokio::test]
async fn test_create_rejects_empty_images() {
    let fixture = TestFixture::new();

    let response = fixture.post("/api/process", json!({ "images": [] })).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());

    let response = fixture.post("/api/process", json!({ "title": "x" })).await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    // Nothing was persisted
    let list = fixture.get("/api/process").await;
    assert_eq!(list.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_get_unknown_process() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/process/does-not-exist").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({ "error": "Process not found" }));
}

#[tokio::test]
async fn test_list_processes() {
    let fixture = TestFixture::new();

    let first = fixture
        .post("/api/process", json!({ "images": ["http://x/a.jpg"] }))
        .await;
    let second = fixture
        .post("/api/process", json!({ "images": ["http://x/b.jpg"] }))
        .await;

    let response = fixture.get("/api/process").await;
    assert_status!(response, StatusCode::OK);

    let ids: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.body["id"].as_str().unwrap()));
    assert!(ids.contains(&second.body["id"].as_str().unwrap()));
}

#[tokio::test]
async fn test_delete_process() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/process", json!({ "images": ["http://x/a.jpg"] }))
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_terminal(&id).await;

    let response = fixture.delete(&format!("/api/process/{}", id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["id"], id.as_str());
    assert!(!fixture.temp_dir.path().join("processes").join(&id).exists());

    let response = fixture.get(&format!("/api/process/{}", id)).await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.delete(&format!("/api/process/{}", id)).await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_upscale_reports_reason() {
    let upscaler = MockUpscaler::new();
    upscaler.fail_file("broken.jpg").await;
    let fixture = TestFixture::with_upscaler(upscaler);

    let response = fixture
        .post("/api/process", json!({ "images": ["http://x/broken.jpg"] }))
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();

    let result = fixture.wait_for_terminal(&id).await;
    assert_eq!(result["status"], "failed");
    assert!(result.get("images").is_none());
    assert!(result["failure_reason"].is_string());
}

// =============================================================================
// Crawl submissions
// =============================================================================

#[tokio::test]
async fn test_crawl_creates_process_from_page() {
    let fixture = TestFixture::new();
    fixture
        .scraper
        .set_page(
            "https://site.example/gallery",
            ScrapedPage {
                images: vec![
                    "https://cdn.example/1.jpg".to_string(),
                    "https://cdn.example/2.jpg".to_string(),
                ],
                title: Some("Gallery".to_string()),
            },
        )
        .await;

    let response = fixture
        .post(
            "/api/process/crawl",
            json!({ "url": "https://site.example/gallery" }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    let id = response.body["id"].as_str().unwrap().to_string();
    let result = fixture.wait_for_terminal(&id).await;
    assert_eq!(result["title"], "Gallery");
    assert_eq!(result["images"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_crawl_page_without_images() {
    let fixture = TestFixture::new();
    fixture
        .scraper
        .set_page("https://site.example/empty", ScrapedPage::default())
        .await;

    let response = fixture
        .post("/api/process/crawl", json!({ "url": "https://site.example/empty" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_crawl_unreachable_page() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/process/crawl", json!({ "url": "https://site.example/missing" }))
        .await;

    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert!(response.body["error"].is_string());
}

// =============================================================================
// Artifacts
// =============================================================================

#[tokio::test]
async fn test_serve_output_file() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/process", json!({ "images": ["http://x/a.jpg"] }))
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_terminal(&id).await;

    let response = fixture
        .get_raw(&format!("/api/static/{}/output/a_x2_denoise3x.png", id))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
    assert!(!response.bytes.is_empty());
}

#[tokio::test]
async fn test_serve_output_file_not_found() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/process", json!({ "images": ["http://x/a.jpg"] }))
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_terminal(&id).await;

    let response = fixture
        .get(&format!("/api/static/{}/output/missing.png", id))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "File not found");

    let response = fixture
        .get("/api/static/unknown-job/output/a_x2_denoise3x.png")
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture
        .get(&format!("/api/static/{}/output/..", id))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}
