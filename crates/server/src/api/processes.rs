//! Process (job) API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use imgup_core::{Job, JobResult, OrchestratorError, ScrapeError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::handlers::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting image URLs
#[derive(Debug, Deserialize)]
pub struct CreateProcessBody {
    /// Source image URLs; missing is treated as empty
    #[serde(default)]
    pub images: Vec<String>,
    /// Display title, defaults to the job id
    pub title: Option<String>,
}

/// Request body for submitting a page to scrape
#[derive(Debug, Deserialize)]
pub struct CrawlProcessBody {
    pub url: String,
}

/// Response carrying a job id
#[derive(Debug, Serialize)]
pub struct ProcessIdResponse {
    pub id: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_response(err: OrchestratorError) -> ApiError {
    let status = match &err {
        OrchestratorError::EmptyImageList => StatusCode::BAD_REQUEST,
        OrchestratorError::NotFound(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("Process not found")),
            )
        }
        OrchestratorError::Scrape(ScrapeError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        OrchestratorError::Scrape(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::ScraperUnavailable | OrchestratorError::Queue(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        OrchestratorError::Store(_) | OrchestratorError::Staging(_) => {
            error!(error = %err, "Process request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Process not found")),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a list of image URLs
pub async fn create_process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProcessBody>,
) -> Result<Json<ProcessIdResponse>, ApiError> {
    let id = state
        .orchestrator()
        .create_process(body.images, body.title)
        .map_err(error_response)?;
    Ok(Json(ProcessIdResponse { id }))
}

/// Scrape a page for images and submit them
pub async fn crawl_process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CrawlProcessBody>,
) -> Result<Json<ProcessIdResponse>, ApiError> {
    let id = state
        .orchestrator()
        .create_from_page(&body.url)
        .await
        .map_err(error_response)?;
    Ok(Json(ProcessIdResponse { id }))
}

/// Get status and results of a job
pub async fn get_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResult>, ApiError> {
    state
        .orchestrator()
        .get_result(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// List every job record
pub async fn list_processes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Job>>, ApiError> {
    state
        .orchestrator()
        .list_all()
        .map(Json)
        .map_err(error_response)
}

/// Delete a job and its files
pub async fn delete_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProcessIdResponse>, ApiError> {
    match state.orchestrator().delete_process(&id).await {
        Ok(true) => Ok(Json(ProcessIdResponse { id })),
        Ok(false) => Err(not_found()),
        Err(e) => Err(error_response(e)),
    }
}
