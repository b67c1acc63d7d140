//! Output file serving.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgup_core::{OrchestratorError, StagingError};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::error;

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Stream one output file of a job with a content type guessed from its name.
pub async fn serve_output(
    State(state): State<Arc<AppState>>,
    Path((id, file)): Path<(String, String)>,
    request: Request,
) -> Response {
    match state.orchestrator().output_file(&id, &file).await {
        Ok(Some(path)) => match ServeFile::new(path).oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        },
        Ok(None) | Err(OrchestratorError::Staging(StagingError::InvalidFileName(_))) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("File not found")),
        )
            .into_response(),
        Err(e) => {
            error!(job_id = %id, file = %file, error = %e, "Failed to resolve output file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}
