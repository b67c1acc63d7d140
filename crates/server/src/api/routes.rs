use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{artifacts, handlers, middleware::metrics_middleware, processes};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and queue
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/queue", get(handlers::queue_status))
        // Processes
        .route(
            "/process",
            get(processes::list_processes).post(processes::create_process),
        )
        .route("/process/crawl", post(processes::crawl_process))
        .route(
            "/process/{id}",
            get(processes::get_process).delete(processes::delete_process),
        )
        // Artifacts
        .route("/static/{id}/output/{file}", get(artifacts::serve_output))
        .layer(CorsLayer::permissive());

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
