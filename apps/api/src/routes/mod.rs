pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ranking::handlers;
use crate::state::AppState;

/// Resume uploads are bounded; a batch of PDFs fits comfortably under this.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/jobs",
            post(handlers::handle_create_job).get(handlers::handle_list_jobs),
        )
        .route("/api/v1/rankings", post(handlers::handle_create_ranking))
        .route("/api/v1/batches/:id", get(handlers::handle_get_batch))
        .route(
            "/api/v1/batches/:id/results",
            get(handlers::handle_list_results),
        )
        .route("/api/v1/results/:id", get(handlers::handle_get_result))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
