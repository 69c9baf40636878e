pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resume",
            post(handlers::handle_upload_resume).delete(handlers::handle_remove_resume),
        )
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route("/api/v1/report", get(handlers::handle_get_report))
        .route("/api/v1/reset", post(handlers::handle_reset))
        .route("/api/v1/session", get(handlers::handle_session_status))
        // Multi-page resumes routinely exceed axum's 2 MB default.
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state)
}
