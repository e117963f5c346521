//! v1 API endpoints

pub mod errors;
pub mod workflows;

use axum::{routing::post, Router};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/workflows/repair", post(workflows::repair_workflow))
        .route("/workflows/validate", post(workflows::validate_workflow))
        .route("/workflows/fix", post(workflows::fix_workflow))
        .route("/errors/classify", post(errors::classify_error))
}
