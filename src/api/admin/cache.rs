//! Repair cache management

use axum::{extract::State, http::StatusCode};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::CacheStats;

/// GET /admin/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.repair_service.cache_stats().await)
}

/// DELETE /admin/cache
pub async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.repair_service.clear_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}
