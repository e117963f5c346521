use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{ApiError, ClassifyRequest, Json};
use crate::domain::ErrorClassification;

/// POST /v1/errors/classify
pub async fn classify_error(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ErrorClassification>, ApiError> {
    if request.error.trim().is_empty() {
        return Err(ApiError::bad_request("error must not be empty").with_param("error"));
    }

    Ok(Json(state.repair_service.classify(&request.error)))
}
