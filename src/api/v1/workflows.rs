//! Workflow validation, fixing and repair endpoints

use axum::extract::State;
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{
    parse_workflow, ApiError, FixRequest, FixResponse, Json, RepairRequest, ValidateRequest,
};
use crate::domain::{RepairOutcome, ValidationResult};

/// POST /v1/workflows/repair
pub async fn repair_workflow(
    State(state): State<AppState>,
    Json(request): Json<RepairRequest>,
) -> Result<Json<RepairOutcome>, ApiError> {
    let document = parse_workflow(request.workflow)?;
    let service = &state.repair_service;
    let options = request.options.apply(service.default_options());

    info!(
        nodes = document.node_count(),
        max_attempts = options.max_attempts,
        bypass_cache = options.bypass_cache,
        "Repair requested"
    );

    let outcome = service
        .repair(document, request.prompt.as_deref().unwrap_or_default(), options)
        .await;

    Ok(Json(outcome))
}

/// POST /v1/workflows/validate
pub async fn validate_workflow(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidationResult>, ApiError> {
    let document = parse_workflow(request.workflow)?;
    let result = state
        .repair_service
        .validate(&document.into_value(), &request.options);

    debug!(valid = result.is_valid, score = result.score, "Validated workflow");
    Ok(Json(result))
}

/// POST /v1/workflows/fix
pub async fn fix_workflow(
    State(state): State<AppState>,
    Json(request): Json<FixRequest>,
) -> Result<Json<FixResponse>, ApiError> {
    let document = parse_workflow(request.workflow)?;
    let report = state.repair_service.fix(document);

    debug!(changes = report.applied.len(), "Fixed workflow");
    Ok(Json(FixResponse {
        workflow: report.workflow,
        suggestions: report.suggestions,
        applied: report.applied,
    }))
}
