use axum::{middleware, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Workflow validation and repair
        .nest("/v1", v1::create_v1_router())
        // Cache management
        .nest("/admin", admin::create_admin_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{self, header, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::RepairConfig;
    use crate::infrastructure::cache::InMemoryRepairCache;
    use crate::infrastructure::conformance::UntestedTester;
    use crate::infrastructure::services::RepairService;

    fn app() -> Router {
        let service = RepairService::new(
            Arc::new(InMemoryRepairCache::default()),
            Arc::new(UntestedTester),
            RepairConfig::default(),
        );
        create_router_with_state(AppState::new(service))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn broken_workflow() -> Value {
        json!({
            "name": "Mail digest",
            "nodes": [
                {"id": "1", "name": "Mail", "type": "n8n-nodes-base.gmailtrigger", "position": [0, 0],
                 "parameters": {"pollTimes": {"item": [{"mode": "everyMinute"}]}}},
                {"id": "2", "name": "Branch", "type": "n8n-nodes-base.if", "position": [200, 0], "parameters": {}},
                {"id": "3", "name": "Post", "type": "n8n-nodes-base.slack", "position": [400, 0],
                 "parameters": {"text": "{{ $json.subject }}"}}
            ],
            "connections": {"Mail": {"main": [[{"node": "Branch", "type": "main", "index": 0}]]}}
        })
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = app();

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/live")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_repair_in_untested_mode() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/v1/workflows/repair",
            Some(json!({"workflow": broken_workflow(), "prompt": "digest my mail"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["validated"], false);
        assert_eq!(body["attempts"], 1);
        assert_eq!(body["history"][0]["status"], "success");
    }

    #[tokio::test]
    async fn test_repair_rejects_non_object_workflow() {
        let (status, body) = send(
            &app(),
            "POST",
            "/v1/workflows/repair",
            Some(json!({"workflow": [1, 2, 3]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "workflow");
    }

    #[tokio::test]
    async fn test_validate_reports_issues() {
        let (status, body) = send(
            &app(),
            "POST",
            "/v1/workflows/validate",
            Some(json!({"workflow": broken_workflow()})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["score"].as_u64().unwrap() < 100);

        let kinds: Vec<&str> = body["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|w| w["kind"].as_str())
            .collect();
        assert!(kinds.contains(&"NON_CANONICAL_NODE_TYPE"), "{:?}", kinds);
        assert!(kinds.contains(&"ORPHANED_NODE"), "{:?}", kinds);
        assert!(kinds.contains(&"LEGACY_EXPRESSION"), "{:?}", kinds);
    }

    #[tokio::test]
    async fn test_fix_normalizes_document() {
        let (status, body) = send(
            &app(),
            "POST",
            "/v1/workflows/fix",
            Some(json!({"workflow": broken_workflow()})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let nodes = body["workflow"]["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["type"], "n8n-nodes-base.gmailTrigger");
        assert_eq!(nodes[2]["parameters"]["text"], "={{ $json.subject }}");
        assert!(!body["applied"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classify_error() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/v1/errors/classify",
            Some(json!({"error": "Unrecognized node type: n8n-nodes-base.gmailtrigger"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "unknown_node_type");

        let (status, _) = send(&app, "POST", "/v1/errors/classify", Some(json!({"error": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let app = app();
        send(
            &app,
            "POST",
            "/v1/workflows/repair",
            Some(json!({"workflow": broken_workflow()})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/admin/cache/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["size"], 1);

        let (status, _) = send(&app, "DELETE", "/admin/cache", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, "GET", "/admin/cache/stats", None).await;
        assert_eq!(body["size"], 0);
    }
}
