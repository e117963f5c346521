//! Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_cache_lookup, record_classification,
    record_conformance_test, record_http_request, record_repair_session, PrometheusMetrics,
};
