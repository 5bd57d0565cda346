//! Query API (spec §4.6): read-only HTTP surface over the Store and Aggregation Engine.

pub mod health;
pub mod json;
pub mod logs;
pub mod metrics;
pub mod service_catalog;
pub mod service_map;
pub mod stats;
pub mod traces;

use axum::Router;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthz))
        .route("/api/traces", get(traces::list_traces))
        .route("/api/traces/{id}", get(traces::get_trace))
        .route("/api/spans", get(traces::list_spans))
        .route("/api/logs", get(logs::list_logs))
        .route("/api/metrics", get(metrics::list_metrics))
        .route("/api/metrics/{name}", get(metrics::get_metric))
        .route("/api/service-catalog", get(service_catalog::get_service_catalog))
        .route("/api/service-map", get(service_map::get_service_map))
        .route("/api/stats", get(stats::get_stats))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
