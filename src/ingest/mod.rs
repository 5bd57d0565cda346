//! Ingestion Endpoint (spec §4.4): gRPC (primary) and HTTP OTLP receivers.

pub mod grpc;
pub mod http;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;

use crate::AppState;

/// The HTTP OTLP receiver router, enforcing spec §4.4's request size cap via
/// `DefaultBodyLimit` (oversize requests are rejected before the handler
/// runs, matching the `ResourceExhausted` contract).
pub fn http_router(state: AppState) -> Router {
    let max_bytes = state.config.max_request_bytes;
    Router::new()
        .route("/v1/traces", post(http::traces))
        .route("/v1/logs", post(http::logs))
        .route("/v1/metrics", post(http::metrics))
        .layer(DefaultBodyLimit::max(max_bytes))
        .with_state(state)
}

pub fn grpc_router(state: AppState) -> tonic::transport::server::Router {
    tonic::transport::Server::builder()
        .add_service(grpc::trace_server(state.clone()))
        .add_service(grpc::logs_server(state.clone()))
        .add_service(grpc::metrics_server(state))
}
