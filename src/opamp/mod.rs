//! OpAMP control plane (spec §4.7): a WebSocket server for connected
//! collectors plus a REST surface for the UI to read/push configuration.

pub mod proto;
pub mod rest;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::{get, post};

use state::AgentRegistry;

pub fn ws_router(registry: AgentRegistry) -> Router {
    Router::new().route("/v1/opamp", get(ws::handler)).with_state(registry)
}

pub fn rest_router(registry: AgentRegistry) -> Router {
    Router::new()
        .route("/health", get(rest::health))
        .route("/status", get(rest::status))
        .route("/config", get(rest::get_config).post(rest::post_config))
        .with_state(registry)
}
