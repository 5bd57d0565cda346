use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use tinyolly_core::config::Config;
use tinyolly_core::opamp::state::{AgentRegistry, spawn_heartbeat_reaper};
use tinyolly_core::store::spawn_ttl_sweeper;
use tinyolly_core::{AppState, handlers, ingest, opamp};

/// Default OpAMP heartbeat interval (spec §5: "a missed heartbeat interval
/// (default 30s) transitions the agent to disconnected").
const OPAMP_HEARTBEAT_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tinyolly_core=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    let state = AppState::new(config.clone());

    spawn_ttl_sweeper(state.store.clone(), config.retention_seconds);

    let agent_registry = AgentRegistry::new();
    if let Some(path) = &config.collector_config_path {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                if let Err(e) = opamp::state::validate_collector_config(&contents) {
                    tracing::warn!(error = %e, path, "collector config at COLLECTOR_CONFIG_PATH failed validation, ignoring");
                } else {
                    agent_registry.set_default_config(contents).await;
                    tracing::info!(path, "loaded default collector config");
                }
            }
            Err(e) => tracing::warn!(error = %e, path, "could not read COLLECTOR_CONFIG_PATH"),
        }
    }
    spawn_heartbeat_reaper(agent_registry.clone(), OPAMP_HEARTBEAT_SECONDS);

    let query_addr = SocketAddr::from(([0, 0, 0, 0], config.query_http_port));
    let query_router = handlers::router(state.clone());
    let query_server = tokio::spawn(async move {
        tracing::info!(%query_addr, "query API listening");
        let listener = tokio::net::TcpListener::bind(query_addr).await.expect("bind query HTTP port");
        axum::serve(listener, query_router).await.expect("query API server");
    });

    let otlp_http_addr = SocketAddr::from(([0, 0, 0, 0], config.otlp_http_port));
    let otlp_http_router = ingest::http_router(state.clone());
    let otlp_http_server = tokio::spawn(async move {
        tracing::info!(%otlp_http_addr, "OTLP HTTP receiver listening");
        let listener = tokio::net::TcpListener::bind(otlp_http_addr).await.expect("bind OTLP HTTP port");
        axum::serve(listener, otlp_http_router).await.expect("OTLP HTTP server");
    });

    let otlp_grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.otlp_grpc_port));
    let otlp_grpc_router = ingest::grpc_router(state.clone());
    let otlp_grpc_server = tokio::spawn(async move {
        tracing::info!(%otlp_grpc_addr, "OTLP gRPC receiver listening");
        otlp_grpc_router.serve(otlp_grpc_addr).await.expect("OTLP gRPC server");
    });

    let opamp_ws_addr = SocketAddr::from(([0, 0, 0, 0], config.opamp_ws_port));
    let opamp_ws_router = opamp::ws_router(agent_registry.clone());
    let opamp_ws_server = tokio::spawn(async move {
        tracing::info!(%opamp_ws_addr, "OpAMP WebSocket server listening");
        let listener = tokio::net::TcpListener::bind(opamp_ws_addr).await.expect("bind OpAMP WS port");
        axum::serve(listener, opamp_ws_router).await.expect("OpAMP WS server");
    });

    let opamp_rest_addr = SocketAddr::from(([0, 0, 0, 0], config.opamp_rest_port));
    let opamp_rest_router = opamp::rest_router(agent_registry);
    let opamp_rest_server = tokio::spawn(async move {
        tracing::info!(%opamp_rest_addr, "OpAMP REST server listening");
        let listener = tokio::net::TcpListener::bind(opamp_rest_addr).await.expect("bind OpAMP REST port");
        axum::serve(listener, opamp_rest_router).await.expect("OpAMP REST server");
    });

    tokio::select! {
        res = query_server => res?,
        res = otlp_http_server => res?,
        res = otlp_grpc_server => res?,
        res = opamp_ws_server => res?,
        res = opamp_rest_server => res?,
    }

    Ok(())
}
