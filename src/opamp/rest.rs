//! OpAMP REST surface for the UI (spec §4.7).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Error;
use crate::ids::hex_encode;

use super::state::{AgentRegistry, validate_collector_config};

#[derive(Debug, Serialize)]
struct AgentSummary {
    instance_id: String,
    agent_type: String,
    agent_version: String,
    status: &'static str,
    last_seen_ns: i64,
}

pub async fn status(State(registry): State<AgentRegistry>) -> impl IntoResponse {
    let agents: Vec<AgentSummary> = registry
        .list()
        .into_iter()
        .map(|a| AgentSummary {
            instance_id: a.instance_id_hex(),
            agent_type: a.agent_type,
            agent_version: a.agent_version,
            status: match a.status {
                crate::models::agent::AgentStatus::Connected => "connected",
                crate::models::agent::AgentStatus::Disconnected => "disconnected",
            },
            last_seen_ns: a.last_seen_ns,
        })
        .collect();
    let connected = agents.iter().filter(|a| a.status == "connected").count();
    Json(json!({ "agents": agents, "connected": connected, "total": agents.len() }))
}

#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    instance_id: Option<String>,
}

pub async fn get_config(State(registry): State<AgentRegistry>, Query(q): Query<ConfigQuery>) -> Result<impl IntoResponse, Error> {
    let instance_id = q.instance_id.map(|s| crate::ids::hex_to_bytes(&s)).transpose()?;
    let config = registry.effective_config(instance_id.as_deref()).await;
    Ok(Json(json!({ "config": config })))
}

#[derive(Debug, Deserialize)]
pub struct PushConfigRequest {
    pub config: String,
    pub instance_id: Option<String>,
}

pub async fn post_config(
    State(registry): State<AgentRegistry>,
    Json(req): Json<PushConfigRequest>,
) -> Result<impl IntoResponse, Error> {
    validate_collector_config(&req.config)?;
    registry.set_default_config(req.config.clone()).await;

    match req.instance_id {
        Some(hex) => {
            let id = crate::ids::hex_to_bytes(&hex)?;
            registry.push_to_one(&id, req.config)?;
        }
        None => registry.push_to_all_connected(req.config),
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_config_rejects_bad_yaml() {
        let registry = AgentRegistry::new();
        let result = post_config(
            State(registry),
            Json(PushConfigRequest { config: "not: valid: yaml: at: all:".into(), instance_id: None }),
        )
        .await;
        assert!(result.is_err());
    }
}
