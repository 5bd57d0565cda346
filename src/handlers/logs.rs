//! Log query handler (spec §4.6: `GET /api/logs?trace_id=&severity=&limit=`).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::AppState;
use crate::error::Error;
use crate::handlers::json::log_to_json;
use crate::ids::hex_to_trace_id;

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub trace_id: Option<String>,
    pub severity: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn list_logs(State(state): State<AppState>, Query(q): Query<LogsQuery>) -> Result<impl IntoResponse, Error> {
    let trace_id = q.trace_id.as_deref().map(hex_to_trace_id).transpose()?;
    let self_service = &state.config.self_service_name;

    let logs: Vec<_> = state
        .store
        .list_recent_logs(trace_id, q.severity.as_deref(), q.limit.saturating_mul(2).max(q.limit))
        .into_iter()
        .filter(|l| state.interner.service_name_of(l.resource_ref).as_deref() != Some(self_service.as_str()))
        .take(q.limit)
        .map(|l| log_to_json(&l, &state.interner))
        .collect();

    Ok(Json(logs))
}
