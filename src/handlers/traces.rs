//! Trace and span query handlers (spec §4.6: `/api/traces`, `/api/traces/{id}`, `/api/spans`).

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Json, http::StatusCode};
use serde::Deserialize;

use crate::AppState;
use crate::error::Error;
use crate::handlers::json::{span_to_json, trace_to_json};
use crate::ids::hex_to_trace_id;

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct TracesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// `GET /api/traces?limit=N`: most recent N traces, self-service excluded.
pub async fn list_traces(State(state): State<AppState>, Query(q): Query<TracesQuery>) -> impl IntoResponse {
    let self_service = &state.config.self_service_name;
    let traces: Vec<_> = state
        .store
        .list_recent_traces(q.limit.saturating_mul(4).min(10_000).max(q.limit))
        .into_iter()
        .filter(|t| {
            t.spans
                .iter()
                .any(|s| state.interner.service_name_of(s.resource_ref).as_deref() != Some(self_service.as_str()))
        })
        .take(q.limit)
        .map(|t| trace_to_json(&t, &state.interner, self_service))
        .collect();
    Json(traces)
}

/// `GET /api/traces/{id}`: full trace, reassembled from its member spans,
/// self-service spans projected out per spec §8's self-filter invariant.
pub async fn get_trace(State(state): State<AppState>, Path(trace_id): Path<String>) -> Result<impl IntoResponse, Error> {
    let id = hex_to_trace_id(&trace_id)?;
    let trace = state.store.get_trace(id).ok_or_else(|| Error::NotFound(format!("trace {trace_id} not found")))?;
    Ok((StatusCode::OK, Json(trace_to_json(&trace, &state.interner, &state.config.self_service_name))))
}

#[derive(Debug, Deserialize)]
pub struct SpansQuery {
    pub service: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// `GET /api/spans?service=&limit=`: recent spans, optionally scoped to a service.
pub async fn list_spans(State(state): State<AppState>, Query(q): Query<SpansQuery>) -> impl IntoResponse {
    let self_service = &state.config.self_service_name;
    if q.service.as_deref() == Some(self_service.as_str()) {
        return Json(Vec::<crate::handlers::json::SpanJson>::new());
    }
    let spans: Vec<_> = state
        .store
        .list_recent_spans(q.service.as_deref(), q.limit)
        .into_iter()
        .filter(|s| state.interner.service_name_of(s.resource_ref).as_deref() != Some(self_service.as_str()))
        .map(|s| span_to_json(&s, &state.interner))
        .collect();
    Json(spans)
}
