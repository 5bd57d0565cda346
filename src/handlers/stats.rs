//! `GET /api/stats` (spec §4.6): record counts, cardinality usage, uptime.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::AppState;
use crate::aggregate::cardinality::cardinality_summary;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub trace_count: usize,
    pub span_count: usize,
    pub log_count: usize,
    pub metric_count: usize,
    pub metrics_dropped: usize,
    pub used_bytes: usize,
    pub max_bytes: usize,
    pub uptime_seconds: u64,
    pub series_per_metric: std::collections::BTreeMap<String, usize>,
}

pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.stats();
    let series_per_metric = cardinality_summary(&state.store);

    Json(StatsResponse {
        trace_count: stats.trace_count,
        span_count: stats.span_count,
        log_count: stats.log_count,
        metric_count: stats.metric_count,
        metrics_dropped: stats.metrics_dropped,
        used_bytes: stats.used_bytes,
        max_bytes: stats.max_bytes,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        series_per_metric,
    })
}
