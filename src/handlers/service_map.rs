//! `GET /api/service-map?limit=` (spec §4.6, aggregation in §4.5).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::AppState;
use crate::aggregate::service_map::service_map;

fn default_limit() -> usize {
    200
}

#[derive(Debug, Deserialize)]
pub struct ServiceMapQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn get_service_map(State(state): State<AppState>, Query(q): Query<ServiceMapQuery>) -> impl IntoResponse {
    let map = service_map(&state.store, &state.interner, &state.config.self_service_name, q.limit);
    Json(map)
}
