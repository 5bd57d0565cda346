//! `GET /api/service-catalog` (spec §4.6, aggregation in §4.5).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;
use crate::aggregate::service_catalog::service_catalog;

pub async fn get_service_catalog(State(state): State<AppState>) -> impl IntoResponse {
    let window_seconds = state.config.retention_seconds.max(1) as f64;
    let catalog = service_catalog(&state.store, &state.interner, &state.config.self_service_name, window_seconds);
    Json(catalog)
}
