//! OTLP HTTP receiver (spec §4.4): `POST /v1/traces|logs|metrics`, accepting
//! protobuf or JSON per the OTLP specification.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;

use crate::AppState;
use crate::error::Error;
use crate::normalize::{logs as normalize_logs, metrics as normalize_metrics, spans as normalize_spans};

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"))
}

pub async fn traces(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<impl IntoResponse, Error> {
    let req: ExportTraceServiceRequest = if is_json(&headers) {
        serde_json::from_slice(&body).map_err(|e| Error::InvalidInput(format!("invalid OTLP/JSON: {e}")))?
    } else {
        ExportTraceServiceRequest::decode(body.as_ref()).map_err(|e| Error::InvalidInput(format!("invalid OTLP/protobuf: {e}")))?
    };

    let outcome = normalize_spans::ingest_resource_spans(&state.store, &state.interner, &state.config.self_service_name, &req.resource_spans)?;
    tracing::debug!(accepted = outcome.accepted, rejected = outcome.rejected, "ingested trace batch over http");
    Ok((StatusCode::OK, axum::Json(serde_json::json!({ "partialSuccess": { "rejectedSpans": outcome.rejected } }))))
}

pub async fn logs(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<impl IntoResponse, Error> {
    let req: ExportLogsServiceRequest = if is_json(&headers) {
        serde_json::from_slice(&body).map_err(|e| Error::InvalidInput(format!("invalid OTLP/JSON: {e}")))?
    } else {
        ExportLogsServiceRequest::decode(body.as_ref()).map_err(|e| Error::InvalidInput(format!("invalid OTLP/protobuf: {e}")))?
    };

    let outcome = normalize_logs::ingest_resource_logs(&state.store, &state.interner, &req.resource_logs)?;
    tracing::debug!(accepted = outcome.accepted, rejected = outcome.rejected, "ingested log batch over http");
    Ok((StatusCode::OK, axum::Json(serde_json::json!({ "partialSuccess": { "rejectedLogRecords": outcome.rejected } }))))
}

pub async fn metrics(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<impl IntoResponse, Error> {
    let req: ExportMetricsServiceRequest = if is_json(&headers) {
        serde_json::from_slice(&body).map_err(|e| Error::InvalidInput(format!("invalid OTLP/JSON: {e}")))?
    } else {
        ExportMetricsServiceRequest::decode(body.as_ref()).map_err(|e| Error::InvalidInput(format!("invalid OTLP/protobuf: {e}")))?
    };

    let outcome = normalize_metrics::ingest_resource_metrics(&state.store, &state.interner, state.config.max_metric_cardinality, &req.resource_metrics)?;
    tracing::debug!(accepted = outcome.accepted, rejected = outcome.rejected, "ingested metric batch over http");
    Ok((StatusCode::OK, axum::Json(serde_json::json!({ "partialSuccess": { "rejectedDataPoints": outcome.rejected } }))))
}
