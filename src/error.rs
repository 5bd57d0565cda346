//! The error taxonomy of spec §7, shared by the gRPC, HTTP ingest, and Query API surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported attribute type: {0}")]
    UnsupportedAttrType(String),
    #[error("metric kind conflict for {name}: existing={existing}, incoming={incoming}")]
    MetricKindConflict {
        name: String,
        existing: String,
        incoming: String,
    },
    #[error("cardinality exceeded for metric {0}")]
    CardinalityExceeded(String),
    #[error("store out of capacity")]
    OutOfCapacity,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::UnsupportedAttrType(_) => StatusCode::OK, // recorded as a warning counter, not rejected
            Error::MetricKindConflict { .. } => StatusCode::BAD_REQUEST,
            Error::CardinalityExceeded(_) => StatusCode::OK, // dropped + counted, not rejected
            Error::OutOfCapacity => StatusCode::SERVICE_UNAVAILABLE,
            Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Error::CorruptFrame(_) | Error::SchemaMismatch(_) => StatusCode::OK, // degraded result
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<Error> for tonic::Status {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(m) | Error::UnsupportedAttrType(m) => tonic::Status::invalid_argument(m),
            Error::MetricKindConflict { name, existing, incoming } => tonic::Status::invalid_argument(format!(
                "metric kind conflict for {name}: existing={existing}, incoming={incoming}"
            )),
            Error::CardinalityExceeded(m) => tonic::Status::resource_exhausted(m),
            Error::OutOfCapacity => tonic::Status::unavailable("store out of capacity"),
            Error::DeadlineExceeded => tonic::Status::deadline_exceeded("request deadline exceeded"),
            Error::CorruptFrame(m) | Error::SchemaMismatch(m) => tonic::Status::data_loss(m),
            Error::NotFound(m) => tonic::Status::not_found(m),
            Error::Internal(m) => tonic::Status::internal(m),
        }
    }
}
