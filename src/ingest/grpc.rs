//! OTLP gRPC receiver (spec §4.4): `ExportTraceService`, `ExportLogsService`,
//! `ExportMetricsService`.

use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsPartialSuccess, ExportLogsServiceRequest, ExportLogsServiceResponse,
    logs_service_server::{LogsService, LogsServiceServer},
};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsPartialSuccess, ExportMetricsServiceRequest, ExportMetricsServiceResponse,
    metrics_service_server::{MetricsService, MetricsServiceServer},
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTracePartialSuccess, ExportTraceServiceRequest, ExportTraceServiceResponse,
    trace_service_server::{TraceService, TraceServiceServer},
};
use tonic::{Request, Response, Status};

use crate::AppState;
use crate::normalize::{logs as normalize_logs, metrics as normalize_metrics, spans as normalize_spans};

pub struct TraceReceiver(pub AppState);

#[tonic::async_trait]
impl TraceService for TraceReceiver {
    async fn export(&self, request: Request<ExportTraceServiceRequest>) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let req = request.into_inner();
        let outcome = normalize_spans::ingest_resource_spans(
            &self.0.store,
            &self.0.interner,
            &self.0.config.self_service_name,
            &req.resource_spans,
        )
        .map_err(Status::from)?;

        let partial_success = (outcome.rejected > 0).then(|| ExportTracePartialSuccess {
            rejected_spans: outcome.rejected as i64,
            error_message: format!("{} span(s) rejected: malformed id or start>end", outcome.rejected),
        });
        Ok(Response::new(ExportTraceServiceResponse { partial_success }))
    }
}

pub struct LogsReceiver(pub AppState);

#[tonic::async_trait]
impl LogsService for LogsReceiver {
    async fn export(&self, request: Request<ExportLogsServiceRequest>) -> Result<Response<ExportLogsServiceResponse>, Status> {
        let req = request.into_inner();
        let outcome = normalize_logs::ingest_resource_logs(&self.0.store, &self.0.interner, &req.resource_logs)
            .map_err(Status::from)?;

        let partial_success = (outcome.rejected > 0).then(|| ExportLogsPartialSuccess {
            rejected_log_records: outcome.rejected as i64,
            error_message: format!("{} log record(s) rejected", outcome.rejected),
        });
        Ok(Response::new(ExportLogsServiceResponse { partial_success }))
    }
}

pub struct MetricsReceiver(pub AppState);

#[tonic::async_trait]
impl MetricsService for MetricsReceiver {
    async fn export(&self, request: Request<ExportMetricsServiceRequest>) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let req = request.into_inner();
        let outcome = normalize_metrics::ingest_resource_metrics(
            &self.0.store,
            &self.0.interner,
            self.0.config.max_metric_cardinality,
            &req.resource_metrics,
        )
        .map_err(Status::from)?;

        let partial_success = (outcome.rejected > 0).then(|| ExportMetricsPartialSuccess {
            rejected_data_points: outcome.rejected as i64,
            error_message: format!("{} data point(s) rejected: cardinality or kind conflict", outcome.rejected),
        });
        Ok(Response::new(ExportMetricsServiceResponse { partial_success }))
    }
}

pub fn trace_server(state: AppState) -> TraceServiceServer<TraceReceiver> {
    TraceServiceServer::new(TraceReceiver(state))
}

pub fn logs_server(state: AppState) -> LogsServiceServer<LogsReceiver> {
    LogsServiceServer::new(LogsReceiver(state))
}

pub fn metrics_server(state: AppState) -> MetricsServiceServer<MetricsReceiver> {
    MetricsServiceServer::new(MetricsReceiver(state))
}
