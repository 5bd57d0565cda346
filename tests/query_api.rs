//! End-to-end scenarios of spec §8, driving the Query API router in-process.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use tinyolly_core::config::Config;
use tinyolly_core::models::attribute::{AttrValue, Attributes};
use tinyolly_core::models::log::Log;
use tinyolly_core::models::resource::Resource;
use tinyolly_core::models::span::{Span, SpanKind, Status, StatusCode as SpanStatusCode};
use tinyolly_core::{handlers, AppState};

fn test_config() -> Config {
    Config {
        max_metric_cardinality: 1000,
        retention_seconds: 1800,
        otlp_grpc_port: 0,
        otlp_http_port: 0,
        query_http_port: 0,
        opamp_ws_port: 0,
        opamp_rest_port: 0,
        max_request_bytes: 16 * 1024 * 1024,
        store_max_bytes: 64 * 1024 * 1024,
        collector_config_path: None,
        self_service_name: "tinyolly-core".into(),
    }
}

fn resource_with_service(name: &str) -> Resource {
    let mut attrs = Attributes::new();
    attrs.insert("service.name".into(), AttrValue::String(name.into()));
    Resource { attributes: attrs }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Scenario 1: trace ingest + fetch.
#[tokio::test]
async fn trace_ingest_and_fetch() {
    let state = AppState::new(test_config());
    let resource_ref = state.interner.intern_resource(resource_with_service("checkout"));

    let trace_id = [0x01u8, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10];
    let span_id = [0x0au8; 8];
    state
        .store
        .put_span(Span {
            trace_id,
            span_id,
            parent_span_id: None,
            name: "GET /x".into(),
            kind: SpanKind::Server,
            start_time_ns: 1_000_000_000_000,
            end_time_ns: 1_000_000_500_000,
            status: Status { code: SpanStatusCode::Ok, message: String::new() },
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            resource_ref,
            scope_ref: 0,
            ingest_time_ns: 1_000_000_000_000,
        })
        .unwrap();

    let app = handlers::router(state);
    let trace_id_hex = tinyolly_core::ids::trace_id_to_hex(&trace_id);
    let response = app
        .oneshot(Request::builder().uri(format!("/api/traces/{trace_id_hex}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["span_count"], 1);
    assert_eq!((body["duration_ns"].as_i64().unwrap() as f64) / 1_000_000.0, 0.5);
}

/// Scenario 2: log correlation by trace id.
#[tokio::test]
async fn log_correlation_by_trace_id() {
    let state = AppState::new(test_config());
    let resource_ref = state.interner.intern_resource(resource_with_service("checkout"));
    let trace_id = [7u8; 16];
    let span_id = [8u8; 8];

    state
        .store
        .put_log(Log {
            timestamp_ns: 1_000,
            severity_text: String::new(),
            severity_number: 9,
            body: "hi".into(),
            attributes: Attributes::new(),
            trace_id: Some(trace_id),
            span_id: Some(span_id),
            resource_ref,
            scope_ref: 0,
            ingest_time_ns: 1_000,
        })
        .unwrap();

    let app = handlers::router(state);
    let trace_id_hex = tinyolly_core::ids::trace_id_to_hex(&trace_id);
    let response = app
        .oneshot(Request::builder().uri(format!("/api/logs?trace_id={trace_id_hex}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let logs = body.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["severity"], "INFO");
    assert_eq!(logs[0]["body"], "hi");
}

/// Scenario 3: cardinality drop, surfaced via `/api/stats` and `/api/metrics`.
#[tokio::test]
async fn cardinality_drop_is_surfaced() {
    let state = AppState::new(Config { max_metric_cardinality: 2, ..test_config() });

    for name in ["a", "b", "c"] {
        let _ = state.store.admit_metric(name, tinyolly_core::models::metric::MetricKind::Gauge, "1", "", 2);
    }

    let app = handlers::router(state);
    let stats = app
        .clone()
        .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let stats_body = body_json(stats).await;
    assert_eq!(stats_body["metric_count"].as_u64().unwrap(), 2);
    assert!(stats_body["metrics_dropped"].as_u64().unwrap() >= 1);

    let metrics = app
        .oneshot(Request::builder().uri("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let metrics_body = body_json(metrics).await;
    assert_eq!(metrics_body.as_array().unwrap().len(), 2);
}

/// Scenario: self-filtered spans never appear in query responses.
#[tokio::test]
async fn self_service_spans_are_filtered_from_query_api() {
    let state = AppState::new(test_config());
    let resource_ref = state.interner.intern_resource(resource_with_service("tinyolly-core"));

    state
        .store
        .put_span(Span {
            trace_id: [9u8; 16],
            span_id: [9u8; 8],
            parent_span_id: None,
            name: "self".into(),
            kind: SpanKind::Internal,
            start_time_ns: 0,
            end_time_ns: 1,
            status: Status { code: SpanStatusCode::Ok, message: String::new() },
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            resource_ref,
            scope_ref: 0,
            ingest_time_ns: 0,
        })
        .unwrap();

    let app = handlers::router(state);
    let response = app
        .oneshot(Request::builder().uri("/api/traces?limit=50").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

/// A trace mixing a self-service span with a real span must surface the real
/// span but never the self span, in both `/api/traces` and `/api/traces/{id}`.
#[tokio::test]
async fn self_service_span_is_dropped_from_a_mixed_trace() {
    let state = AppState::new(test_config());
    let self_ref = state.interner.intern_resource(resource_with_service("tinyolly-core"));
    let frontend_ref = state.interner.intern_resource(resource_with_service("frontend"));
    let trace_id = [11u8; 16];

    let base_span = |span_id, parent, resource_ref, start| Span {
        trace_id,
        span_id,
        parent_span_id: parent,
        name: "op".into(),
        kind: SpanKind::Internal,
        start_time_ns: start,
        end_time_ns: start + 1,
        status: Status { code: SpanStatusCode::Ok, message: String::new() },
        attributes: Attributes::new(),
        events: vec![],
        links: vec![],
        resource_ref,
        scope_ref: 0,
        ingest_time_ns: start,
    };

    state.store.put_span(base_span([1u8; 8], None, self_ref, 0)).unwrap();
    state.store.put_span(base_span([2u8; 8], Some([1u8; 8]), frontend_ref, 1)).unwrap();

    let app = handlers::router(state);
    let trace_id_hex = tinyolly_core::ids::trace_id_to_hex(&trace_id);

    let list_response = app
        .clone()
        .oneshot(Request::builder().uri("/api/traces?limit=50").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let list_body = body_json(list_response).await;
    let traces = list_body.as_array().unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0]["span_count"], 1);
    assert_eq!(traces[0]["services"], serde_json::json!(["frontend"]));

    let get_response = app
        .oneshot(Request::builder().uri(format!("/api/traces/{trace_id_hex}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let get_body = body_json(get_response).await;
    assert_eq!(get_body["span_count"], 1);
    let spans = get_body["spans"].as_array().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0]["service_name"], "frontend");
}

/// `/api/metrics/{name}?resource.<key>=<value>` scopes series to matching resources.
#[tokio::test]
async fn metric_series_filtered_by_resource_query_param() {
    let state = AppState::new(test_config());
    let svc_a = state.interner.intern_resource(resource_with_service("svc-a"));
    let svc_b = state.interner.intern_resource(resource_with_service("svc-b"));

    state.store.admit_metric("requests", tinyolly_core::models::metric::MetricKind::Sum, "1", "", 10).unwrap();
    for (resource_ref, value) in [(svc_a, 1.0), (svc_b, 2.0)] {
        let key = tinyolly_core::models::metric::SeriesKey { resource_ref, attributes: Attributes::new() };
        state
            .store
            .put_datapoint(
                "requests",
                key,
                tinyolly_core::models::metric::DataPoint {
                    timestamp_ns: 1_000,
                    value: tinyolly_core::models::metric::DataPointValue::Number(value),
                    exemplars: vec![],
                },
            )
            .unwrap();
    }

    let app = handlers::router(state);
    let response = app
        .oneshot(Request::builder().uri("/api/metrics/requests?resource.service.name=svc-a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let series = body.as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["resource"]["service.name"], "svc-a");
}

#[tokio::test]
async fn health_endpoint_is_live() {
    let state = AppState::new(test_config());
    let app = handlers::router(state);
    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
