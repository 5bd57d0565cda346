//! OTEL-shaped JSON views of internal records for the Query API (spec §4.6):
//! identifiers are hex strings, timestamps are nanoseconds, and resource /
//! attribute maps are surfaced directly rather than the interned refs.

use serde::Serialize;
use serde_json::Value;

use crate::ids::{hex_encode, span_id_to_hex, trace_id_to_hex};
use crate::interning::Interner;
use crate::models::attribute::attributes_to_json;
use crate::models::log::Log;
use crate::models::span::{Span, Trace};

#[derive(Debug, Serialize)]
pub struct StatusJson {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SpanEventJson {
    pub timestamp_ns: i64,
    pub name: String,
    pub attributes: Value,
}

#[derive(Debug, Serialize)]
pub struct SpanLinkJson {
    pub trace_id: String,
    pub span_id: String,
    pub attributes: Value,
}

#[derive(Debug, Serialize)]
pub struct SpanJson {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: &'static str,
    pub start_time_ns: i64,
    pub end_time_ns: i64,
    pub duration_ns: i64,
    pub status: StatusJson,
    pub attributes: Value,
    pub events: Vec<SpanEventJson>,
    pub links: Vec<SpanLinkJson>,
    pub service_name: String,
    pub resource: Value,
}

fn kind_name(kind: crate::models::span::SpanKind) -> &'static str {
    use crate::models::span::SpanKind::*;
    match kind {
        Unspecified => "unspecified",
        Internal => "internal",
        Server => "server",
        Client => "client",
        Producer => "producer",
        Consumer => "consumer",
    }
}

fn status_code_name(code: crate::models::span::StatusCode) -> &'static str {
    use crate::models::span::StatusCode::*;
    match code {
        Unset => "unset",
        Ok => "ok",
        Error => "error",
    }
}

pub fn span_to_json(span: &Span, interner: &Interner) -> SpanJson {
    let resource = interner.get_resource(span.resource_ref);
    let service_name = resource.as_ref().and_then(|r| r.service_name().map(str::to_string)).unwrap_or_else(|| "unknown_service".to_string());
    let resource_json = resource.map(|r| attributes_to_json(&r.attributes)).unwrap_or(Value::Null);

    SpanJson {
        trace_id: trace_id_to_hex(&span.trace_id),
        span_id: span_id_to_hex(&span.span_id),
        parent_span_id: span.parent_span_id.map(|p| span_id_to_hex(&p)),
        name: span.name.clone(),
        kind: kind_name(span.kind),
        start_time_ns: span.start_time_ns,
        end_time_ns: span.end_time_ns,
        duration_ns: span.duration_ns(),
        status: StatusJson { code: status_code_name(span.status.code), message: span.status.message.clone() },
        attributes: attributes_to_json(&span.attributes),
        events: span
            .events
            .iter()
            .map(|e| SpanEventJson { timestamp_ns: e.timestamp_ns, name: e.name.clone(), attributes: attributes_to_json(&e.attributes) })
            .collect(),
        links: span
            .links
            .iter()
            .map(|l| SpanLinkJson { trace_id: trace_id_to_hex(&l.trace_id), span_id: span_id_to_hex(&l.span_id), attributes: attributes_to_json(&l.attributes) })
            .collect(),
        service_name,
        resource: resource_json,
    }
}

#[derive(Debug, Serialize)]
pub struct TraceJson {
    pub trace_id: String,
    pub span_count: usize,
    pub duration_ns: i64,
    pub root_span_name: Option<String>,
    pub services: Vec<String>,
    pub spans: Vec<SpanJson>,
}

/// Projects a stored `Trace` to its query-facing JSON shape, dropping any
/// member span whose resolved `service.name` equals `self_service_name`
/// (spec §8 self-filter invariant: self spans stay in the store for trace
/// reassembly but are never surfaced in query responses).
pub fn trace_to_json(trace: &Trace, interner: &Interner, self_service_name: &str) -> TraceJson {
    let mut spans: Vec<&Span> = trace
        .spans
        .iter()
        .filter(|s| interner.service_name_of(s.resource_ref).as_deref() != Some(self_service_name))
        .collect();
    spans.sort_by_key(|s| s.start_time_ns);

    let mut services: Vec<String> = spans
        .iter()
        .filter_map(|s| interner.service_name_of(s.resource_ref))
        .collect();
    services.sort();
    services.dedup();

    let root_span_name = {
        let ids: std::collections::HashSet<_> = spans.iter().map(|s| s.span_id).collect();
        spans
            .iter()
            .filter(|s| s.parent_span_id.is_none_or(|p| !ids.contains(&p)))
            .min_by_key(|s| s.start_time_ns)
            .map(|s| s.name.clone())
    };

    TraceJson {
        trace_id: trace_id_to_hex(&trace.trace_id),
        span_count: spans.len(),
        duration_ns: trace.duration_ns(),
        root_span_name,
        services,
        spans: spans.into_iter().map(|s| span_to_json(s, interner)).collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct LogJson {
    pub timestamp_ns: i64,
    pub severity_text: String,
    pub severity_number: i32,
    pub severity: &'static str,
    pub body: String,
    pub attributes: Value,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub service_name: String,
    pub resource: Value,
}

pub fn log_to_json(log: &Log, interner: &Interner) -> LogJson {
    let resource = interner.get_resource(log.resource_ref);
    let service_name = resource.as_ref().and_then(|r| r.service_name().map(str::to_string)).unwrap_or_else(|| "unknown_service".to_string());
    let resource_json = resource.map(|r| attributes_to_json(&r.attributes)).unwrap_or(Value::Null);

    LogJson {
        timestamp_ns: log.timestamp_ns,
        severity_text: log.severity_text.clone(),
        severity_number: log.severity_number,
        severity: log.severity_name(),
        body: log.body.clone(),
        attributes: attributes_to_json(&log.attributes),
        trace_id: log.trace_id.map(|t| trace_id_to_hex(&t)),
        span_id: log.span_id.map(|s| span_id_to_hex(&s)),
        service_name,
        resource: resource_json,
    }
}

pub fn instance_id_hex(bytes: &[u8]) -> String {
    hex_encode(bytes)
}
