//! `ResourceSpans` → `Span` records (spec §4.3 step 3).

use opentelemetry_proto::tonic::trace::v1::ResourceSpans;

use crate::ids::{parse_span_id, parse_trace_id};
use crate::interning::Interner;
use crate::models::attribute::attributes_from_otlp;
use crate::models::span::{Span, SpanEvent, SpanKind, SpanLink, Status, StatusCode};
use crate::store::Store;

use super::{NormalizeOutcome, intern_resource, intern_scope};

fn now_ns() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

/// Normalize and admit one batch of `ResourceSpans`. The whole batch is
/// admitted or none of it is, per span (each malformed span is independently
/// dropped and counted, but a store failure such as `OutOfCapacity` aborts
/// the remainder of the batch to honor the atomic-admission contract).
pub fn ingest_resource_spans(
    store: &Store,
    interner: &Interner,
    self_service_name: &str,
    batches: &[ResourceSpans],
) -> Result<NormalizeOutcome, crate::error::Error> {
    let mut outcome = NormalizeOutcome::default();
    let ingest_time_ns = now_ns();

    for rs in batches {
        let (resource_ref, _dropped) = intern_resource(interner, rs.resource.as_ref());
        let service_name = rs
            .resource
            .as_ref()
            .map(|r| attributes_from_otlp(&r.attributes).0)
            .and_then(|attrs| attrs.get("service.name").map(|v| v.as_display()))
            .unwrap_or_else(|| "unknown_service".to_string());
        let is_self = service_name == self_service_name;

        for ss in &rs.scope_spans {
            let scope_ref = intern_scope(interner, ss.scope.as_ref());

            for raw in &ss.spans {
                let span = match build_span(raw, resource_ref, scope_ref, ingest_time_ns) {
                    Ok(s) => s,
                    Err(_) => {
                        outcome.rejected += 1;
                        continue;
                    }
                };
                let span_id = span.span_id;
                let trace_id = span.trace_id;
                let start_time_ns = span.start_time_ns;

                store.put_span(span)?;
                if !is_self {
                    store.index_span_by_service(&service_name, span_id, trace_id, start_time_ns);
                }
                outcome.accepted += 1;
            }
        }
    }
    Ok(outcome)
}

fn build_span(
    raw: &opentelemetry_proto::tonic::trace::v1::Span,
    resource_ref: crate::models::resource::ResourceRef,
    scope_ref: crate::models::scope::ScopeRef,
    ingest_time_ns: i64,
) -> Result<Span, crate::error::Error> {
    let trace_id = parse_trace_id(&raw.trace_id)?;
    let span_id = parse_span_id(&raw.span_id)?;
    let parent_span_id = if raw.parent_span_id.is_empty() {
        None
    } else {
        Some(parse_span_id(&raw.parent_span_id)?)
    };

    let start_time_ns = raw.start_time_unix_nano as i64;
    let end_time_ns = raw.end_time_unix_nano as i64;
    if start_time_ns > end_time_ns {
        return Err(crate::error::Error::InvalidInput(format!(
            "span {} has start_time > end_time",
            crate::ids::span_id_to_hex(&span_id)
        )));
    }

    let (attributes, _dropped) = attributes_from_otlp(&raw.attributes);

    let status = raw
        .status
        .as_ref()
        .map(|s| Status { code: StatusCode::from_otlp(s.code), message: s.message.clone() })
        .unwrap_or(Status { code: StatusCode::Unset, message: String::new() });

    let events = raw
        .events
        .iter()
        .map(|e| SpanEvent {
            timestamp_ns: e.time_unix_nano as i64,
            name: e.name.clone(),
            attributes: attributes_from_otlp(&e.attributes).0,
        })
        .collect();

    let links = raw
        .links
        .iter()
        .filter_map(|l| {
            Some(SpanLink {
                trace_id: parse_trace_id(&l.trace_id).ok()?,
                span_id: parse_span_id(&l.span_id).ok()?,
                attributes: attributes_from_otlp(&l.attributes).0,
            })
        })
        .collect();

    Ok(Span {
        trace_id,
        span_id,
        parent_span_id,
        name: raw.name.clone(),
        kind: SpanKind::from_otlp(raw.kind),
        start_time_ns,
        end_time_ns,
        status,
        attributes,
        events,
        links,
        resource_ref,
        scope_ref,
        ingest_time_ns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue, any_value::Value, AnyValue};
    use opentelemetry_proto::tonic::resource::v1::Resource as OtlpResource;
    use opentelemetry_proto::tonic::trace::v1::{ScopeSpans, Span as OtlpSpan};

    fn batch(service: &str, trace: u8, span: u8, start: i64, end: i64) -> ResourceSpans {
        ResourceSpans {
            resource: Some(OtlpResource {
                attributes: vec![KeyValue {
                    key: "service.name".into(),
                    value: Some(AnyValue { value: Some(Value::StringValue(service.into())) }),
                }],
                dropped_attributes_count: 0,
                entity_refs: vec![],
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope { name: "test".into(), version: "1".into(), attributes: vec![], dropped_attributes_count: 0 }),
                spans: vec![OtlpSpan {
                    trace_id: vec![trace; 16],
                    span_id: vec![span; 8],
                    trace_state: String::new(),
                    parent_span_id: vec![],
                    flags: 0,
                    name: "GET /x".into(),
                    kind: 2,
                    start_time_unix_nano: start as u64,
                    end_time_unix_nano: end as u64,
                    attributes: vec![],
                    dropped_attributes_count: 0,
                    events: vec![],
                    dropped_events_count: 0,
                    links: vec![],
                    dropped_links_count: 0,
                    status: None,
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }

    #[test]
    fn accepts_well_formed_span() {
        let store = Store::new(1800, 1 << 30);
        let interner = Interner::new();
        let outcome = ingest_resource_spans(&store, &interner, "tinyolly-core", &[batch("svc", 1, 1, 100, 200)]).unwrap();
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.rejected, 0);
    }

    #[test]
    fn rejects_start_after_end() {
        let store = Store::new(1800, 1 << 30);
        let interner = Interner::new();
        let outcome = ingest_resource_spans(&store, &interner, "tinyolly-core", &[batch("svc", 2, 1, 200, 100)]).unwrap();
        assert_eq!(outcome.accepted, 0);
        assert_eq!(outcome.rejected, 1);
    }
}
