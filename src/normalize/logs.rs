//! `ResourceLogs` → `Log` records (spec §4.3 step 4).

use opentelemetry_proto::tonic::logs::v1::ResourceLogs;

use crate::ids::{parse_span_id, parse_trace_id};
use crate::interning::Interner;
use crate::models::attribute::attributes_from_otlp;
use crate::models::log::Log;
use crate::store::Store;

use super::{NormalizeOutcome, intern_resource, intern_scope};

fn now_ns() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

pub fn ingest_resource_logs(
    store: &Store,
    interner: &Interner,
    batches: &[ResourceLogs],
) -> Result<NormalizeOutcome, crate::error::Error> {
    let mut outcome = NormalizeOutcome::default();
    let ingest_time_ns = now_ns();

    for rl in batches {
        let (resource_ref, _) = intern_resource(interner, rl.resource.as_ref());

        for sl in &rl.scope_logs {
            let scope_ref = intern_scope(interner, sl.scope.as_ref());

            for raw in &sl.log_records {
                let (attributes, _) = attributes_from_otlp(&raw.attributes);

                // Attach trace/span correlation only when both decode cleanly;
                // otherwise leave them blank rather than rejecting the log
                // (spec §4.3 step 4: correlation ids are optional).
                let trace_id = (!raw.trace_id.is_empty()).then(|| parse_trace_id(&raw.trace_id).ok()).flatten();
                let span_id = (!raw.span_id.is_empty()).then(|| parse_span_id(&raw.span_id).ok()).flatten();

                let body = raw
                    .body
                    .as_ref()
                    .map(|v| {
                        crate::models::attribute::AttrValue::from_otlp(v)
                            .map(|a| a.as_display())
                            .unwrap_or_default()
                    })
                    .unwrap_or_default();

                let log = Log {
                    timestamp_ns: if raw.time_unix_nano != 0 { raw.time_unix_nano as i64 } else { raw.observed_time_unix_nano as i64 },
                    severity_text: raw.severity_text.clone(),
                    severity_number: raw.severity_number,
                    body,
                    attributes,
                    trace_id,
                    span_id,
                    resource_ref,
                    scope_ref,
                    ingest_time_ns,
                };
                store.put_log(log)?;
                outcome.accepted += 1;
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{AnyValue, any_value::Value};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ScopeLogs};

    #[test]
    fn maps_severity_and_correlates_trace() {
        let store = Store::new(1800, 1 << 30);
        let interner = Interner::new();
        let batch = ResourceLogs {
            resource: None,
            scope_logs: vec![ScopeLogs {
                scope: None,
                log_records: vec![LogRecord {
                    time_unix_nano: 1_000,
                    observed_time_unix_nano: 0,
                    severity_number: 9,
                    severity_text: String::new(),
                    body: Some(AnyValue { value: Some(Value::StringValue("hi".into())) }),
                    attributes: vec![],
                    dropped_attributes_count: 0,
                    flags: 0,
                    trace_id: vec![7u8; 16],
                    span_id: vec![8u8; 8],
                    event_name: String::new(),
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        };
        let outcome = ingest_resource_logs(&store, &interner, &[batch]).unwrap();
        assert_eq!(outcome.accepted, 1);

        let logs = store.list_recent_logs(Some([7u8; 16]), None, 10);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].severity_name(), "INFO");
        assert_eq!(logs[0].body, "hi");
    }
}
