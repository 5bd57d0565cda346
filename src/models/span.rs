//! Span/Trace records (spec §3).

use serde::{Deserialize, Serialize};

use crate::ids::{SpanId, TraceId};
use crate::models::attribute::Attributes;
use crate::models::resource::ResourceRef;
use crate::models::scope::ScopeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn from_otlp(kind: i32) -> Self {
        use opentelemetry_proto::tonic::trace::v1::span::SpanKind as OKind;
        match OKind::try_from(kind).unwrap_or(OKind::Unspecified) {
            OKind::Internal => SpanKind::Internal,
            OKind::Server => SpanKind::Server,
            OKind::Client => SpanKind::Client,
            OKind::Producer => SpanKind::Producer,
            OKind::Consumer => SpanKind::Consumer,
            OKind::Unspecified => SpanKind::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    pub fn from_otlp(code: i32) -> Self {
        use opentelemetry_proto::tonic::trace::v1::status::StatusCode as OCode;
        match OCode::try_from(code).unwrap_or(OCode::Unset) {
            OCode::Ok => StatusCode::Ok,
            OCode::Error => StatusCode::Error,
            OCode::Unset => StatusCode::Unset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    pub timestamp_ns: i64,
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanLink {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time_ns: i64,
    pub end_time_ns: i64,
    pub status: Status,
    pub attributes: Attributes,
    pub events: Vec<SpanEvent>,
    pub links: Vec<SpanLink>,
    pub resource_ref: ResourceRef,
    pub scope_ref: ScopeRef,
    pub ingest_time_ns: i64,
}

impl Span {
    pub fn duration_ns(&self) -> i64 {
        self.end_time_ns - self.start_time_ns
    }
}

/// A derived view composed of a trace's member spans (spec §3). Not stored
/// directly; assembled on read from the spans-by-trace index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub spans: Vec<Span>,
}

impl Trace {
    /// The earliest span whose parent is absent or not present in this trace.
    pub fn root(&self) -> Option<&Span> {
        let ids: std::collections::HashSet<SpanId> = self.spans.iter().map(|s| s.span_id).collect();
        self.spans
            .iter()
            .filter(|s| s.parent_span_id.is_none_or(|p| !ids.contains(&p)))
            .min_by_key(|s| s.start_time_ns)
    }

    pub fn duration_ns(&self) -> i64 {
        let start = self.spans.iter().map(|s| s.start_time_ns).min().unwrap_or(0);
        let end = self.spans.iter().map(|s| s.end_time_ns).max().unwrap_or(0);
        end - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::Attributes;

    fn span(id: u8, parent: Option<u8>, start: i64) -> Span {
        Span {
            trace_id: [1u8; 16],
            span_id: [id; 8],
            parent_span_id: parent.map(|p| [p; 8]),
            name: "x".into(),
            kind: SpanKind::Internal,
            start_time_ns: start,
            end_time_ns: start + 1,
            status: Status { code: StatusCode::Ok, message: String::new() },
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            resource_ref: 0,
            scope_ref: 0,
            ingest_time_ns: 0,
        }
    }

    #[test]
    fn root_is_span_without_stored_parent() {
        let trace = Trace {
            trace_id: [1u8; 16],
            spans: vec![span(2, Some(1), 200), span(1, None, 100)],
        };
        assert_eq!(trace.root().unwrap().span_id, [1u8; 8]);
    }

    #[test]
    fn dangling_parent_is_treated_as_root() {
        let trace = Trace {
            trace_id: [1u8; 16],
            spans: vec![span(2, Some(99), 100)],
        };
        assert_eq!(trace.root().unwrap().span_id, [2u8; 8]);
    }
}
