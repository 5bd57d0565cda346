//! Log records (spec §3, §4.3 step 4).

use serde::{Deserialize, Serialize};

use crate::ids::{SpanId, TraceId};
use crate::models::attribute::Attributes;
use crate::models::resource::ResourceRef;
use crate::models::scope::ScopeRef;

/// Canonical OTLP severity names, indexed by the `severity_number` range they
/// cover (1-4 Trace, 5-8 Debug, ... 21-24 Fatal) per the OpenTelemetry spec.
pub fn severity_name(number: i32) -> &'static str {
    match number {
        1..=4 => "TRACE",
        5..=8 => "DEBUG",
        9..=12 => "INFO",
        13..=16 => "WARN",
        17..=20 => "ERROR",
        21..=24 => "FATAL",
        _ => "UNSPECIFIED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub timestamp_ns: i64,
    pub severity_text: String,
    pub severity_number: i32,
    pub body: String,
    pub attributes: Attributes,
    pub trace_id: Option<TraceId>,
    pub span_id: Option<SpanId>,
    pub resource_ref: ResourceRef,
    pub scope_ref: ScopeRef,
    pub ingest_time_ns: i64,
}

impl Log {
    pub fn severity_name(&self) -> &'static str {
        if !self.severity_text.is_empty() {
            // Canonicalize caller-supplied text to one of the known names when
            // it matches; otherwise fall back to the number-derived name.
            match self.severity_text.to_ascii_uppercase().as_str() {
                "TRACE" => return "TRACE",
                "DEBUG" => return "DEBUG",
                "INFO" => return "INFO",
                "WARN" | "WARNING" => return "WARN",
                "ERROR" => return "ERROR",
                "FATAL" | "CRITICAL" => return "FATAL",
                _ => {}
            }
        }
        severity_name(self.severity_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_severity_number_to_canonical_name() {
        assert_eq!(severity_name(9), "INFO");
        assert_eq!(severity_name(17), "ERROR");
        assert_eq!(severity_name(0), "UNSPECIFIED");
    }
}
