//! Frame encode/decode (spec §4.1): schema-tagged binary records compressed
//! with ZSTD for storage. Encoding is `rmp-serde` (compact MessagePack) rather
//! than a hand-rolled format, then ZSTD at the configured level.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Error;

const MAGIC: u8 = 0xA1;
const ZSTD_LEVEL: i32 = 3;

/// One tag per stored record shape. Unknown tags on decode are
/// `SchemaMismatch` (spec §4.1); a corrupt/truncated header is `CorruptFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchemaTag {
    Span = 1,
    Log = 2,
    MetricCatalogEntry = 3,
    SeriesKey = 4,
    DataPoint = 5,
    AgentState = 6,
}

impl SchemaTag {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(SchemaTag::Span),
            2 => Some(SchemaTag::Log),
            3 => Some(SchemaTag::MetricCatalogEntry),
            4 => Some(SchemaTag::SeriesKey),
            5 => Some(SchemaTag::DataPoint),
            6 => Some(SchemaTag::AgentState),
            _ => None,
        }
    }
}

/// Implemented by every record type that the Store persists as encoded
/// bytes, binding it to a fixed schema tag.
pub trait Record: Serialize + DeserializeOwned {
    const TAG: SchemaTag;
}

impl Record for crate::models::span::Span {
    const TAG: SchemaTag = SchemaTag::Span;
}
impl Record for crate::models::log::Log {
    const TAG: SchemaTag = SchemaTag::Log;
}
impl Record for crate::models::metric::MetricCatalogEntry {
    const TAG: SchemaTag = SchemaTag::MetricCatalogEntry;
}
impl Record for crate::models::metric::SeriesKey {
    const TAG: SchemaTag = SchemaTag::SeriesKey;
}
impl Record for crate::models::metric::DataPoint {
    const TAG: SchemaTag = SchemaTag::DataPoint;
}
impl Record for crate::models::agent::AgentState {
    const TAG: SchemaTag = SchemaTag::AgentState;
}

/// `[MAGIC][tag][len:u32 LE][zstd(rmp_serde(record))]`. Deterministic for
/// identical logical records: `rmp_serde` serializes struct fields in
/// declaration order and ZSTD is deterministic at a fixed level.
pub fn encode<T: Record>(record: &T) -> Result<Vec<u8>, Error> {
    let payload = rmp_serde::to_vec(record).map_err(|e| Error::Internal(format!("encode: {e}")))?;
    let compressed = zstd::stream::encode_all(payload.as_slice(), ZSTD_LEVEL)
        .map_err(|e| Error::Internal(format!("zstd encode: {e}")))?;

    let mut out = Vec::with_capacity(6 + compressed.len());
    out.push(MAGIC);
    out.push(T::TAG as u8);
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decode<T: Record>(bytes: &[u8]) -> Result<T, Error> {
    if bytes.len() < 6 || bytes[0] != MAGIC {
        return Err(Error::CorruptFrame("missing or invalid frame header".into()));
    }
    let tag = SchemaTag::from_u8(bytes[1])
        .ok_or_else(|| Error::SchemaMismatch(format!("unknown schema tag {}", bytes[1])))?;
    if tag != T::TAG {
        return Err(Error::SchemaMismatch(format!(
            "expected tag {:?}, found {:?}",
            T::TAG, tag
        )));
    }
    let len = u32::from_le_bytes(bytes[2..6].try_into().unwrap()) as usize;
    let body = bytes.get(6..6 + len).ok_or_else(|| {
        Error::CorruptFrame(format!("declared length {len} exceeds frame ({})", bytes.len() - 6))
    })?;

    let decompressed =
        zstd::stream::decode_all(body).map_err(|e| Error::CorruptFrame(format!("zstd decode: {e}")))?;
    rmp_serde::from_slice(&decompressed).map_err(|e| Error::CorruptFrame(format!("decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::Attributes;
    use crate::models::span::{Span, SpanKind, Status, StatusCode};

    fn sample_span() -> Span {
        Span {
            trace_id: [1u8; 16],
            span_id: [2u8; 8],
            parent_span_id: None,
            name: "GET /x".into(),
            kind: SpanKind::Server,
            start_time_ns: 1_000,
            end_time_ns: 2_000,
            status: Status { code: StatusCode::Ok, message: String::new() },
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            resource_ref: 42,
            scope_ref: 7,
            ingest_time_ns: 1_000,
        }
    }

    #[test]
    fn round_trips() {
        let span = sample_span();
        let bytes = encode(&span).unwrap();
        let decoded: Span = decode(&bytes).unwrap();
        assert_eq!(decoded.trace_id, span.trace_id);
        assert_eq!(decoded.name, span.name);
        assert_eq!(decoded.duration_ns(), span.duration_ns());
    }

    #[test]
    fn rejects_corrupt_header() {
        let err = decode::<Span>(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, Error::CorruptFrame(_)));
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut bytes = encode(&sample_span()).unwrap();
        bytes[1] = 0xEE;
        let err = decode::<Span>(&bytes).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn rejects_tag_mismatch() {
        let bytes = encode(&sample_span()).unwrap();
        let err = decode::<crate::models::log::Log>(&bytes).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }
}
