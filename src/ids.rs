//! Hex encode/decode helpers for OTLP trace/span identifiers.

use crate::error::Error;

/// A 16-byte trace identifier, always rendered as a 32-character lowercase hex string.
pub type TraceId = [u8; 16];
/// An 8-byte span identifier, always rendered as a 16-character lowercase hex string.
pub type SpanId = [u8; 8];

pub fn trace_id_to_hex(id: &TraceId) -> String {
    hex_encode(id)
}

pub fn span_id_to_hex(id: &SpanId) -> String {
    hex_encode(id)
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Parse raw OTLP id bytes into a fixed-size array, rejecting the wrong length.
pub fn parse_trace_id(bytes: &[u8]) -> Result<TraceId, Error> {
    bytes
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("trace_id must be 16 bytes, got {}", bytes.len())))
}

pub fn parse_span_id(bytes: &[u8]) -> Result<SpanId, Error> {
    bytes
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("span_id must be 8 bytes, got {}", bytes.len())))
}

/// Parse a hex string (as used in Query API path params) back into a trace id.
pub fn hex_to_trace_id(s: &str) -> Result<TraceId, Error> {
    hex_to_bytes(s)?
        .try_into()
        .map_err(|_| Error::InvalidInput("trace_id must decode to 16 bytes".into()))
}

pub fn hex_to_span_id(s: &str) -> Result<SpanId, Error> {
    hex_to_bytes(s)?
        .try_into()
        .map_err(|_| Error::InvalidInput("span_id must decode to 8 bytes".into()))
}

/// Parse an arbitrary-length hex string (e.g. an OpAMP `instance_uid`) into bytes.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, Error> {
    if s.len() % 2 != 0 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidInput(format!("{s} is not a valid hex string")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| Error::InvalidInput(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_trace_id() {
        let id: TraceId = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10];
        let hex = trace_id_to_hex(&id);
        assert_eq!(hex, "0102030405060708090a0b0c0d0e0f10");
        assert_eq!(hex_to_trace_id(&hex).unwrap(), id);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(parse_trace_id(&[0u8; 8]).is_err());
        assert!(parse_span_id(&[0u8; 16]).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(hex_to_trace_id("not-hex-at-all-not-hex-at-all-x").is_err());
    }
}
