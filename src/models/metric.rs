//! Metric catalog, series and datapoint records (spec §3, §4.3 step 5).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::{SpanId, TraceId};
use crate::models::attribute::Attributes;
use crate::models::resource::ResourceRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    Gauge,
    Sum,
    Histogram,
    Summary,
    ExponentialHistogram,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Sum => "sum",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::ExponentialHistogram => "exponential_histogram",
        }
    }
}

/// One entry in the metric catalog: a name carries exactly one kind for the
/// lifetime of a retention window (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCatalogEntry {
    pub name: String,
    pub kind: MetricKind,
    pub unit: String,
    pub description: String,
}

pub type SeriesFingerprint = u64;

/// Identity of one data-point sequence of a metric: its resource plus its
/// sorted attribute set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesKey {
    pub resource_ref: ResourceRef,
    pub attributes: Attributes,
}

impl SeriesKey {
    /// Stable hash over resource + sorted attributes (`Attributes` is a
    /// `BTreeMap`, so iteration order is already deterministic).
    pub fn fingerprint(&self) -> SeriesFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.resource_ref.to_be_bytes());
        for (k, v) in &self.attributes {
            hasher.update(k.as_bytes());
            hasher.update([0u8]);
            hasher.update(v.as_display().as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        u64::from_be_bytes(digest[0..8].try_into().unwrap())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exemplar {
    pub value: f64,
    pub timestamp_ns: i64,
    pub trace_id: Option<TraceId>,
    pub span_id: Option<SpanId>,
    pub attributes: Attributes,
}

/// The type-appropriate payload of one data point. Exponential-histogram
/// bucket layouts are kept in their native (base/scale/offset) form per spec
/// §4.3 and expanded to explicit bounds only when a query asks for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataPointValue {
    Number(f64),
    Histogram {
        count: u64,
        sum: Option<f64>,
        bucket_counts: Vec<u64>,
        explicit_bounds: Vec<f64>,
    },
    ExponentialHistogram {
        count: u64,
        sum: Option<f64>,
        scale: i32,
        zero_count: u64,
        positive_offset: i32,
        positive_bucket_counts: Vec<u64>,
        negative_offset: i32,
        negative_bucket_counts: Vec<u64>,
    },
    Summary {
        count: u64,
        sum: f64,
        quantiles: Vec<(f64, f64)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp_ns: i64,
    pub value: DataPointValue,
    pub exemplars: Vec<Exemplar>,
}

/// Expand an exponential-histogram bucket layout into explicit lower/upper
/// bounds, base = 2^(2^-scale), used only at query time (spec §4.3).
pub fn expand_exponential_bounds(scale: i32, offset: i32, bucket_count: usize) -> Vec<(f64, f64)> {
    let base = 2f64.powf(2f64.powi(-scale));
    (0..bucket_count)
        .map(|i| {
            let index = offset + i as i32;
            (base.powi(index), base.powi(index + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::AttrValue;

    #[test]
    fn fingerprint_is_stable_across_attribute_insertion_order() {
        let mut a = Attributes::new();
        a.insert("route".into(), AttrValue::String("/x".into()));
        a.insert("method".into(), AttrValue::String("GET".into()));

        let mut b = Attributes::new();
        b.insert("method".into(), AttrValue::String("GET".into()));
        b.insert("route".into(), AttrValue::String("/x".into()));

        let k1 = SeriesKey { resource_ref: 1, attributes: a };
        let k2 = SeriesKey { resource_ref: 1, attributes: b };
        assert_eq!(k1.fingerprint(), k2.fingerprint());
    }

    #[test]
    fn different_resource_changes_fingerprint() {
        let attrs = Attributes::new();
        let k1 = SeriesKey { resource_ref: 1, attributes: attrs.clone() };
        let k2 = SeriesKey { resource_ref: 2, attributes: attrs };
        assert_ne!(k1.fingerprint(), k2.fingerprint());
    }
}
