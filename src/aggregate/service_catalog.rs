//! Service Catalog: per-service RED metrics (spec §4.5).

use std::collections::HashMap;

use serde::Serialize;

use crate::interning::Interner;
use crate::models::span::StatusCode;
use crate::store::Store;

use super::{percentile_from_histogram, percentile_from_samples};

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCatalogEntry {
    pub service_name: String,
    pub span_count: u64,
    pub trace_count: u64,
    pub first_seen_ns: i64,
    pub last_seen_ns: i64,
    pub rate_per_sec: f64,
    pub error_rate_pct: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

struct Accumulator {
    span_count: u64,
    error_count: u64,
    trace_ids: std::collections::HashSet<crate::ids::TraceId>,
    first_seen_ns: i64,
    last_seen_ns: i64,
    durations_ms: Vec<f64>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            span_count: 0,
            error_count: 0,
            trace_ids: std::collections::HashSet::new(),
            first_seen_ns: i64::MAX,
            last_seen_ns: i64::MIN,
            durations_ms: Vec::new(),
        }
    }
}

/// Build the Service Catalog by streaming the span index once. `window_seconds`
/// is the retention window used to compute request rate (spec §4.5 "rate over
/// the window"). Spans whose `service.name` is `self_service_name` are
/// excluded per spec §9's self-filter invariant.
pub fn service_catalog(store: &Store, interner: &Interner, self_service_name: &str, window_seconds: f64) -> Vec<ServiceCatalogEntry> {
    let mut acc: HashMap<String, Accumulator> = HashMap::new();

    store.for_each_span(|span| {
        let Some(service_name) = interner.service_name_of(span.resource_ref) else { return };
        if service_name == self_service_name {
            return;
        }
        let entry = acc.entry(service_name).or_insert_with(Accumulator::new);
        entry.span_count += 1;
        entry.trace_ids.insert(span.trace_id);
        entry.first_seen_ns = entry.first_seen_ns.min(span.start_time_ns);
        entry.last_seen_ns = entry.last_seen_ns.max(span.start_time_ns);
        entry.durations_ms.push(span.duration_ns() as f64 / 1_000_000.0);
        if span.status.code == StatusCode::Error {
            entry.error_count += 1;
        }
    });

    let mut out: Vec<ServiceCatalogEntry> = acc
        .into_iter()
        .map(|(service_name, mut a)| {
            a.durations_ms.sort_by(|x, y| x.partial_cmp(y).unwrap());

            let hist = find_duration_histogram(store, interner, &service_name);
            let (p50, p95, p99) = match hist {
                Some((counts, bounds)) => (
                    percentile_from_histogram(&counts, &bounds, 0.50),
                    percentile_from_histogram(&counts, &bounds, 0.95),
                    percentile_from_histogram(&counts, &bounds, 0.99),
                ),
                None => (
                    percentile_from_samples(&a.durations_ms, 0.50),
                    percentile_from_samples(&a.durations_ms, 0.95),
                    percentile_from_samples(&a.durations_ms, 0.99),
                ),
            };

            ServiceCatalogEntry {
                service_name,
                span_count: a.span_count,
                trace_count: a.trace_ids.len() as u64,
                first_seen_ns: a.first_seen_ns,
                last_seen_ns: a.last_seen_ns,
                rate_per_sec: a.span_count as f64 / window_seconds.max(1.0),
                error_rate_pct: if a.span_count > 0 { a.error_count as f64 / a.span_count as f64 * 100.0 } else { 0.0 },
                p50_ms: p50,
                p95_ms: p95,
                p99_ms: p99,
            }
        })
        .collect();

    out.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    out
}

/// Look for a spanmetrics-style duration histogram for this service: any
/// `Histogram`-kind metric whose series are attached to one of the service's
/// resources, named by the OTel semantic convention suffix `duration`.
fn find_duration_histogram(store: &Store, interner: &Interner, service_name: &str) -> Option<(Vec<u64>, Vec<f64>)> {
    let resource_refs = interner.resource_refs_for_service(service_name);
    if resource_refs.is_empty() {
        return None;
    }

    for entry in store.metric_catalog_entries() {
        if entry.kind != crate::models::metric::MetricKind::Histogram {
            continue;
        }
        if !entry.name.ends_with("duration") && !entry.name.ends_with("latency") {
            continue;
        }
        let series: Vec<_> = store
            .series_for_metric(&entry.name)
            .into_iter()
            .filter(|s| resource_refs.contains(&s.key.resource_ref))
            .collect();
        if series.is_empty() {
            continue;
        }

        let mut merged_counts: Vec<u64> = vec![];
        let mut bounds: Vec<f64> = vec![];
        for s in &series {
            let fp = s.key.fingerprint();
            for dp in store.datapoints_for_series(&entry.name, fp) {
                if let crate::models::metric::DataPointValue::Histogram { bucket_counts, explicit_bounds, .. } = dp.value {
                    if merged_counts.is_empty() {
                        merged_counts = vec![0; bucket_counts.len()];
                        bounds = explicit_bounds;
                    }
                    if bucket_counts.len() == merged_counts.len() {
                        for (i, c) in bucket_counts.into_iter().enumerate() {
                            merged_counts[i] += c;
                        }
                    }
                }
            }
        }
        if !merged_counts.is_empty() {
            return Some((merged_counts, bounds));
        }
    }
    None
}
