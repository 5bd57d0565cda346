//! Cardinality Analysis per metric (spec §4.5).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::store::Store;

const ACTIVE_WINDOW_NS: i64 = 3_600 * 1_000_000_000;
const TOP_N: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct LabelCardinality {
    pub key: String,
    pub cardinality: usize,
    pub top_values: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardinalityReport {
    pub metric_name: String,
    pub series_count: usize,
    pub active_series_count: usize,
    pub label_dimensions: Vec<String>,
    pub labels: Vec<LabelCardinality>,
}

/// `now_ns` is injected by the caller (spec §9 open question: "active
/// series (1h)" is defined as "at least one datapoint with
/// `timestamp_ns >= now - 3600s`").
pub fn cardinality_report(store: &Store, metric_name: &str, now_ns: i64) -> Option<CardinalityReport> {
    let series = store.series_for_metric(metric_name);
    if series.is_empty() {
        return None;
    }

    let mut value_counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
    let mut dimensions: BTreeSet<String> = BTreeSet::new();
    let mut active = 0usize;

    for s in &series {
        if s.last_update_ns >= now_ns - ACTIVE_WINDOW_NS {
            active += 1;
        }
        for (k, v) in &s.key.attributes {
            dimensions.insert(k.clone());
            *value_counts.entry(k.clone()).or_default().entry(v.as_display()).or_insert(0) += 1;
        }
    }

    let labels: Vec<LabelCardinality> = dimensions
        .iter()
        .map(|key| {
            let counts = value_counts.get(key).cloned().unwrap_or_default();
            let mut top: Vec<(String, usize)> = counts.into_iter().collect();
            top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let cardinality = top.len();
            top.truncate(TOP_N);
            LabelCardinality { key: key.clone(), cardinality, top_values: top }
        })
        .collect();

    Some(CardinalityReport {
        metric_name: metric_name.to_string(),
        series_count: series.len(),
        active_series_count: active,
        label_dimensions: dimensions.into_iter().collect(),
        labels,
    })
}

/// Snapshot of every admitted metric's cardinality, used by `/api/stats`.
pub fn cardinality_summary(store: &Store) -> BTreeMap<String, usize> {
    store
        .metric_catalog_entries()
        .into_iter()
        .map(|e| (e.name.clone(), store.series_for_metric(&e.name).len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::{AttrValue, Attributes};
    use crate::models::metric::{DataPoint, DataPointValue, MetricKind, SeriesKey};

    #[test]
    fn reports_label_dimensions_and_active_series() {
        let store = Store::new(1800, 1 << 30);
        store.admit_metric("http.requests", MetricKind::Sum, "1", "", 100).unwrap();

        for (route, ts) in [("/a", 1_000i64), ("/b", 2_000)] {
            let mut attrs = Attributes::new();
            attrs.insert("route".into(), AttrValue::String(route.into()));
            let key = SeriesKey { resource_ref: 1, attributes: attrs };
            store
                .put_datapoint("http.requests", key, DataPoint { timestamp_ns: ts, value: DataPointValue::Number(1.0), exemplars: vec![] })
                .unwrap();
        }

        let report = cardinality_report(&store, "http.requests", 3_600_000_000_000).unwrap();
        assert_eq!(report.series_count, 2);
        assert_eq!(report.label_dimensions, vec!["route".to_string()]);
        assert_eq!(report.active_series_count, 2);
    }
}
