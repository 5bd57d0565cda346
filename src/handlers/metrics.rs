//! Metric catalog and series query handlers (spec §4.6: `/api/metrics`, `/api/metrics/{name}`).

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::error::Error;
use crate::ids::{hex_encode, span_id_to_hex, trace_id_to_hex};
use crate::models::attribute::attributes_to_json;
use crate::models::metric::{DataPoint, DataPointValue, Exemplar, MetricCatalogEntry, expand_exponential_bounds};

/// `GET /api/metrics`: the metric catalog (spec §3 "a name carries exactly one kind").
pub async fn list_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let entries: Vec<MetricCatalogEntry> = state.store.metric_catalog_entries();
    Json(entries)
}

#[derive(Debug, Serialize)]
struct ExemplarJson {
    value: f64,
    timestamp_ns: i64,
    trace_id: Option<String>,
    span_id: Option<String>,
    attributes: Value,
}

fn exemplar_to_json(e: &Exemplar) -> ExemplarJson {
    ExemplarJson {
        value: e.value,
        timestamp_ns: e.timestamp_ns,
        trace_id: e.trace_id.map(|t| trace_id_to_hex(&t)),
        span_id: e.span_id.map(|s| span_id_to_hex(&s)),
        attributes: attributes_to_json(&e.attributes),
    }
}

#[derive(Debug, Serialize)]
struct DataPointJson {
    timestamp_ns: i64,
    value: Value,
    exemplars: Vec<ExemplarJson>,
}

fn value_to_json(value: &DataPointValue) -> Value {
    match value {
        DataPointValue::Number(n) => serde_json::json!(n),
        DataPointValue::Histogram { count, sum, bucket_counts, explicit_bounds } => serde_json::json!({
            "count": count,
            "sum": sum,
            "bucketCounts": bucket_counts,
            "explicitBounds": explicit_bounds,
        }),
        DataPointValue::ExponentialHistogram {
            count,
            sum,
            scale,
            zero_count,
            positive_offset,
            positive_bucket_counts,
            negative_offset,
            negative_bucket_counts,
        } => {
            let positive_bounds = expand_exponential_bounds(*scale, *positive_offset, positive_bucket_counts.len());
            let negative_bounds = expand_exponential_bounds(*scale, *negative_offset, negative_bucket_counts.len());
            serde_json::json!({
                "count": count,
                "sum": sum,
                "scale": scale,
                "zeroCount": zero_count,
                "positiveBuckets": positive_bucket_counts.iter().zip(positive_bounds).map(|(c, (lo, hi))| serde_json::json!({"count": c, "lowerBound": lo, "upperBound": hi})).collect::<Vec<_>>(),
                "negativeBuckets": negative_bucket_counts.iter().zip(negative_bounds).map(|(c, (lo, hi))| serde_json::json!({"count": c, "lowerBound": lo, "upperBound": hi})).collect::<Vec<_>>(),
            })
        }
        DataPointValue::Summary { count, sum, quantiles } => serde_json::json!({
            "count": count,
            "sum": sum,
            "quantiles": quantiles.iter().map(|(q, v)| serde_json::json!({"quantile": q, "value": v})).collect::<Vec<_>>(),
        }),
    }
}

fn datapoint_to_json(dp: &DataPoint) -> DataPointJson {
    DataPointJson {
        timestamp_ns: dp.timestamp_ns,
        value: value_to_json(&dp.value),
        exemplars: dp.exemplars.iter().map(exemplar_to_json).collect(),
    }
}

#[derive(Debug, Serialize)]
struct SeriesJson {
    fingerprint: String,
    resource: Value,
    attributes: Value,
    last_update_ns: i64,
    datapoints: Vec<DataPointJson>,
}

/// Extracts the `resource.<key>=<value>` filters from the raw query string,
/// stripping the `resource.` prefix so callers can match directly against a
/// resource's attribute map.
fn resource_filters(params: &HashMap<String, String>) -> Vec<(&str, &str)> {
    params
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("resource.").map(|key| (key, v.as_str())))
        .collect()
}

fn resource_matches(resource: Option<&crate::models::resource::Resource>, filters: &[(&str, &str)]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let Some(resource) = resource else { return false };
    filters.iter().all(|&(key, want)| resource.attributes.get(key).is_some_and(|v| v.as_display() == want))
}

/// `GET /api/metrics/{name}?resource.<key>=<value>`: every series for a
/// metric name, optionally filtered to series whose resolved resource
/// matches every `resource.*` query param (spec §4.6), newest data points
/// first.
pub async fn get_metric(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, Error> {
    let series = state.store.series_for_metric(&name);
    if series.is_empty() {
        return Err(Error::NotFound(format!("metric {name} not found")));
    }
    let filters = resource_filters(&params);

    let out: Vec<SeriesJson> = series
        .into_iter()
        .filter_map(|meta| {
            let resolved = state.interner.get_resource(meta.key.resource_ref);
            if !resource_matches(resolved.as_ref(), &filters) {
                return None;
            }
            let fp = meta.key.fingerprint();
            let resource = resolved.map(|r| attributes_to_json(&r.attributes)).unwrap_or(Value::Null);
            let mut points = state.store.datapoints_for_series(&name, fp);
            points.sort_by(|a, b| b.timestamp_ns.cmp(&a.timestamp_ns));
            Some(SeriesJson {
                fingerprint: hex_encode(&fp.to_be_bytes()),
                resource,
                attributes: attributes_to_json(&meta.key.attributes),
                last_update_ns: meta.last_update_ns,
                datapoints: points.iter().map(datapoint_to_json).collect(),
            })
        })
        .collect();

    Ok(Json(out))
}
