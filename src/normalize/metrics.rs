//! `ResourceMetrics` → catalog/series/datapoint records (spec §4.3 step 5).

use opentelemetry_proto::tonic::metrics::v1::{
    ExponentialHistogramDataPoint, HistogramDataPoint, NumberDataPoint, ResourceMetrics,
    SummaryDataPoint, exemplar, metric::Data, number_data_point,
};

use crate::error::Error;
use crate::interning::Interner;
use crate::models::attribute::attributes_from_otlp;
use crate::models::metric::{DataPoint, DataPointValue, Exemplar, MetricKind, SeriesKey};
use crate::store::Store;

use super::{NormalizeOutcome, intern_resource};

fn exemplars_from_otlp(raw: &[opentelemetry_proto::tonic::metrics::v1::Exemplar]) -> Vec<Exemplar> {
    raw.iter()
        .map(|e| {
            let value = match e.value {
                Some(exemplar::Value::AsDouble(d)) => d,
                Some(exemplar::Value::AsInt(i)) => i as f64,
                None => 0.0,
            };
            Exemplar {
                value,
                timestamp_ns: e.time_unix_nano as i64,
                trace_id: (!e.trace_id.is_empty()).then(|| crate::ids::parse_trace_id(&e.trace_id).ok()).flatten(),
                span_id: (!e.span_id.is_empty()).then(|| crate::ids::parse_span_id(&e.span_id).ok()).flatten(),
                attributes: attributes_from_otlp(&e.filtered_attributes).0,
            }
        })
        .collect()
}

/// Normalize and admit one batch of `ResourceMetrics`. Each metric name is
/// independently admitted against the cardinality bound and kind invariant
/// (spec §3); a rejected name's data points are dropped, not the whole batch.
pub fn ingest_resource_metrics(
    store: &Store,
    interner: &Interner,
    max_cardinality: usize,
    batches: &[ResourceMetrics],
) -> Result<NormalizeOutcome, Error> {
    let mut outcome = NormalizeOutcome::default();

    for rm in batches {
        let (resource_ref, _) = intern_resource(interner, rm.resource.as_ref());

        for sm in &rm.scope_metrics {
            for metric in &sm.metrics {
                let Some(data) = &metric.data else {
                    outcome.rejected += 1;
                    continue;
                };
                let kind = match data {
                    Data::Gauge(_) => MetricKind::Gauge,
                    Data::Sum(_) => MetricKind::Sum,
                    Data::Histogram(_) => MetricKind::Histogram,
                    Data::ExponentialHistogram(_) => MetricKind::ExponentialHistogram,
                    Data::Summary(_) => MetricKind::Summary,
                };

                if let Err(e) = store.admit_metric(&metric.name, kind, &metric.unit, &metric.description, max_cardinality) {
                    tracing::warn!(metric_name = %metric.name, error = %e, "metric rejected at ingest");
                    outcome.rejected += 1;
                    continue;
                }

                let points_written = match data {
                    Data::Gauge(g) => write_number_points(store, &metric.name, resource_ref, &g.data_points)?,
                    Data::Sum(s) => write_number_points(store, &metric.name, resource_ref, &s.data_points)?,
                    Data::Histogram(h) => write_histogram_points(store, &metric.name, resource_ref, &h.data_points)?,
                    Data::ExponentialHistogram(h) => {
                        write_exp_histogram_points(store, &metric.name, resource_ref, &h.data_points)?
                    }
                    Data::Summary(s) => write_summary_points(store, &metric.name, resource_ref, &s.data_points)?,
                };
                outcome.accepted += points_written;
            }
        }
    }
    Ok(outcome)
}

fn write_number_points(
    store: &Store,
    name: &str,
    resource_ref: crate::models::resource::ResourceRef,
    points: &[NumberDataPoint],
) -> Result<usize, Error> {
    let mut written = 0;
    for p in points {
        let value = match p.value {
            Some(number_data_point::Value::AsDouble(d)) => d,
            Some(number_data_point::Value::AsInt(i)) => i as f64,
            None => continue,
        };
        let (attributes, _) = attributes_from_otlp(&p.attributes);
        let series_key = SeriesKey { resource_ref, attributes };
        let dp = DataPoint {
            timestamp_ns: p.time_unix_nano as i64,
            value: DataPointValue::Number(value),
            exemplars: exemplars_from_otlp(&p.exemplars),
        };
        store.put_datapoint(name, series_key, dp)?;
        written += 1;
    }
    Ok(written)
}

fn write_histogram_points(
    store: &Store,
    name: &str,
    resource_ref: crate::models::resource::ResourceRef,
    points: &[HistogramDataPoint],
) -> Result<usize, Error> {
    let mut written = 0;
    for p in points {
        let (attributes, _) = attributes_from_otlp(&p.attributes);
        let series_key = SeriesKey { resource_ref, attributes };
        let dp = DataPoint {
            timestamp_ns: p.time_unix_nano as i64,
            value: DataPointValue::Histogram {
                count: p.count,
                sum: p.sum,
                bucket_counts: p.bucket_counts.clone(),
                explicit_bounds: p.explicit_bounds.clone(),
            },
            exemplars: exemplars_from_otlp(&p.exemplars),
        };
        store.put_datapoint(name, series_key, dp)?;
        written += 1;
    }
    Ok(written)
}

fn write_exp_histogram_points(
    store: &Store,
    name: &str,
    resource_ref: crate::models::resource::ResourceRef,
    points: &[ExponentialHistogramDataPoint],
) -> Result<usize, Error> {
    let mut written = 0;
    for p in points {
        let (attributes, _) = attributes_from_otlp(&p.attributes);
        let series_key = SeriesKey { resource_ref, attributes };
        let positive = p.positive.as_ref();
        let negative = p.negative.as_ref();
        let dp = DataPoint {
            timestamp_ns: p.time_unix_nano as i64,
            value: DataPointValue::ExponentialHistogram {
                count: p.count,
                sum: p.sum,
                scale: p.scale,
                zero_count: p.zero_count,
                positive_offset: positive.map(|b| b.offset).unwrap_or(0),
                positive_bucket_counts: positive.map(|b| b.bucket_counts.clone()).unwrap_or_default(),
                negative_offset: negative.map(|b| b.offset).unwrap_or(0),
                negative_bucket_counts: negative.map(|b| b.bucket_counts.clone()).unwrap_or_default(),
            },
            exemplars: exemplars_from_otlp(&p.exemplars),
        };
        store.put_datapoint(name, series_key, dp)?;
        written += 1;
    }
    Ok(written)
}

fn write_summary_points(
    store: &Store,
    name: &str,
    resource_ref: crate::models::resource::ResourceRef,
    points: &[SummaryDataPoint],
) -> Result<usize, Error> {
    let mut written = 0;
    for p in points {
        let (attributes, _) = attributes_from_otlp(&p.attributes);
        let series_key = SeriesKey { resource_ref, attributes };
        let dp = DataPoint {
            timestamp_ns: p.time_unix_nano as i64,
            value: DataPointValue::Summary {
                count: p.count,
                sum: p.sum,
                quantiles: p.quantile_values.iter().map(|q| (q.quantile, q.value)).collect(),
            },
            exemplars: vec![],
        };
        store.put_datapoint(name, series_key, dp)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::metrics::v1::{Gauge, Metric, ResourceMetrics, ScopeMetrics, metric::Data};

    fn gauge_batch(name: &str, value: f64) -> ResourceMetrics {
        ResourceMetrics {
            resource: None,
            scope_metrics: vec![ScopeMetrics {
                scope: None,
                metrics: vec![Metric {
                    name: name.into(),
                    description: String::new(),
                    unit: String::new(),
                    metadata: vec![],
                    data: Some(Data::Gauge(Gauge {
                        data_points: vec![NumberDataPoint {
                            attributes: vec![],
                            start_time_unix_nano: 0,
                            time_unix_nano: 1_000,
                            exemplars: vec![],
                            flags: 0,
                            value: Some(number_data_point::Value::AsDouble(value)),
                        }],
                    })),
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }

    #[test]
    fn cardinality_drop_stops_at_the_limit() {
        let store = Store::new(1800, 1 << 30);
        let interner = Interner::new();
        let batches = vec![gauge_batch("a", 1.0), gauge_batch("b", 2.0), gauge_batch("c", 3.0)];
        let outcome = ingest_resource_metrics(&store, &interner, 2, &batches).unwrap();
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.rejected, 1);
        assert_eq!(store.metric_count(), 2);
        assert_eq!(store.metrics_dropped(), 1);
    }

    #[test]
    fn kind_conflict_drops_series_not_whole_batch() {
        let store = Store::new(1800, 1 << 30);
        let interner = Interner::new();
        ingest_resource_metrics(&store, &interner, 10, &[gauge_batch("req", 1.0)]).unwrap();

        let sum_batch = ResourceMetrics {
            resource: None,
            scope_metrics: vec![ScopeMetrics {
                scope: None,
                metrics: vec![Metric {
                    name: "req".into(),
                    description: String::new(),
                    unit: String::new(),
                    metadata: vec![],
                    data: Some(Data::Sum(opentelemetry_proto::tonic::metrics::v1::Sum {
                        data_points: vec![],
                        aggregation_temporality: 1,
                        is_monotonic: true,
                    })),
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        };
        let outcome = ingest_resource_metrics(&store, &interner, 10, &[sum_batch]).unwrap();
        assert_eq!(outcome.rejected, 1);
    }
}
