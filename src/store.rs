//! The ephemeral Store (spec §4.2): time-indexed, TTL-bounded, cardinality
//! protected. Keyed maps and ordered-by-score sequences use `dashmap` plus
//! per-key `RwLock<BTreeMap<..>>` so independent keys never contend, per
//! spec §5's fine-grained-locking requirement.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;

use crate::codec;
use crate::error::Error;
use crate::ids::{SpanId, TraceId};
use crate::models::log::Log;
use crate::models::metric::{DataPoint, MetricCatalogEntry, MetricKind, SeriesFingerprint, SeriesKey};
use crate::models::span::{Span, Trace};

fn now_ns() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

struct Entry<T> {
    ingest_time_ns: i64,
    bytes_len: usize,
    value: T,
}

/// Metadata about one metric series (spec §4.2 "Metric series").
#[derive(Clone)]
pub struct SeriesMeta {
    pub key: SeriesKey,
    pub last_update_ns: i64,
}

pub struct Store {
    ttl_ns: i64,
    max_bytes: usize,
    used_bytes: AtomicUsize,

    // --- traces / spans ---
    spans: DashMap<(TraceId, SpanId), Entry<Span>>,
    /// trace_id -> ordered (start_time_ns, span_id), i.e. "Spans by trace".
    spans_by_trace: DashMap<TraceId, RwLock<BTreeMap<(i64, SpanId), ()>>>,
    /// ingest_time_ns -> trace_id, deduplicated: "Trace index by time".
    trace_index_by_time: RwLock<BTreeMap<(i64, TraceId), ()>>,
    /// first-seen ingest time per trace, so trace_index_by_time entries can
    /// be pruned by the same key they were inserted under.
    trace_first_seen: DashMap<TraceId, i64>,
    /// service.name -> ordered (start_time_ns, span_id) -> trace_id.
    spans_by_service: DashMap<String, RwLock<BTreeMap<(i64, SpanId), TraceId>>>,

    // --- logs ---
    logs_by_time: RwLock<BTreeMap<(i64, u64), Entry<Log>>>,
    logs_by_trace: DashMap<TraceId, RwLock<BTreeMap<(i64, u64), ()>>>,
    log_seq: AtomicI64,

    // --- metrics ---
    metric_catalog: DashMap<String, MetricCatalogEntry>,
    metric_series: DashMap<(String, SeriesFingerprint), SeriesMeta>,
    series_datapoints: DashMap<(String, SeriesFingerprint), RwLock<BTreeMap<i64, DataPoint>>>,
    metric_admission_lock: Mutex<()>,
    metrics_dropped: AtomicUsize,
}

pub struct StoreStats {
    pub trace_count: usize,
    pub span_count: usize,
    pub log_count: usize,
    pub metric_count: usize,
    pub metrics_dropped: usize,
    pub used_bytes: usize,
    pub max_bytes: usize,
}

impl Store {
    pub fn new(ttl_seconds: i64, max_bytes: usize) -> Self {
        Self {
            ttl_ns: ttl_seconds.saturating_mul(1_000_000_000),
            max_bytes,
            used_bytes: AtomicUsize::new(0),
            spans: DashMap::new(),
            spans_by_trace: DashMap::new(),
            trace_index_by_time: RwLock::new(BTreeMap::new()),
            trace_first_seen: DashMap::new(),
            spans_by_service: DashMap::new(),
            logs_by_time: RwLock::new(BTreeMap::new()),
            logs_by_trace: DashMap::new(),
            log_seq: AtomicI64::new(0),
            metric_catalog: DashMap::new(),
            metric_series: DashMap::new(),
            series_datapoints: DashMap::new(),
            metric_admission_lock: Mutex::new(()),
            metrics_dropped: AtomicUsize::new(0),
        }
    }

    fn is_expired(&self, ingest_time_ns: i64, now: i64) -> bool {
        ingest_time_ns + self.ttl_ns < now
    }

    fn charge(&self, bytes: usize) -> Result<(), Error> {
        let mut current = self.used_bytes.load(Ordering::Relaxed);
        loop {
            if current.saturating_add(bytes) > self.max_bytes {
                return Err(Error::OutOfCapacity);
            }
            match self.used_bytes.compare_exchange_weak(
                current,
                current + bytes,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn uncharge(&self, bytes: usize) {
        self.used_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    // ---------------- spans / traces ----------------

    /// Idempotent for identical `(trace_id, span_id)`; a later arrival with
    /// the same key wins only if its `ingest_time_ns` is newer (spec §4.2
    /// write contract).
    pub fn put_span(&self, span: Span) -> Result<(), Error> {
        let key = (span.trace_id, span.span_id);
        let ingest_time_ns = span.ingest_time_ns;
        let start_time_ns = span.start_time_ns;
        let span_id = span.span_id;
        let trace_id = span.trace_id;

        let bytes_len = codec::encode(&span)?.len();
        self.charge(bytes_len)?;

        let mut inserted = true;
        match self.spans.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                if occ.get().ingest_time_ns <= ingest_time_ns {
                    let old_len = occ.get().bytes_len;
                    occ.insert(Entry { ingest_time_ns, bytes_len, value: span });
                    self.uncharge(old_len);
                } else {
                    inserted = false;
                    self.uncharge(bytes_len);
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vac) => {
                vac.insert(Entry { ingest_time_ns, bytes_len, value: span });
            }
        }
        if !inserted {
            return Ok(());
        }

        self.spans_by_trace
            .entry(trace_id)
            .or_insert_with(|| RwLock::new(BTreeMap::new()))
            .write()
            .unwrap()
            .insert((start_time_ns, span_id), ());

        self.trace_first_seen.entry(trace_id).or_insert(ingest_time_ns);
        let first_seen = *self.trace_first_seen.get(&trace_id).unwrap();
        self.trace_index_by_time.write().unwrap().insert((first_seen, trace_id), ());

        Ok(())
    }

    /// Record the span under its service's secondary index. Split from
    /// `put_span` because the service name is resolved by the caller via the
    /// resource interner, which `Store` does not own.
    pub fn index_span_by_service(&self, service_name: &str, span_id: SpanId, trace_id: TraceId, start_time_ns: i64) {
        self.spans_by_service
            .entry(service_name.to_string())
            .or_insert_with(|| RwLock::new(BTreeMap::new()))
            .write()
            .unwrap()
            .insert((start_time_ns, span_id), trace_id);
    }

    pub fn get_span(&self, trace_id: TraceId, span_id: SpanId) -> Option<Span> {
        let now = now_ns();
        self.spans.get(&(trace_id, span_id)).and_then(|e| {
            if self.is_expired(e.ingest_time_ns, now) { None } else { Some(e.value.clone()) }
        })
    }

    pub fn get_trace(&self, trace_id: TraceId) -> Option<Trace> {
        let now = now_ns();
        let index = self.spans_by_trace.get(&trace_id)?;
        let ids: Vec<(i64, SpanId)> = index.read().unwrap().keys().copied().collect();
        let spans: Vec<Span> = ids
            .into_iter()
            .filter_map(|(_, span_id)| self.get_span_unchecked(trace_id, span_id, now))
            .collect();
        if spans.is_empty() { None } else { Some(Trace { trace_id, spans }) }
    }

    fn get_span_unchecked(&self, trace_id: TraceId, span_id: SpanId, now: i64) -> Option<Span> {
        self.spans.get(&(trace_id, span_id)).and_then(|e| {
            if self.is_expired(e.ingest_time_ns, now) { None } else { Some(e.value.clone()) }
        })
    }

    /// Most recent `limit` traces by first-seen ingest time, descending.
    pub fn list_recent_traces(&self, limit: usize) -> Vec<Trace> {
        let now = now_ns();
        let keys: Vec<(i64, TraceId)> = self
            .trace_index_by_time
            .read()
            .unwrap()
            .iter()
            .rev()
            .map(|(k, _)| *k)
            .collect();

        let mut out = Vec::with_capacity(limit);
        for (ingest_time_ns, trace_id) in keys {
            if self.is_expired(ingest_time_ns, now) {
                continue;
            }
            if let Some(trace) = self.get_trace(trace_id) {
                out.push(trace);
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    /// Most recent `limit` spans, optionally filtered by `service_name`.
    pub fn list_recent_spans(&self, service_name: Option<&str>, limit: usize) -> Vec<Span> {
        let now = now_ns();
        match service_name {
            Some(name) => {
                let Some(index) = self.spans_by_service.get(name) else { return vec![] };
                let entries: Vec<(i64, SpanId, TraceId)> = index
                    .read()
                    .unwrap()
                    .iter()
                    .rev()
                    .map(|((t, s), trace)| (*t, *s, *trace))
                    .collect();
                entries
                    .into_iter()
                    .filter_map(|(_, span_id, trace_id)| self.get_span_unchecked(trace_id, span_id, now))
                    .take(limit)
                    .collect()
            }
            None => {
                let mut out: Vec<Span> = self
                    .spans
                    .iter()
                    .filter(|e| !self.is_expired(e.ingest_time_ns, now))
                    .map(|e| e.value.clone())
                    .collect();
                out.sort_by(|a, b| b.start_time_ns.cmp(&a.start_time_ns));
                out.truncate(limit);
                out
            }
        }
    }

    /// Streams every non-expired span without materializing the whole store
    /// at once into a single intermediate buffer beyond the closure's needs
    /// (spec §4.5 cost bound).
    pub fn for_each_span(&self, mut f: impl FnMut(&Span)) {
        let now = now_ns();
        for entry in self.spans.iter() {
            if !self.is_expired(entry.ingest_time_ns, now) {
                f(&entry.value);
            }
        }
    }

    // ---------------- logs ----------------

    pub fn put_log(&self, log: Log) -> Result<(), Error> {
        let bytes_len = codec::encode(&log)?.len();
        self.charge(bytes_len)?;

        let seq = self.log_seq.fetch_add(1, Ordering::Relaxed) as u64;
        let ts = log.timestamp_ns;
        let trace_id = log.trace_id;

        self.logs_by_time.write().unwrap().insert(
            (ts, seq),
            Entry { ingest_time_ns: log.ingest_time_ns, bytes_len, value: log },
        );

        if let Some(trace_id) = trace_id {
            self.logs_by_trace
                .entry(trace_id)
                .or_insert_with(|| RwLock::new(BTreeMap::new()))
                .write()
                .unwrap()
                .insert((ts, seq), ());
        }
        Ok(())
    }

    pub fn list_recent_logs(&self, trace_id: Option<TraceId>, severity: Option<&str>, limit: usize) -> Vec<Log> {
        let now = now_ns();
        let by_time = self.logs_by_time.read().unwrap();

        let matches = |log: &Log| severity.is_none_or(|s| log.severity_name().eq_ignore_ascii_case(s));

        match trace_id {
            Some(trace_id) => {
                let Some(index) = self.logs_by_trace.get(&trace_id) else { return vec![] };
                let keys: Vec<(i64, u64)> = index.read().unwrap().keys().rev().copied().collect();
                keys.into_iter()
                    .filter_map(|k| by_time.get(&k))
                    .filter(|e| !self.is_expired(e.ingest_time_ns, now))
                    .map(|e| &e.value)
                    .filter(|l| matches(l))
                    .take(limit)
                    .cloned()
                    .collect()
            }
            None => by_time
                .iter()
                .rev()
                .filter(|(_, e)| !self.is_expired(e.ingest_time_ns, now))
                .map(|(_, e)| &e.value)
                .filter(|l| matches(l))
                .take(limit)
                .cloned()
                .collect(),
        }
    }

    // ---------------- metrics ----------------

    /// Admit a new metric name (or validate kind against an existing one).
    /// Admission of a brand-new name is serialized via `metric_admission_lock`
    /// (spec §5); the global distinct-name bound is the catalog's own length.
    pub fn admit_metric(&self, name: &str, kind: MetricKind, unit: &str, description: &str, max_cardinality: usize) -> Result<(), Error> {
        if let Some(existing) = self.metric_catalog.get(name) {
            if existing.kind != kind {
                return Err(Error::MetricKindConflict {
                    name: name.to_string(),
                    existing: existing.kind.as_str().to_string(),
                    incoming: kind.as_str().to_string(),
                });
            }
            return Ok(());
        }

        let _guard = self.metric_admission_lock.lock().unwrap();
        if self.metric_catalog.contains_key(name) {
            return Ok(());
        }
        if self.metric_catalog.len() >= max_cardinality {
            self.metrics_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(metric_name = %name, "metric cardinality limit reached, dropping");
            return Err(Error::CardinalityExceeded(name.to_string()));
        }
        self.metric_catalog.insert(
            name.to_string(),
            MetricCatalogEntry { name: name.to_string(), kind, unit: unit.to_string(), description: description.to_string() },
        );
        Ok(())
    }

    pub fn put_datapoint(&self, metric_name: &str, series_key: SeriesKey, point: DataPoint) -> Result<(), Error> {
        if !self.metric_catalog.contains_key(metric_name) {
            // Silently discarded per spec §4.2: "subsequent data points for
            // that name are discarded silently" once rejected.
            return Ok(());
        }
        let fp = series_key.fingerprint();
        let series_id = (metric_name.to_string(), fp);
        let now = point.timestamp_ns;

        self.metric_series
            .entry(series_id.clone())
            .and_modify(|m| m.last_update_ns = m.last_update_ns.max(now))
            .or_insert_with(|| SeriesMeta { key: series_key, last_update_ns: now });

        self.series_datapoints
            .entry(series_id)
            .or_insert_with(|| RwLock::new(BTreeMap::new()))
            .write()
            .unwrap()
            .insert(point.timestamp_ns, point);
        Ok(())
    }

    pub fn metric_catalog_entries(&self) -> Vec<MetricCatalogEntry> {
        self.metric_catalog.iter().map(|e| e.value().clone()).collect()
    }

    pub fn series_for_metric(&self, metric_name: &str) -> Vec<SeriesMeta> {
        self.metric_series
            .iter()
            .filter(|e| e.key().0 == metric_name)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn datapoints_for_series(&self, metric_name: &str, fp: SeriesFingerprint) -> Vec<DataPoint> {
        self.series_datapoints
            .get(&(metric_name.to_string(), fp))
            .map(|idx| idx.read().unwrap().values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn metrics_dropped(&self) -> usize {
        self.metrics_dropped.load(Ordering::Relaxed)
    }

    pub fn metric_count(&self) -> usize {
        self.metric_catalog.len()
    }

    // ---------------- stats / sweep ----------------

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            trace_count: self.trace_first_seen.len(),
            span_count: self.spans.len(),
            log_count: self.logs_by_time.read().unwrap().len(),
            metric_count: self.metric_count(),
            metrics_dropped: self.metrics_dropped(),
            used_bytes: self.used_bytes.load(Ordering::Relaxed),
            max_bytes: self.max_bytes,
        }
    }

    /// Background TTL reclamation pass (spec §4.2, §5 "TTL sweep is
    /// scheduled"). Complements the lazy on-read filtering above.
    pub fn sweep_expired(&self) {
        let now = now_ns();
        let mut reclaimed = 0usize;

        self.spans.retain(|_, e| {
            let keep = !self.is_expired(e.ingest_time_ns, now);
            if !keep {
                reclaimed += e.bytes_len;
            }
            keep
        });

        {
            let mut by_time = self.logs_by_time.write().unwrap();
            let expired: Vec<(i64, u64)> = by_time
                .iter()
                .filter(|(_, e)| self.is_expired(e.ingest_time_ns, now))
                .map(|(k, _)| *k)
                .collect();
            for key in expired {
                if let Some(e) = by_time.remove(&key) {
                    reclaimed += e.bytes_len;
                }
            }
        }

        if reclaimed > 0 {
            self.uncharge(reclaimed);
            tracing::debug!(reclaimed_bytes = reclaimed, "ttl sweep reclaimed store bytes");
        }
    }
}

/// Spawns the periodic TTL sweep task (spec §5), ticking every `ttl/4`
/// seconds, in the teacher's `spawn_*_engine` background-task idiom.
pub fn spawn_ttl_sweeper(store: Arc<Store>, ttl_seconds: i64) -> tokio::task::JoinHandle<()> {
    let interval = std::cmp::max(1, ttl_seconds / 4) as u64;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
        loop {
            ticker.tick().await;
            store.sweep_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::Attributes;
    use crate::models::span::{SpanKind, Status, StatusCode};

    fn span(trace: u8, id: u8, start: i64, ingest: i64) -> Span {
        Span {
            trace_id: [trace; 16],
            span_id: [id; 8],
            parent_span_id: None,
            name: "op".into(),
            kind: SpanKind::Internal,
            start_time_ns: start,
            end_time_ns: start + 1,
            status: Status { code: StatusCode::Ok, message: String::new() },
            attributes: Attributes::new(),
            events: vec![],
            links: vec![],
            resource_ref: 1,
            scope_ref: 1,
            ingest_time_ns: ingest,
        }
    }

    #[test]
    fn duplicate_span_key_does_not_duplicate_trace() {
        let store = Store::new(1800, 1 << 30);
        store.put_span(span(1, 1, 100, 1000)).unwrap();
        store.put_span(span(1, 1, 100, 1000)).unwrap();
        let trace = store.get_trace([1u8; 16]).unwrap();
        assert_eq!(trace.spans.len(), 1);
    }

    #[test]
    fn trace_reassembly_returns_exactly_member_spans() {
        let store = Store::new(1800, 1 << 30);
        store.put_span(span(2, 1, 100, 1000)).unwrap();
        store.put_span(span(2, 2, 200, 1000)).unwrap();
        store.put_span(span(3, 1, 100, 1000)).unwrap();

        let trace = store.get_trace([2u8; 16]).unwrap();
        assert_eq!(trace.spans.len(), 2);
    }

    #[test]
    fn ttl_expires_entries() {
        let store = Store::new(0, 1 << 30);
        store.put_span(span(4, 1, 100, 0)).unwrap();
        assert!(store.get_trace([4u8; 16]).is_none());
    }

    #[test]
    fn cardinality_bound_rejects_overflow() {
        let store = Store::new(1800, 1 << 30);
        store.admit_metric("a", MetricKind::Gauge, "", "", 2).unwrap();
        store.admit_metric("b", MetricKind::Gauge, "", "", 2).unwrap();
        let err = store.admit_metric("c", MetricKind::Gauge, "", "", 2).unwrap_err();
        assert!(matches!(err, Error::CardinalityExceeded(_)));
        assert_eq!(store.metric_count(), 2);
        assert_eq!(store.metrics_dropped(), 1);
    }

    #[test]
    fn metric_kind_conflict_is_rejected() {
        let store = Store::new(1800, 1 << 30);
        store.admit_metric("req", MetricKind::Sum, "", "", 10).unwrap();
        let err = store.admit_metric("req", MetricKind::Gauge, "", "", 10).unwrap_err();
        assert!(matches!(err, Error::MetricKindConflict { .. }));
    }

    #[test]
    fn out_of_capacity_rejects_further_writes() {
        let store = Store::new(1800, 1);
        let err = store.put_span(span(5, 1, 100, 1000)).unwrap_err();
        assert!(matches!(err, Error::OutOfCapacity));
    }
}
