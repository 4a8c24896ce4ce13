//! Prometheus metrics collection for tsviewd.
//!
//! Tracks how often the snapshot cache answers from memory versus going
//! upstream, how upstream fetches fare, and the size of the last tree.
//!
//! - `tsview_cache_hits_total` - Requests served from a fresh snapshot
//! - `tsview_coalesced_waits_total` - Requests that joined a running fetch
//! - `tsview_stale_served_total` - Requests answered with a stale snapshot
//! - `tsview_upstream_fetch_total{backend}` - Upstream fetches started
//! - `tsview_upstream_fetch_errors_total{backend,code}` - Failed fetches
//! - `tsview_fetch_duration_seconds{backend}` - Fetch latency histogram
//! - `tsview_tree_channels` / `tsview_tree_clients` - Last built tree size
//!
//! Recording is a no-op until [`init`] has run.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{Once, OnceLock};

use crate::tree::TreeStats;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Cache
// ========================================================================

/// Requests answered from a fresh snapshot.
pub static CACHE_HITS: OnceLock<IntCounter> = OnceLock::new();

/// Requests that waited on a fetch started by someone else.
pub static COALESCED_WAITS: OnceLock<IntCounter> = OnceLock::new();

/// Requests answered with a stale snapshot after a failed fetch.
pub static STALE_SERVED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Upstream
// ========================================================================

/// Upstream fetches by backend.
pub static UPSTREAM_FETCHES: OnceLock<IntCounterVec> = OnceLock::new();

/// Failed upstream fetches by backend and error code.
pub static UPSTREAM_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Upstream fetch latency by backend.
pub static FETCH_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

// ========================================================================
// Tree
// ========================================================================

/// Channels in the last built tree.
pub static TREE_CHANNELS: OnceLock<IntGauge> = OnceLock::new();

/// Regular clients in the last built tree.
pub static TREE_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call at startup before serving `/metrics`. Later calls are no-ops.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(register_all);
}

fn register_all() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(CACHE_HITS, IntCounter::new("tsview_cache_hits_total", "Requests served from a fresh snapshot"));
    register!(COALESCED_WAITS, IntCounter::new("tsview_coalesced_waits_total", "Requests that joined an in-flight fetch"));
    register!(STALE_SERVED, IntCounter::new("tsview_stale_served_total", "Requests served a stale snapshot after a failed fetch"));

    register!(UPSTREAM_FETCHES, IntCounterVec::new(Opts::new("tsview_upstream_fetch_total", "Upstream fetches started"), &["backend"]));
    register!(UPSTREAM_ERRORS, IntCounterVec::new(Opts::new("tsview_upstream_fetch_errors_total", "Upstream fetches that failed"), &["backend", "code"]));
    register!(FETCH_LATENCY, HistogramVec::new(
        HistogramOpts::new("tsview_fetch_duration_seconds", "Upstream fetch latency")
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["backend"]));

    register!(TREE_CHANNELS, IntGauge::new("tsview_tree_channels", "Channels in the last built tree"));
    register!(TREE_CLIENTS, IntGauge::new("tsview_tree_clients", "Regular clients in the last built tree"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
pub fn record_cache_hit() {
    inc(&CACHE_HITS);
}

#[inline]
pub fn record_coalesced_wait() {
    inc(&COALESCED_WAITS);
}

#[inline]
pub fn record_stale_served() {
    inc(&STALE_SERVED);
}

/// Record a finished upstream fetch with its latency.
#[inline]
pub fn record_fetch(backend: &str, duration_secs: f64) {
    if let Some(c) = UPSTREAM_FETCHES.get() {
        c.with_label_values(&[backend]).inc();
    }
    if let Some(h) = FETCH_LATENCY.get() {
        h.with_label_values(&[backend]).observe(duration_secs);
    }
}

/// Record a failed upstream fetch.
#[inline]
pub fn record_fetch_error(backend: &str, code: &str) {
    if let Some(c) = UPSTREAM_ERRORS.get() {
        c.with_label_values(&[backend, code]).inc();
    }
}

/// Publish the size of a freshly built tree.
#[inline]
pub fn record_tree(stats: TreeStats) {
    if let Some(g) = TREE_CHANNELS.get() {
        g.set(stats.channels as i64);
    }
    if let Some(g) = TREE_CLIENTS.get() {
        g.set(stats.clients as i64);
    }
}
