//! Snapshot cache for the channel tree.
//!
//! Serves the last built tree while it is younger than the TTL. When it has
//! expired, exactly one upstream fetch runs at a time: callers arriving while
//! a fetch is in flight wait for that fetch instead of starting their own.
//! Failed fetches never reach callers; they get the previous (stale) tree, or
//! an empty one when nothing was ever fetched.
//!
//! The fetch runs on its own task, so a caller that gives up waiting does not
//! cancel it and the result still lands in the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, warn};

use crate::error::SourceError;
use crate::metrics;
use crate::source::SourceAdapter;
use crate::telemetry::{FetchTimer, spans};
use crate::tree::{self, Channel, TreeStats};

type FetchResult = Result<Arc<Vec<Channel>>, Arc<SourceError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct Snapshot {
    tree: Arc<Vec<Channel>>,
    stats: TreeStats,
    fetched_at: Instant,
    fetched_wall: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    last: Option<Snapshot>,
    in_flight: Option<SharedFetch>,
    /// Message of the most recent failed fetch; cleared by a success.
    last_error: Option<String>,
}

struct Inner {
    source: Arc<dyn SourceAdapter>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

/// Clears `in_flight` when the fetch task ends, however it ends.
struct InFlightGuard<'a>(&'a Mutex<CacheState>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight = None;
    }
}

/// Point-in-time view of the cache, served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub backend: &'static str,
    pub ttl_ms: u64,
    pub has_snapshot: bool,
    /// RFC 3339 wall-clock time of the last successful fetch.
    pub fetched_at: Option<String>,
    pub age_ms: Option<u64>,
    pub fresh: bool,
    pub fetching: bool,
    pub last_error: Option<String>,
    pub tree: Option<TreeStats>,
}

/// TTL cache in front of a [`SourceAdapter`]. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<Inner>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SourceAdapter>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                ttl,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the current channel tree. Never fails.
    pub async fn get_tree(&self) -> Arc<Vec<Channel>> {
        let fetch = {
            let mut state = self.inner.state.lock();
            if let Some(snapshot) = &state.last
                && snapshot.fetched_at.elapsed() < self.inner.ttl
            {
                metrics::record_cache_hit();
                return Arc::clone(&snapshot.tree);
            }
            match state.in_flight.clone() {
                Some(fetch) => {
                    metrics::record_coalesced_wait();
                    fetch
                }
                None => {
                    let fetch = self.spawn_fetch();
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        match fetch.await {
            Ok(tree) => tree,
            Err(_) => self.fallback(),
        }
    }

    /// Describe what the cache currently holds.
    pub fn status(&self) -> CacheStatus {
        let state = self.inner.state.lock();
        let last = state.last.as_ref();
        let age = last.map(|snapshot| snapshot.fetched_at.elapsed());
        CacheStatus {
            backend: self.inner.source.name(),
            ttl_ms: self.inner.ttl.as_millis() as u64,
            has_snapshot: last.is_some(),
            fetched_at: last.map(|snapshot| snapshot.fetched_wall.to_rfc3339()),
            age_ms: age.map(|age| age.as_millis() as u64),
            fresh: age.is_some_and(|age| age < self.inner.ttl),
            fetching: state.in_flight.is_some(),
            last_error: state.last_error.clone(),
            tree: last.map(|snapshot| snapshot.stats),
        }
    }

    /// Start the upstream fetch on its own task. Must be called with the
    /// state lock held so that only one fetch is ever published.
    fn spawn_fetch(&self) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.refresh().await });
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(SourceError::Task(e.to_string()))),
            }
        }
        .boxed()
        .shared()
    }

    fn fallback(&self) -> Arc<Vec<Channel>> {
        let state = self.inner.state.lock();
        match &state.last {
            Some(snapshot) => {
                metrics::record_stale_served();
                debug!(
                    age_ms = snapshot.fetched_at.elapsed().as_millis() as u64,
                    "Serving stale snapshot"
                );
                Arc::clone(&snapshot.tree)
            }
            None => Arc::new(Vec::new()),
        }
    }
}

impl Inner {
    async fn refresh(&self) -> FetchResult {
        let _in_flight = InFlightGuard(&self.state);
        let backend = self.source.name();

        let result = self.fetch().instrument(spans::fetch(backend)).await;

        let mut state = self.state.lock();
        let outcome = match result {
            Ok(tree) => {
                let stats = tree::stats(&tree);
                let tree = Arc::new(tree);
                metrics::record_tree(stats);
                info!(
                    backend,
                    channels = stats.channels,
                    clients = stats.clients,
                    depth = stats.depth,
                    "Channel tree refreshed"
                );
                state.last = Some(Snapshot {
                    tree: Arc::clone(&tree),
                    stats,
                    fetched_at: Instant::now(),
                    fetched_wall: Utc::now(),
                });
                state.last_error = None;
                Ok(tree)
            }
            Err(e) => {
                metrics::record_fetch_error(backend, e.error_code());
                warn!(
                    backend,
                    error = %e,
                    stale = state.last.is_some(),
                    "Upstream fetch failed"
                );
                state.last_error = Some(e.to_string());
                Err(Arc::new(e))
            }
        };
        drop(state);
        outcome
    }

    async fn fetch(&self) -> Result<Vec<Channel>, SourceError> {
        let _timer = FetchTimer::new(self.source.name());
        let channels = self.source.fetch_channels().await?;
        if channels.is_empty() {
            return Ok(Vec::new());
        }
        let clients = self.source.fetch_clients().await?;
        Ok(tree::build_raw(
            self.source.convention(),
            &channels,
            &clients,
        ))
    }
}
