//! Telemetry utilities for upstream fetch timing and tracing spans.

use std::time::Instant;

/// Guard for timing an upstream fetch and recording metrics.
///
/// Records fetch latency when dropped, so cancelled and failed fetches are
/// counted too.
pub struct FetchTimer {
    backend: &'static str,
    start: Instant,
}

impl FetchTimer {
    /// Start timing a fetch against `backend`.
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            start: Instant::now(),
        }
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_fetch(self.backend, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one upstream fetch.
    pub fn fetch(backend: &str) -> Span {
        info_span!("fetch", backend = %backend)
    }

    /// Create a span for an HTTP request.
    pub fn request(method: &str, path: &str) -> Span {
        info_span!("request", method = %method, path = %path)
    }
}
