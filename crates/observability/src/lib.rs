use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    canned_replies_total: AtomicU64,
    flight_queries_total: AtomicU64,
    remote_resolutions_total: AtomicU64,
    pattern_fallbacks_total: AtomicU64,
    unresolved_total: AtomicU64,
    lookup_hits_total: AtomicU64,
    lookup_misses_total: AtomicU64,
    store_errors_total: AtomicU64,
    completion_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub canned_replies_total: u64,
    pub flight_queries_total: u64,
    pub remote_resolutions_total: u64,
    pub pattern_fallbacks_total: u64,
    pub unresolved_total: u64,
    pub lookup_hits_total: u64,
    pub lookup_misses_total: u64,
    pub store_errors_total: u64,
    pub completion_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_canned_reply(&self) {
        self.canned_replies_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_flight_query(&self) {
        self.flight_queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_resolution(&self) {
        self.remote_resolutions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pattern_fallback(&self) {
        self.pattern_fallbacks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unresolved(&self) {
        self.unresolved_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookup_hit(&self) {
        self.lookup_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookup_miss(&self) {
        self.lookup_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_error(&self) {
        self.store_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completion_failure(&self) {
        self.completion_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            canned_replies_total: self.canned_replies_total.load(Ordering::Relaxed),
            flight_queries_total: self.flight_queries_total.load(Ordering::Relaxed),
            remote_resolutions_total: self.remote_resolutions_total.load(Ordering::Relaxed),
            pattern_fallbacks_total: self.pattern_fallbacks_total.load(Ordering::Relaxed),
            unresolved_total: self.unresolved_total.load(Ordering::Relaxed),
            lookup_hits_total: self.lookup_hits_total.load(Ordering::Relaxed),
            lookup_misses_total: self.lookup_misses_total.load(Ordering::Relaxed),
            store_errors_total: self.store_errors_total.load(Ordering::Relaxed),
            completion_failures_total: self.completion_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

fn default_filter(service_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{service_name}={level},skybot_api={level},skybot_agents={level},skybot_completion={level},skybot_storage={level}"
        ))
    })
}

/// JSON logs on stdout, for long-running services.
pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(default_filter(service_name, "info"))
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

/// Compact logs on stderr at `warn`, so an interactive console stays
/// readable. `RUST_LOG` still overrides.
pub fn init_cli_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(io::stderr)
            .with_env_filter(default_filter(service_name, "warn"))
            .init();
    });
}
