use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::config::{api_upstream, proxy_cache_ttl_secs, upstream_connect_timeout, upstream_http_timeout};

/// Upstream answer kept for replay, keyed by path and query.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Bytes,
    pub content_type: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    /// Occupancy backend base URL.
    pub upstream: Arc<str>,
    pub proxy_cache: Arc<DashMap<String, CachedResponse>>,
    pub cache_ttl_secs: i64,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    proxy_requests_total: AtomicU64,
    proxy_cache_hits_total: AtomicU64,
    proxy_cache_misses_total: AtomicU64,
    proxy_upstream_errors_total: AtomicU64,
    proxy_rejected_requests_total: AtomicU64,
    proxy_cache_evictions_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub proxy_requests_total: u64,
    pub proxy_cache_hits_total: u64,
    pub proxy_cache_misses_total: u64,
    pub proxy_upstream_errors_total: u64,
    pub proxy_rejected_requests_total: u64,
    pub proxy_cache_evictions_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            proxy_requests_total: self.proxy_requests_total.load(Ordering::Relaxed),
            proxy_cache_hits_total: self.proxy_cache_hits_total.load(Ordering::Relaxed),
            proxy_cache_misses_total: self.proxy_cache_misses_total.load(Ordering::Relaxed),
            proxy_upstream_errors_total: self.proxy_upstream_errors_total.load(Ordering::Relaxed),
            proxy_rejected_requests_total: self
                .proxy_rejected_requests_total
                .load(Ordering::Relaxed),
            proxy_cache_evictions_total: self.proxy_cache_evictions_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_proxy_request(&self) {
        self.proxy_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.proxy_cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.proxy_cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.proxy_upstream_errors_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_request(&self) {
        self.proxy_rejected_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_evictions(&self, count: u64) {
        self.proxy_cache_evictions_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_upstream(api_upstream())
    }

    pub fn with_upstream(upstream: impl Into<String>) -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("crowd-visual/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });
        let upstream: String = upstream.into();
        Self {
            http_client,
            upstream: Arc::from(upstream.trim_end_matches('/')),
            proxy_cache: Arc::new(DashMap::new()),
            cache_ttl_secs: proxy_cache_ttl_secs(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn is_fresh(&self, cached: &CachedResponse, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(cached.fetched_at).num_seconds() < self.cache_ttl_secs
    }
}
