use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::CACHE_EVICTION_INTERVAL_SECS;
use crate::state::AppState;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(CACHE_EVICTION_INTERVAL_SECS));

    loop {
        interval.tick().await;
        evict_expired(&state, Utc::now());
    }
}

/// Drops entries older than the cache TTL. Returns how many were removed.
pub fn evict_expired(state: &AppState, now: DateTime<Utc>) -> usize {
    let before = state.proxy_cache.len();
    let ttl = state.cache_ttl_secs;

    state
        .proxy_cache
        .retain(|_, cached| now.signed_duration_since(cached.fetched_at).num_seconds() < ttl);

    let evicted = before.saturating_sub(state.proxy_cache.len());
    if evicted > 0 {
        state.observability.record_cache_evictions(evicted as u64);
        info!(
            "evicted {evicted} stale proxy cache entries ({} remaining)",
            state.proxy_cache.len()
        );
    }
    evicted
}
