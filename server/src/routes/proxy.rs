use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::Response;
use bytes::Bytes;
use chrono::Utc;
use crowd_shared::api::API_PREFIX;
use tracing::{debug, warn};

use crate::config::{MAX_PROXY_CACHE_ENTRIES, MAX_PROXY_PATH_LEN};
use crate::state::{AppState, CachedResponse};

const PROXY_CACHE_CONTROL: &str = "public, max-age=15";
const CACHE_STATUS_HEADER: &str = "x-proxy-cache";

/// Forwards `GET /api/v1/*` to the occupancy backend, replaying fresh JSON
/// answers from the in-memory cache.
pub async fn forward(State(state): State<AppState>, uri: Uri) -> Result<Response, StatusCode> {
    state.observability.record_proxy_request();

    let key = match upstream_path(&uri) {
        Ok(key) => key,
        Err(status) => {
            state.observability.record_rejected_request();
            return Err(status);
        }
    };

    let now = Utc::now();
    if let Some(cached) = state.proxy_cache.get(&key)
        && state.is_fresh(&cached, now)
    {
        state.observability.record_cache_hit();
        return Ok(proxied_response(
            cached.body.clone(),
            &cached.content_type,
            "HIT",
        ));
    }
    state.observability.record_cache_miss();

    let url = format!("{}{key}", state.upstream);
    let resp = state.http_client.get(&url).send().await.map_err(|e| {
        state.observability.record_upstream_error();
        warn!(error = %e, %url, "upstream request failed");
        StatusCode::BAD_GATEWAY
    })?;

    if !resp.status().is_success() {
        debug!(status = %resp.status(), %url, "upstream returned non-success status");
        return Err(StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY));
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let body = resp.bytes().await.map_err(|e| {
        state.observability.record_upstream_error();
        warn!(error = %e, %url, "failed to read upstream body");
        StatusCode::BAD_GATEWAY
    })?;

    if content_type.contains("json") {
        cache_response(&state, key, body.clone(), content_type.clone());
    }

    Ok(proxied_response(body, &content_type, "MISS"))
}

/// Path and query to request upstream. Rejects traversal and oversized
/// paths.
fn upstream_path(uri: &Uri) -> Result<String, StatusCode> {
    let path = uri.path();
    let Some(rest) = path.strip_prefix(API_PREFIX) else {
        return Err(StatusCode::NOT_FOUND);
    };
    if rest.len() <= 1 || path.len() > MAX_PROXY_PATH_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if rest
        .split('/')
        .any(|segment| segment == ".." || segment == "." || segment.contains('\\'))
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(match uri.query() {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    })
}

fn cache_response(state: &AppState, key: String, body: Bytes, content_type: String) {
    if !state.proxy_cache.contains_key(&key) {
        while state.proxy_cache.len() >= MAX_PROXY_CACHE_ENTRIES {
            if !evict_oldest_entry(state) {
                break;
            }
            state.observability.record_cache_evictions(1);
        }
    }

    state.proxy_cache.insert(
        key,
        CachedResponse {
            body,
            content_type,
            fetched_at: Utc::now(),
        },
    );
}

fn evict_oldest_entry(state: &AppState) -> bool {
    let Some(oldest_key) = state
        .proxy_cache
        .iter()
        .min_by_key(|entry| entry.value().fetched_at)
        .map(|entry| entry.key().clone())
    else {
        return false;
    };
    state.proxy_cache.remove(&oldest_key).is_some()
}

fn proxied_response(body: Bytes, content_type: &str, cache_status: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/json")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(PROXY_CACHE_CONTROL),
    );
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
    response
}
