use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "upstream": state.upstream.as_ref(),
        "proxy_cache_size": state.proxy_cache.len(),
        "proxy_cache_ttl_secs": state.cache_ttl_secs,
        "observability": {
            "proxy_requests_total": observability.proxy_requests_total,
            "proxy_cache_hits_total": observability.proxy_cache_hits_total,
            "proxy_cache_misses_total": observability.proxy_cache_misses_total,
            "proxy_upstream_errors_total": observability.proxy_upstream_errors_total,
            "proxy_rejected_requests_total": observability.proxy_rejected_requests_total,
            "proxy_cache_evictions_total": observability.proxy_cache_evictions_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(state.proxy_cache.len(), state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(cache_size: usize, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP crowd_proxy_cache_size Current number of cached upstream responses."
    );
    let _ = writeln!(body, "# TYPE crowd_proxy_cache_size gauge");
    let _ = writeln!(body, "crowd_proxy_cache_size {cache_size}");

    let counters = [
        (
            "crowd_proxy_requests_total",
            "Total API requests received by the proxy.",
            observability.proxy_requests_total,
        ),
        (
            "crowd_proxy_cache_hits_total",
            "Total API requests answered from cache.",
            observability.proxy_cache_hits_total,
        ),
        (
            "crowd_proxy_cache_misses_total",
            "Total API requests forwarded upstream.",
            observability.proxy_cache_misses_total,
        ),
        (
            "crowd_proxy_upstream_errors_total",
            "Total upstream transport or body read failures.",
            observability.proxy_upstream_errors_total,
        ),
        (
            "crowd_proxy_rejected_requests_total",
            "Total API requests rejected before forwarding.",
            observability.proxy_rejected_requests_total,
        ),
        (
            "crowd_proxy_cache_evictions_total",
            "Total cache entries evicted for size or age.",
            observability.proxy_cache_evictions_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::render_prometheus_metrics;
    use crate::state::{AppState, ObservabilitySnapshot};

    async fn spawn_test_server(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn metrics_output_contains_prometheus_help_type_and_values() {
        let observability = ObservabilitySnapshot {
            proxy_requests_total: 12,
            proxy_cache_hits_total: 8,
            proxy_cache_misses_total: 4,
            proxy_upstream_errors_total: 1,
            proxy_rejected_requests_total: 2,
            proxy_cache_evictions_total: 3,
        };

        let metrics = render_prometheus_metrics(42, observability);

        assert!(metrics.contains("# HELP crowd_proxy_cache_size"));
        assert!(metrics.contains("# TYPE crowd_proxy_cache_size gauge"));
        assert!(metrics.contains("crowd_proxy_cache_size 42"));
        assert!(metrics.contains("# TYPE crowd_proxy_requests_total counter"));
        assert!(metrics.contains("crowd_proxy_requests_total 12"));
        assert!(metrics.contains("crowd_proxy_cache_hits_total 8"));
        assert!(metrics.contains("crowd_proxy_cache_misses_total 4"));
        assert!(metrics.contains("crowd_proxy_upstream_errors_total 1"));
        assert!(metrics.contains("crowd_proxy_rejected_requests_total 2"));
        assert!(metrics.contains("crowd_proxy_cache_evictions_total 3"));
    }

    #[tokio::test]
    async fn health_and_metrics_expose_expected_contract() {
        let state = AppState::with_upstream("http://127.0.0.1:9/");
        let (addr, server_handle) = spawn_test_server(state).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(
            health.get("upstream").and_then(|v| v.as_str()),
            Some("http://127.0.0.1:9")
        );
        assert_eq!(
            health.get("proxy_cache_size").and_then(|v| v.as_u64()),
            Some(0)
        );
        assert!(
            health
                .get("observability")
                .and_then(|v| v.get("proxy_requests_total"))
                .and_then(|v| v.as_u64())
                .is_some()
        );

        let metrics = client
            .get(format!("{base_url}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("parse metrics text");

        assert!(metrics.contains("# TYPE crowd_proxy_requests_total counter"));
        assert!(metrics.contains("crowd_proxy_cache_size 0"));
        assert!(metrics.contains("crowd_proxy_upstream_errors_total 0"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
