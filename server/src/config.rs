use std::time::Duration;

pub const DEFAULT_API_UPSTREAM: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

pub const DEFAULT_PROXY_CACHE_TTL_SECS: i64 = 30;
pub const MAX_PROXY_CACHE_ENTRIES: usize = 512;
pub const CACHE_EVICTION_INTERVAL_SECS: u64 = 60;
pub const MAX_PROXY_PATH_LEN: usize = 512;

pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

/// Base URL of the occupancy backend, without a trailing slash.
pub fn api_upstream() -> String {
    std::env::var("CROWD_API_UPSTREAM")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
        .unwrap_or_else(|| DEFAULT_API_UPSTREAM.to_string())
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> String {
    std::env::var("CROWD_STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

pub fn proxy_cache_ttl_secs() -> i64 {
    std::env::var("PROXY_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PROXY_CACHE_TTL_SECS)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_defaults_when_unset_or_not_http() {
        temp_env::with_var_unset("CROWD_API_UPSTREAM", || {
            assert_eq!(api_upstream(), DEFAULT_API_UPSTREAM);
        });
        temp_env::with_var("CROWD_API_UPSTREAM", Some("ftp://backend"), || {
            assert_eq!(api_upstream(), DEFAULT_API_UPSTREAM);
        });
    }

    #[test]
    fn upstream_trims_trailing_slash() {
        temp_env::with_var("CROWD_API_UPSTREAM", Some(" https://occupancy.example/ "), || {
            assert_eq!(api_upstream(), "https://occupancy.example");
        });
    }

    #[test]
    fn numeric_settings_reject_zero_and_garbage() {
        temp_env::with_vars(
            [
                ("SERVER_PORT", Some("0")),
                ("PROXY_CACHE_TTL_SECS", Some("soon")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("-4")),
            ],
            || {
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(proxy_cache_ttl_secs(), DEFAULT_PROXY_CACHE_TTL_SECS);
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
            },
        );
    }

    #[test]
    fn numeric_settings_accept_positive_values() {
        temp_env::with_vars(
            [
                ("SERVER_PORT", Some("8080")),
                ("PROXY_CACHE_TTL_SECS", Some("5")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("7")),
                ("CROWD_STATIC_DIR", Some("/srv/crowd")),
            ],
            || {
                assert_eq!(server_port(), 8080);
                assert_eq!(proxy_cache_ttl_secs(), 5);
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(7));
                assert_eq!(static_dir(), "/srv/crowd");
            },
        );
    }
}
