//! Process configuration (spec §6). Read once at startup from the
//! environment, matching the teacher's `dotenvy::dotenv().ok()` +
//! `std::env::var` idiom rather than a layered config file.

#[derive(Debug, Clone)]
pub struct Config {
    pub max_metric_cardinality: usize,
    pub retention_seconds: i64,
    pub otlp_grpc_port: u16,
    pub otlp_http_port: u16,
    pub query_http_port: u16,
    pub opamp_ws_port: u16,
    pub opamp_rest_port: u16,
    pub max_request_bytes: usize,
    pub store_max_bytes: usize,
    pub collector_config_path: Option<String>,
    /// spec §9: spans/logs/metric series whose resource carries this
    /// `service.name` are stored (trace reassembly must still work for the
    /// core's own diagnostics) but filtered out of Query API responses.
    pub self_service_name: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let retention_seconds = std::env::var("RETENTION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("REDIS_TTL").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(1800);

        Self {
            max_metric_cardinality: env_or("MAX_METRIC_CARDINALITY", 1000),
            retention_seconds,
            otlp_grpc_port: env_or("OTLP_GRPC_PORT", 4343),
            otlp_http_port: env_or("OTLP_HTTP_PORT", 4318),
            query_http_port: env_or("HTTP_PORT", 5005),
            opamp_ws_port: env_or("OPAMP_WS_PORT", 4320),
            opamp_rest_port: env_or("OPAMP_REST_PORT", 4321),
            max_request_bytes: env_or("MAX_REQUEST_BYTES", 16 * 1024 * 1024),
            store_max_bytes: env_or("STORE_MAX_BYTES", 512 * 1024 * 1024),
            collector_config_path: std::env::var("COLLECTOR_CONFIG_PATH").ok(),
            self_service_name: std::env::var("SELF_SERVICE_NAME")
                .unwrap_or_else(|_| "tinyolly-core".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // SAFETY: test runs single-threaded w.r.t. these vars within this crate's test binary.
        for key in [
            "MAX_METRIC_CARDINALITY",
            "RETENTION_SECONDS",
            "REDIS_TTL",
            "OTLP_GRPC_PORT",
        ] {
            unsafe { std::env::remove_var(key) };
        }
        let cfg = Config::from_env();
        assert_eq!(cfg.max_metric_cardinality, 1000);
        assert_eq!(cfg.retention_seconds, 1800);
        assert_eq!(cfg.otlp_grpc_port, 4343);
    }
}
