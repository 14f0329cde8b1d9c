//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for gateway logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a full directive)
    pub log_level: String,

    /// Whether to write logs to stdout
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to include thread ids in log lines
    pub thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "module-gateway".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GATEWAY_SERVICE_NAME`: Service name (default: module-gateway)
    /// - `GATEWAY_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `GATEWAY_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `GATEWAY_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `GATEWAY_THREAD_IDS`: Include thread ids (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("GATEWAY_SERVICE_NAME")
                .unwrap_or_else(|_| "module-gateway".to_string()),

            log_level: env::var("GATEWAY_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("GATEWAY_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("GATEWAY_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            thread_ids: env::var("GATEWAY_THREAD_IDS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Override the log level, e.g. from a command line flag.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

fn parse_flag(v: &str) -> bool {
    let v = v.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes"
}
