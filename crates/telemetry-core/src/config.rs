// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ServicesError;
use std::env;
use std::str::FromStr;
use tracing::error;

const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;
const DEFAULT_BACKEND: &str = "memory";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_NETFLOW_PORT: u16 = 2055;
const DEFAULT_SYSLOG_UDP_PORT: u16 = 1514;
const DEFAULT_SYSLOG_TCP_PORT: u16 = 1468;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Configuration for the telemetry collector services
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Milliseconds between scheduled buffer flushes
    pub flush_interval_ms: u64,
    /// Regexes for log record text to drop before buffering
    pub ignored_log_category_patterns: Vec<String>,
    /// Identifier of the persistence backend to resolve at startup
    pub backend_identifier: String,
    /// Host the ingest sockets bind to
    pub host: String,
    /// NetFlow v5 UDP port
    pub netflow_port: u16,
    /// Syslog UDP port
    pub syslog_udp_port: u16,
    /// Syslog line-delimited TCP port
    pub syslog_tcp_port: u16,
    /// Base URL for the HTTP backend, if used
    pub store_url: Option<String>,
    /// Milliseconds allowed for backend start/stop and HTTP requests
    pub store_timeout_ms: u64,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            ignored_log_category_patterns: Vec::new(),
            backend_identifier: DEFAULT_BACKEND.to_string(),
            host: DEFAULT_HOST.to_string(),
            netflow_port: DEFAULT_NETFLOW_PORT,
            syslog_udp_port: DEFAULT_SYSLOG_UDP_PORT,
            syslog_tcp_port: DEFAULT_SYSLOG_TCP_PORT,
            store_url: None,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}

impl CollectorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ServicesError> {
        let flush_interval_ms =
            parse_env("TELEMETRY_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS);
        let ignored_log_category_patterns = env::var("TELEMETRY_IGNORED_LOG_PATTERNS")
            .map(|val| {
                val.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let backend_identifier =
            env::var("TELEMETRY_BACKEND").unwrap_or_else(|_| DEFAULT_BACKEND.to_string());
        let host = env::var("TELEMETRY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let netflow_port = parse_env("TELEMETRY_NETFLOW_PORT", DEFAULT_NETFLOW_PORT);
        let syslog_udp_port = parse_env("TELEMETRY_SYSLOG_UDP_PORT", DEFAULT_SYSLOG_UDP_PORT);
        let syslog_tcp_port = parse_env("TELEMETRY_SYSLOG_TCP_PORT", DEFAULT_SYSLOG_TCP_PORT);
        let store_url = env::var("TELEMETRY_STORE_URL").ok();
        let store_timeout_ms = parse_env("TELEMETRY_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS);
        let log_level = env::var("TELEMETRY_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            flush_interval_ms,
            ignored_log_category_patterns,
            backend_identifier,
            host,
            netflow_port,
            syslog_udp_port,
            syslog_tcp_port,
            store_url,
            store_timeout_ms,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ServicesError> {
        if self.flush_interval_ms == 0 {
            return Err(ServicesError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.netflow_port == 0 || self.syslog_udp_port == 0 || self.syslog_tcp_port == 0 {
            return Err(ServicesError::InvalidConfig(
                "Ingest ports must be greater than 0".to_string(),
            ));
        }

        if self.backend_identifier.trim().is_empty() {
            return Err(ServicesError::InvalidConfig(
                "TELEMETRY_BACKEND cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ServicesError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Parses one environment variable, falling back to the built-in
/// default on a malformed value and logging which variable failed.
fn parse_env<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                error!("invalid value '{raw}' for {name}, using built-in default");
                default
            }
        },
        Err(_) => default,
    }
}
