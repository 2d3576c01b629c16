//! Configuration module for sitewatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the monitoring backend (default: "http://127.0.0.1:5000")
    pub api_base_url: String,
    /// HTTP port for the local dashboard API (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite file holding the session (default: "sitewatch.db")
    pub db_path: String,
    /// Period of the status refresh cycle (default: 10s)
    pub poll_interval: Duration,
    /// Period of the unresolved-alert count refresh (default: 10s)
    pub alert_interval: Duration,
    /// Number of recent samples fetched per site (default: 10)
    pub metrics_limit: u32,
    /// Timeout applied to every backend request (default: 10s)
    pub request_timeout: Duration,
    /// Credentials used to log in at startup when no token is stored.
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            http_port: 8080,
            db_path: "sitewatch.db".to_string(),
            poll_interval: Duration::from_secs(10),
            alert_interval: Duration::from_secs(10),
            metrics_limit: 10,
            request_timeout: Duration::from_secs(10),
            email: None,
            password: None,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITEWATCH_API_BASE_URL`: backend base URL
    /// - `SITEWATCH_HTTP_PORT`: dashboard API port
    /// - `SITEWATCH_DB_PATH`: session database path
    /// - `SITEWATCH_POLL_INTERVAL_SECS`: status refresh period
    /// - `SITEWATCH_ALERT_INTERVAL_SECS`: alert count refresh period
    /// - `SITEWATCH_METRICS_LIMIT`: samples per site
    /// - `SITEWATCH_REQUEST_TIMEOUT_SECS`: backend request timeout
    /// - `SITEWATCH_EMAIL` / `SITEWATCH_PASSWORD`: startup credentials
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup("SITEWATCH_API_BASE_URL") {
            cfg.api_base_url = url;
        }

        if let Some(port) = parse_var(&lookup, "SITEWATCH_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("SITEWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SITEWATCH_POLL_INTERVAL_SECS") {
            if secs > 0 {
                cfg.poll_interval = Duration::from_secs(secs);
            }
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SITEWATCH_ALERT_INTERVAL_SECS") {
            if secs > 0 {
                cfg.alert_interval = Duration::from_secs(secs);
            }
        }

        if let Some(limit) = parse_var::<u32, _>(&lookup, "SITEWATCH_METRICS_LIMIT") {
            if limit > 0 {
                cfg.metrics_limit = limit;
            }
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SITEWATCH_REQUEST_TIMEOUT_SECS") {
            if secs > 0 {
                cfg.request_timeout = Duration::from_secs(secs);
            }
        }

        cfg.email = lookup("SITEWATCH_EMAIL").filter(|s| !s.is_empty());
        cfg.password = lookup("SITEWATCH_PASSWORD").filter(|s| !s.is_empty());

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
