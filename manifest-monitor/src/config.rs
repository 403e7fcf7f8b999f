//! Application configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use monitor_engine::{ClientConfig, MonitorConfig};
use tracing::warn;

use crate::api::server::ApiServerConfig;

/// Default directory served for every path that is not an API route.
pub const DEFAULT_FRONTEND_DIR: &str = "./frontend";

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiServerConfig,
    /// Directory of static assets.
    pub frontend_dir: PathBuf,
    /// Directory for rotated log files. Console-only logging when unset.
    pub log_dir: Option<PathBuf>,
    pub monitor: MonitorConfig,
    pub client: ClientConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiServerConfig::default(),
            frontend_dir: PathBuf::from(DEFAULT_FRONTEND_DIR),
            log_dir: None,
            monitor: MonitorConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `API_BIND_ADDRESS`, `API_PORT`, `ENABLE_CORS`
    /// - `FRONTEND_DIR`, `LOG_DIR`
    /// - `MONITOR_POLL_INTERVAL_SECS`, `MONITOR_DELAY_THRESHOLD_SECS`,
    ///   `MONITOR_HISTORY_CAPACITY`, `MONITOR_PROBE_CONCURRENCY`,
    ///   `MONITOR_FIRE_IMMEDIATELY`
    /// - `HTTP_TIMEOUT_SECS`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind_address) = value("API_BIND_ADDRESS") {
            config.api.bind_address = bind_address;
        }
        if let Some(port) = parse_value(&value, "API_PORT") {
            config.api.port = port;
        }
        if let Some(enable_cors) = parse_value(&value, "ENABLE_CORS") {
            config.api.enable_cors = enable_cors;
        }
        if let Some(dir) = value("FRONTEND_DIR") {
            config.frontend_dir = PathBuf::from(dir);
        }
        config.log_dir = value("LOG_DIR").map(PathBuf::from);

        if let Some(secs) = parse_value::<f64, _>(&value, "MONITOR_POLL_INTERVAL_SECS")
            && secs > 0.0
            && secs.is_finite()
        {
            config.monitor.poll_interval = Duration::from_secs_f64(secs);
        }
        if let Some(threshold) = parse_value(&value, "MONITOR_DELAY_THRESHOLD_SECS") {
            config.monitor.delay_threshold = threshold;
        }
        if let Some(capacity) = parse_value(&value, "MONITOR_HISTORY_CAPACITY") {
            config.monitor.history_capacity = capacity;
        }
        if let Some(concurrency) = parse_value(&value, "MONITOR_PROBE_CONCURRENCY") {
            config.monitor.probe_concurrency = concurrency;
        }
        if let Some(fire_immediately) = parse_value(&value, "MONITOR_FIRE_IMMEDIATELY") {
            config.monitor.fire_immediately = fire_immediately;
        }
        config.monitor = config.monitor.normalized();

        if let Some(secs) = parse_value::<u64, _>(&value, "HTTP_TIMEOUT_SECS") {
            config.client.timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn parse_value<T, F>(value: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = value(key)?;
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(key = %key, value = %raw, error = %e, "Ignoring invalid config value");
            None
        }
    }
}
