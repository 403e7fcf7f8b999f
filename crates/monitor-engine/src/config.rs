//! Monitoring loop and HTTP client configuration.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::{MonitorError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Tick cadence used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Load time (seconds) above which a segment is reported as delayed.
pub const DEFAULT_DELAY_THRESHOLD_SECS: f64 = 2.0;

/// Number of most-recent segment statuses kept per session.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Number of `$Number$` substitutions synthesized per DASH segment template.
pub const DEFAULT_DASH_SEGMENT_COUNT: usize = 10;

/// Behaviour of the per-session monitoring loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between two ticks of a session.
    pub poll_interval: Duration,

    /// Segments whose load time exceeds this many seconds are flagged delayed.
    pub delay_threshold: f64,

    /// Maximum number of statuses retained in a session's history.
    pub history_capacity: usize,

    /// Segment URLs synthesized per DASH segment template.
    pub dash_segment_count: usize,

    /// How many master playlists may be followed before giving up.
    pub max_variant_depth: usize,

    /// Probes run per tick at the same time. Results keep discovery order.
    pub probe_concurrency: usize,

    /// Run the first tick as soon as the session starts instead of after one
    /// full interval.
    pub fire_immediately: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            delay_threshold: DEFAULT_DELAY_THRESHOLD_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            dash_segment_count: DEFAULT_DASH_SEGMENT_COUNT,
            max_variant_depth: 4,
            probe_concurrency: 1,
            fire_immediately: false,
        }
    }
}

impl MonitorConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_delay_threshold(mut self, seconds: f64) -> Self {
        self.delay_threshold = seconds;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_dash_segment_count(mut self, count: usize) -> Self {
        self.dash_segment_count = count;
        self
    }

    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency;
        self
    }

    pub fn with_fire_immediately(mut self, fire_immediately: bool) -> Self {
        self.fire_immediately = fire_immediately;
        self
    }

    /// Clamp values that would stall or break the loop.
    pub fn normalized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if !self.delay_threshold.is_finite() || self.delay_threshold < 0.0 {
            self.delay_threshold = DEFAULT_DELAY_THRESHOLD_SECS;
        }
        self.history_capacity = self.history_capacity.max(1);
        self.probe_concurrency = self.probe_concurrency.max(1);
        self.max_variant_depth = self.max_variant_depth.max(1);
        self
    }
}

/// Options for the shared HTTP client used for manifests and segment probes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Overall timeout for a single request, body included. Zero disables it.
    pub timeout: Duration,

    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Maximum idle connections to keep per host
    pub pool_max_idle_per_host: usize,

    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ClientConfig::get_default_headers(),
            pool_max_idle_per_host: 10,
            follow_redirects: true,
        }
    }
}

impl ClientConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("*/*"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers
    }

    /// Build a `reqwest::Client` from this configuration.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        install_rustls_provider();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .default_headers(self.headers.clone())
            .pool_max_idle_per_host(self.pool_max_idle_per_host);

        if !self.timeout.is_zero() {
            builder = builder.timeout(self.timeout);
        }

        if !self.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        builder.build().map_err(|e| MonitorError::Client {
            reason: e.to_string(),
        })
    }
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(6));
        assert_eq!(config.delay_threshold, 2.0);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.dash_segment_count, 10);
        assert!(!config.fire_immediately);
    }

    #[test]
    fn test_normalized_clamps_degenerate_values() {
        let config = MonitorConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_delay_threshold(f64::NAN)
            .with_history_capacity(0)
            .with_probe_concurrency(0)
            .normalized();

        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.delay_threshold, DEFAULT_DELAY_THRESHOLD_SECS);
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.probe_concurrency, 1);
    }

    #[test]
    fn test_build_client() {
        let client = ClientConfig::default().build_client();
        assert!(client.is_ok());
    }
}
