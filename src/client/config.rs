//! Client configuration.
//!
//! [`ClientConfig`] covers what the crate itself controls: how the default
//! reqwest transport is built, and the backoff schedule of the process poller.
//! Per-session request defaults live in [`SessionDefaults`](crate::SessionDefaults).

use std::time::Duration;

/// Default wait before the second poll attempt.
pub const DEFAULT_INITIAL_POLL_DELAY_MS: u64 = 500;

/// Default upper bound on the wait between poll attempts.
pub const DEFAULT_MAX_POLL_DELAY_MS: u64 = 8_000;

/// Default growth factor between consecutive poll waits.
pub const DEFAULT_POLL_BACKOFF_MULTIPLIER: u32 = 2;

/// Configuration for [`AffinityClient`](crate::AffinityClient) and the sessions it creates.
///
/// # Examples
///
/// ```
/// use affinity_http::ClientConfig;
///
/// let config = ClientConfig {
///     initial_poll_delay_ms: 250,
///     max_poll_delay_ms: 4_000,
///     ..Default::default()
/// };
/// assert_eq!(config.poll_backoff_multiplier, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout for each request made by the default reqwest transport
    pub request_timeout_ms: u64,

    /// Proxy for the default reqwest transport (empty for none)
    pub proxy_url: String,

    /// Wait before the second poll attempt
    pub initial_poll_delay_ms: u64,

    /// Upper bound on the wait between poll attempts
    pub max_poll_delay_ms: u64,

    /// Growth factor applied to the wait after each poll attempt
    pub poll_backoff_multiplier: u32,

    /// Emit `tracing` events for poll progress
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Wait before the second poll attempt
    pub fn initial_poll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_poll_delay_ms)
    }

    /// Upper bound on the wait between poll attempts
    pub fn max_poll_delay(&self) -> Duration {
        Duration::from_millis(self.max_poll_delay_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: 60_000,
            proxy_url: String::new(),
            initial_poll_delay_ms: DEFAULT_INITIAL_POLL_DELAY_MS,
            max_poll_delay_ms: DEFAULT_MAX_POLL_DELAY_MS,
            poll_backoff_multiplier: DEFAULT_POLL_BACKOFF_MULTIPLIER,
            enable_logging: true,
        }
    }
}
