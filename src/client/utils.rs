//! Utility functions for affinity sessions.
//!
//! This module provides helpers for:
//! - Resolving request resources against a session base URL
//! - The capped exponential backoff used between poll attempts

use crate::error::{AffinityError, Result};
use std::time::Duration;
use url::Url;

/// Resolve `resource` against an optional base URL.
///
/// With a base URL, standard URL-reference resolution applies: relative paths
/// are joined and absolute URLs replace the base. Without one, `resource` must
/// itself be an absolute URL.
///
/// # Examples
///
/// ```
/// use affinity_http::client::resolve_url;
///
/// let a = resolve_url(Some("http://host.example"), "/path").unwrap();
/// let b = resolve_url(Some("http://host.example/"), "/path").unwrap();
/// assert_eq!(a.as_str(), "http://host.example/path");
/// assert_eq!(a, b);
///
/// let c = resolve_url(Some("http://host.example/api/"), "http://other.example/x").unwrap();
/// assert_eq!(c.as_str(), "http://other.example/x");
/// ```
pub fn resolve_url(base_url: Option<&str>, resource: &str) -> Result<Url> {
    match base_url {
        Some(base) => Ok(Url::parse(base)?.join(resource)?),
        None => Url::parse(resource).map_err(|e| AffinityError::InvalidUrl {
            message: format!(
                "{resource:?} is not an absolute URL and no base URL is configured ({e})"
            ),
        }),
    }
}

/// Waits between poll attempts: `initial`, then multiplied on every step,
/// held at `max` once reached.
///
/// The schedule never runs out; [`next_delay`](Self::next_delay) always yields a wait.
///
/// # Examples
///
/// ```
/// use affinity_http::client::BackoffSchedule;
/// use std::time::Duration;
///
/// let mut schedule = BackoffSchedule::new(Duration::from_millis(500), 2, Duration::from_millis(8000));
/// let waits: Vec<u64> = (0..7).map(|_| schedule.next_delay().as_millis() as u64).collect();
/// assert_eq!(waits, vec![500, 1000, 2000, 4000, 8000, 8000, 8000]);
/// ```
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    next: Duration,
    multiplier: u32,
    max: Duration,
}

impl BackoffSchedule {
    /// Create a schedule
    pub fn new(initial: Duration, multiplier: u32, max: Duration) -> Self {
        BackoffSchedule {
            next: initial.min(max),
            multiplier: multiplier.max(1),
            max,
        }
    }

    /// The wait before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current.saturating_mul(self.multiplier).min(self.max);
        current
    }
}
