//! Fetch loop building blocks: config, executor, scheduler, controller,
//! and the panel aggregator that ties the four categories together.

pub mod categories;
pub mod controller;
pub mod executor;
pub mod panel;
pub mod retry;

use revpilot_adapters::config::Config;
use std::time::Duration;

/// Steady-state poll interval, also the backoff base.
pub const BASE_INTERVAL_MS: u64 = 2_000;
/// Ceiling on the computed backoff delay.
pub const MAX_BACKOFF_MS: u64 = 30_000;
/// Bound on a single request before it counts as a failed attempt.
pub const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Timing knobs for the polling loops.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub base_interval: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(BASE_INTERVAL_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    /// Defaults with any overrides the user put in their config file.
    pub fn from_config(config: &Config) -> Self {
        let mut out = Self::default();
        if let Some(ms) = config.base_interval_ms.filter(|ms| *ms > 0) {
            out.base_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = config.max_backoff_ms.filter(|ms| *ms > 0) {
            out.max_backoff = Duration::from_millis(ms);
        }
        if let Some(secs) = config.request_timeout_secs.filter(|s| *s > 0) {
            out.request_timeout = Duration::from_secs(secs);
        }
        out
    }
}
