//! Per-category fetch state.
//!
//! One [`CategoryState`] is owned by each category controller and mutated
//! only in response to fetch outcomes and scheduler ticks. The rules that
//! matter to the panel:
//!
//! - `Loading` is shown only for the first attempt of a fresh cycle.
//! - A degraded retry keeps the last good items on screen; failure never
//!   blanks already-rendered results.
//! - Any success resets the consecutive-failure counter.

use crate::suggest::Suggestion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    /// No triggering input; nothing fetched, nothing scheduled
    #[default]
    Idle,
    /// First attempt of a fresh cycle is in flight
    Loading,
    /// Latest attempt succeeded
    Online,
    /// Latest attempt failed; prior items (if any) are still shown
    Degraded,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryState {
    /// Latest normalized results, in server response order
    pub items: Vec<Suggestion>,
    pub status: CategoryStatus,
    /// Last human-readable failure message; cleared on success
    pub error: Option<String>,
    /// Consecutive-failure counter; 0 after any success
    pub retry_attempt: u32,
    /// Seconds until the next retry, surfaced while degraded
    pub retry_eta_seconds: Option<u64>,
}

impl CategoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an attempt as started. Attempt 0 is a fresh cycle: show the
    /// loading state and drop any stale error. Retries leave the prior
    /// items and the degraded status in place.
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.retry_eta_seconds = None;
        if attempt == 0 {
            self.status = CategoryStatus::Loading;
            self.error = None;
        }
    }

    pub fn record_success(&mut self, items: Vec<Suggestion>) {
        self.items = items;
        self.status = CategoryStatus::Online;
        self.error = None;
        self.retry_attempt = 0;
        self.retry_eta_seconds = None;
    }

    /// Record a failed attempt and return the 0-based index of the attempt
    /// that just failed, which drives the backoff computation.
    pub fn record_failure(&mut self, message: impl Into<String>) -> u32 {
        let failed = self.retry_attempt;
        self.error = Some(message.into());
        self.status = CategoryStatus::Degraded;
        self.retry_attempt = self.retry_attempt.saturating_add(1);
        failed
    }

    pub fn set_retry_eta(&mut self, seconds: u64) {
        if self.status == CategoryStatus::Degraded {
            self.retry_eta_seconds = Some(seconds);
        }
    }

    /// Reset to idle: items emptied, counters zeroed. Used when the
    /// triggering input becomes empty.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
