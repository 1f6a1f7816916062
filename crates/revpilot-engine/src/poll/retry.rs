//! Backoff computation, server retry hints, and the per-category
//! timer/countdown lifecycle.

use crate::poll::controller::PollEvent;
use crate::poll::PollConfig;
use revpilot_core::suggest::SuggestionCategory;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Delay before retrying after the attempt with the given 0-based index
/// failed: `min(base * 2^attempt, max_backoff)`.
pub fn delay_for_attempt(config: &PollConfig, attempt: u32) -> Duration {
    let base_ms = config.base_interval.as_millis() as u64;
    let max_ms = config.max_backoff.as_millis() as u64;
    let delay_ms = match 1u64.checked_shl(attempt) {
        Some(factor) => base_ms.saturating_mul(factor).min(max_ms),
        None => max_ms,
    };
    Duration::from_millis(delay_ms)
}

/// Normalize a server-supplied retry number to milliseconds.
///
/// The backend is inconsistent about units: some handlers send whole
/// seconds, others milliseconds. Values >= 1000 are taken as already
/// milliseconds, smaller values as seconds. Inherently ambiguous right
/// around 1000ms; kept as-is to match the service's established clients.
pub fn normalize_delay_ms(raw: f64) -> Option<u64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    if raw >= 1000.0 {
        Some(raw.round() as u64)
    } else {
        Some((raw * 1000.0).round() as u64)
    }
}

/// Retry hint from an error body: `retryAfter`, `retry_after`, or
/// `retry_delay`, as a number or numeric string.
pub fn retry_hint_from_body(body: &Value) -> Option<Duration> {
    let raw = ["retryAfter", "retry_after", "retry_delay"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })?;
    normalize_delay_ms(raw).map(Duration::from_millis)
}

/// Fallback retry hint from a `Retry-After` response header. Only the
/// delta-seconds form is honored; HTTP-date values are ignored.
pub fn retry_hint_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    (raw > 0).then(|| Duration::from_secs(raw))
}

/// Owns the pending retry timer and the 1s-resolution countdown for one
/// category. At most one of each exists at a time; arming a new timer or
/// countdown cancels the previous one, and dropping the scheduler cancels
/// both.
pub struct RetryScheduler {
    category: SuggestionCategory,
    events: UnboundedSender<PollEvent>,
    timer: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl RetryScheduler {
    pub fn new(category: SuggestionCategory, events: UnboundedSender<PollEvent>) -> Self {
        Self {
            category,
            events,
            timer: None,
            countdown: None,
        }
    }

    /// Arm the retry timer: after `delay`, a [`PollEvent::RetryDue`] tagged
    /// with `generation` is emitted.
    pub fn schedule_next(&mut self, generation: u64, delay: Duration) {
        self.cancel_timer();
        let events = self.events.clone();
        let category = self.category;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(PollEvent::RetryDue {
                category,
                generation,
            });
        }));
    }

    /// Start emitting countdown ticks until `delay` elapses.
    ///
    /// Each tick carries whole seconds remaining, derived from the wall
    /// deadline (`deadline - now`) rather than a decremented counter, so
    /// the displayed value cannot drift.
    pub fn start_countdown(&mut self, generation: u64, delay: Duration) {
        self.cancel_countdown();
        let events = self.events.clone();
        let category = self.category;
        let deadline = Instant::now() + delay;
        self.countdown = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                let remaining = deadline.saturating_duration_since(Instant::now());
                let seconds = (remaining.as_millis() as u64).div_ceil(1000);
                let sent = events.send(PollEvent::CountdownTick {
                    category,
                    generation,
                    seconds,
                });
                if sent.is_err() || seconds == 0 {
                    break;
                }
            }
        }));
    }

    pub fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    pub fn cancel_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }

    /// Clear both the timer and the countdown. Used on shutdown, on
    /// input-to-empty transitions, and right before arming a new cycle.
    pub fn cancel_all(&mut self) {
        self.cancel_timer();
        self.cancel_countdown();
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn config() -> PollConfig {
        PollConfig::default()
    }

    #[test]
    fn backoff_doubles_from_base_and_caps() {
        let config = config();
        let expect_ms = [2_000, 4_000, 8_000, 16_000, 30_000, 30_000];
        for (attempt, &ms) in expect_ms.iter().enumerate() {
            assert_eq!(
                delay_for_attempt(&config, attempt as u32),
                Duration::from_millis(ms),
                "attempt {attempt}"
            );
        }
        // Shift overflow territory still caps cleanly.
        assert_eq!(
            delay_for_attempt(&config, 70),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn backoff_is_monotonic_up_to_the_cap() {
        let config = config();
        let mut last = Duration::ZERO;
        for attempt in 0..20 {
            let delay = delay_for_attempt(&config, attempt);
            assert!(delay >= last);
            assert!(delay <= config.max_backoff);
            last = delay;
        }
    }

    #[test]
    fn delay_magnitude_heuristic() {
        assert_eq!(normalize_delay_ms(5.0), Some(5_000));
        assert_eq!(normalize_delay_ms(999.0), Some(999_000));
        assert_eq!(normalize_delay_ms(1_000.0), Some(1_000));
        assert_eq!(normalize_delay_ms(1_500.0), Some(1_500));
        assert_eq!(normalize_delay_ms(0.0), None);
        assert_eq!(normalize_delay_ms(-2.0), None);
    }

    #[test]
    fn body_hint_accepts_all_field_spellings_and_strings() {
        assert_eq!(
            retry_hint_from_body(&json!({ "retryAfter": "5" })),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            retry_hint_from_body(&json!({ "retry_after": 3 })),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            retry_hint_from_body(&json!({ "retry_delay": 2500 })),
            Some(Duration::from_millis(2_500))
        );
        assert_eq!(retry_hint_from_body(&json!({ "message": "nope" })), None);
        assert_eq!(retry_hint_from_body(&json!({ "retryAfter": true })), None);
    }

    #[test]
    fn header_hint_parses_delta_seconds_only() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(
            retry_hint_from_headers(&headers),
            Some(Duration::from_secs(7))
        );

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(retry_hint_from_headers(&headers), None);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_after_the_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RetryScheduler::new(SuggestionCategory::Codes, tx);
        scheduler.schedule_next(3, Duration::from_secs(2));

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            PollEvent::RetryDue {
                category: SuggestionCategory::Codes,
                generation: 3,
            }
        ));
        // Nothing else pending.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RetryScheduler::new(SuggestionCategory::Codes, tx);
        scheduler.schedule_next(1, Duration::from_secs(10));
        scheduler.schedule_next(2, Duration::from_secs(1));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::RetryDue { generation: 2, .. }));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err(), "superseded timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_down_from_the_deadline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RetryScheduler::new(SuggestionCategory::Compliance, tx);
        scheduler.start_countdown(1, Duration::from_secs(5));

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                PollEvent::CountdownTick { seconds, .. } => {
                    seen.push(seconds);
                    if seconds == 0 {
                        break;
                    }
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(seen, vec![5, 4, 3, 2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_timer_and_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RetryScheduler::new(SuggestionCategory::Prevention, tx);
        scheduler.schedule_next(1, Duration::from_secs(2));
        scheduler.start_countdown(1, Duration::from_secs(2));
        // The countdown's first tick is immediate; drop it before cancelling.
        let _ = rx.recv().await;
        scheduler.cancel_all();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
