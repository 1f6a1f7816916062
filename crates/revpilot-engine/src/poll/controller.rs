//! Generic per-category fetch controller.
//!
//! One controller owns one category's state machine: it issues attempts
//! through a [`SuggestClient`], keeps at most one request in flight, and
//! reacts to completion/timer events delivered by the panel's drain loop.
//!
//! Staleness is handled with a per-category generation counter: every new
//! attempt bumps the generation, and events tagged with an older generation
//! are discarded. Superseded in-flight requests are additionally aborted so
//! the transport gives up early.

use crate::poll::categories::build_payload;
use crate::poll::executor::{AttemptGuard, FetchOutcome, SuggestClient};
use crate::poll::retry::{delay_for_attempt, RetryScheduler};
use crate::poll::PollConfig;
use revpilot_core::state::{CategoryState, CategoryStatus};
use revpilot_core::suggest::SuggestionCategory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Events flowing from fetch tasks and timers back to the drain loop.
#[derive(Debug)]
pub enum PollEvent {
    /// A fetch attempt finished
    Outcome {
        category: SuggestionCategory,
        generation: u64,
        outcome: FetchOutcome,
    },
    /// The scheduled delay before the next attempt elapsed
    RetryDue {
        category: SuggestionCategory,
        generation: u64,
    },
    /// One second of the retry countdown passed
    CountdownTick {
        category: SuggestionCategory,
        generation: u64,
        seconds: u64,
    },
}

impl PollEvent {
    pub fn category(&self) -> SuggestionCategory {
        match self {
            PollEvent::Outcome { category, .. }
            | PollEvent::RetryDue { category, .. }
            | PollEvent::CountdownTick { category, .. } => *category,
        }
    }
}

enum AttemptKind {
    /// Input changed or the category just started: attempt counter resets
    Fresh,
    /// Scheduled retry within a degraded streak
    Retry,
    /// Steady-state refresh while online; status stays `Online`
    Refresh,
}

pub struct CategoryController {
    category: SuggestionCategory,
    state: CategoryState,
    scheduler: RetryScheduler,
    client: Arc<dyn SuggestClient>,
    config: PollConfig,
    events: UnboundedSender<PollEvent>,
    /// Generation currently allowed to mutate state; shared with guards
    active: Arc<AtomicU64>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    note_text: String,
    session_codes: Vec<String>,
}

impl CategoryController {
    pub fn new(
        category: SuggestionCategory,
        client: Arc<dyn SuggestClient>,
        config: PollConfig,
        events: UnboundedSender<PollEvent>,
    ) -> Self {
        Self {
            category,
            state: CategoryState::new(),
            scheduler: RetryScheduler::new(category, events.clone()),
            client,
            config,
            events,
            active: Arc::new(AtomicU64::new(0)),
            generation: 0,
            in_flight: None,
            note_text: String::new(),
            session_codes: Vec::new(),
        }
    }

    pub fn category(&self) -> SuggestionCategory {
        self.category
    }

    pub fn state(&self) -> &CategoryState {
        &self.state
    }

    /// Kick off polling. Content-independent categories start immediately;
    /// content-dependent ones wait for a non-empty note.
    pub fn start(&mut self) {
        if self.should_poll() && self.state.status == CategoryStatus::Idle {
            self.begin_attempt(AttemptKind::Fresh);
        }
    }

    /// React to a change in the shared inputs (note text, session codes).
    ///
    /// An identical input is a no-op, so re-renders and repeated calls
    /// cannot trigger extra fetch cycles. A change begins a fresh cycle; a
    /// note emptying out resets the category to idle.
    pub fn set_input(&mut self, note_text: &str, codes: &[String]) {
        if !self.category.content_dependent() {
            return;
        }
        let note_changed = self.note_text != note_text;
        let codes_changed = self.category.sends_codes() && self.session_codes != codes;
        if !note_changed && !codes_changed {
            return;
        }

        self.note_text = note_text.to_string();
        if self.category.sends_codes() {
            self.session_codes = codes.to_vec();
        }

        if self.note_text.trim().is_empty() {
            self.reset_to_idle();
        } else {
            self.begin_attempt(AttemptKind::Fresh);
        }
    }

    /// Apply one event for this category. Events from a superseded
    /// generation are dropped without touching state. Returns whether
    /// state changed.
    pub fn handle_event(&mut self, event: PollEvent) -> bool {
        match event {
            PollEvent::Outcome {
                generation,
                outcome,
                ..
            } => {
                if generation != self.generation {
                    return false;
                }
                self.in_flight = None;
                match outcome {
                    FetchOutcome::Cancelled => false,
                    FetchOutcome::Success { items } => {
                        tracing::debug!(
                            category = %self.category,
                            count = items.len(),
                            "suggestions refreshed",
                        );
                        self.state.record_success(items);
                        self.scheduler.cancel_countdown();
                        if self.should_poll() {
                            self.scheduler
                                .schedule_next(self.generation, self.config.base_interval);
                        }
                        true
                    }
                    FetchOutcome::Failure {
                        message,
                        retry_delay,
                    } => {
                        let failed_attempt = self.state.record_failure(message.clone());
                        let delay = retry_delay
                            .unwrap_or_else(|| delay_for_attempt(&self.config, failed_attempt));
                        tracing::warn!(
                            category = %self.category,
                            attempt = failed_attempt,
                            delay_ms = delay.as_millis() as u64,
                            explicit = retry_delay.is_some(),
                            %message,
                            "fetch failed; retry scheduled",
                        );
                        self.scheduler.start_countdown(self.generation, delay);
                        self.scheduler.schedule_next(self.generation, delay);
                        true
                    }
                }
            }
            PollEvent::RetryDue { generation, .. } => {
                if generation != self.generation {
                    return false;
                }
                let kind = if self.state.status == CategoryStatus::Online {
                    AttemptKind::Refresh
                } else {
                    AttemptKind::Retry
                };
                self.begin_attempt(kind);
                true
            }
            PollEvent::CountdownTick {
                generation,
                seconds,
                ..
            } => {
                if generation != self.generation {
                    return false;
                }
                self.state.set_retry_eta(seconds);
                true
            }
        }
    }

    /// Abort outstanding work and drop all state. On the way down or when
    /// the triggering input empties.
    pub fn shutdown(&mut self) {
        self.reset_to_idle();
    }

    fn reset_to_idle(&mut self) {
        self.invalidate_in_flight();
        self.scheduler.cancel_all();
        self.state.clear();
    }

    fn should_poll(&self) -> bool {
        !self.category.content_dependent() || !self.note_text.trim().is_empty()
    }

    /// Abort the in-flight attempt (if any) and bump the generation so any
    /// of its already-queued events get dropped on arrival.
    fn invalidate_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.generation += 1;
        self.active.store(self.generation, Ordering::SeqCst);
    }

    fn begin_attempt(&mut self, kind: AttemptKind) {
        self.invalidate_in_flight();
        self.scheduler.cancel_all();

        match kind {
            AttemptKind::Fresh => {
                self.state.retry_attempt = 0;
                self.state.begin_attempt(0);
            }
            AttemptKind::Retry => self.state.begin_attempt(self.state.retry_attempt),
            AttemptKind::Refresh => self.state.retry_eta_seconds = None,
        }

        let guard = AttemptGuard::new(Arc::clone(&self.active), self.generation);
        let payload = build_payload(self.category, &self.note_text, &self.session_codes);
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let category = self.category;
        let generation = self.generation;
        tracing::debug!(
            %category,
            generation,
            attempt = self.state.retry_attempt,
            "fetch attempt issued",
        );
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = client.fetch(category, payload, guard).await;
            let _ = events.send(PollEvent::Outcome {
                category,
                generation,
                outcome,
            });
        }));
    }
}

impl Drop for CategoryController {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
