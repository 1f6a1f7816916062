//! Polling engine for the RevenuePilot suggestion panel.
//!
//! Keeps four independent suggestion categories fresh against the backend:
//! each category runs its own fetch/retry loop with exponential backoff,
//! honors server-provided retry hints, and reports state changes over a
//! single event channel drained by [`poll::panel::SuggestionPanel`].

pub mod poll;

pub use poll::categories::{build_payload, endpoint};
pub use poll::controller::{CategoryController, PollEvent};
pub use poll::executor::{AttemptGuard, FetchOutcome, HttpSuggestClient, SuggestClient};
pub use poll::panel::{CategorySnapshot, PanelSnapshot, SuggestionPanel};
pub use poll::retry::RetryScheduler;
pub use poll::PollConfig;
