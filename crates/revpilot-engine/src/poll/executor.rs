//! One fetch attempt: POST the category payload, normalize the result.
//!
//! Outcomes are data, not errors. A transport failure, a non-2xx status,
//! or a timeout all become `Failure`; a superseded attempt becomes
//! `Cancelled` and is never counted toward backoff. A 2xx body that fails
//! to parse is an empty object, so schema drift degrades to "no results"
//! instead of an error.

use crate::poll::categories::endpoint;
use crate::poll::retry::{retry_hint_from_body, retry_hint_from_headers};
use futures::future::BoxFuture;
use revpilot_adapters::http::ApiTransport;
use revpilot_core::suggest::{map_response, Suggestion, SuggestionCategory};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of a single fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        items: Vec<Suggestion>,
    },
    Failure {
        message: String,
        /// Server-specified delay before the next attempt, when it sent one
        retry_delay: Option<Duration>,
    },
    /// The attempt was superseded mid-flight; not a failure
    Cancelled,
}

/// Ties an attempt to the generation that issued it.
///
/// The executor re-checks the guard after every await point; once the
/// controller moves on to a newer generation, a late-arriving response is
/// reported as `Cancelled` instead of mutating anything.
#[derive(Debug, Clone)]
pub struct AttemptGuard {
    active: Arc<AtomicU64>,
    generation: u64,
}

impl AttemptGuard {
    pub fn new(active: Arc<AtomicU64>, generation: u64) -> Self {
        Self { active, generation }
    }

    pub fn is_current(&self) -> bool {
        self.active.load(Ordering::SeqCst) == self.generation
    }
}

/// Seam between the controller and the transport. The production
/// implementation is [`HttpSuggestClient`]; tests substitute scripted ones.
pub trait SuggestClient: Send + Sync {
    fn fetch(
        &self,
        category: SuggestionCategory,
        payload: Value,
        guard: AttemptGuard,
    ) -> BoxFuture<'static, FetchOutcome>;
}

/// Production client: signed JSON POSTs over the shared transport.
#[derive(Debug, Clone)]
pub struct HttpSuggestClient {
    transport: ApiTransport,
}

impl HttpSuggestClient {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

impl SuggestClient for HttpSuggestClient {
    fn fetch(
        &self,
        category: SuggestionCategory,
        payload: Value,
        guard: AttemptGuard,
    ) -> BoxFuture<'static, FetchOutcome> {
        let transport = self.transport.clone();
        Box::pin(async move { execute(&transport, category, &payload, &guard).await })
    }
}

/// Issue one attempt and normalize whatever comes back.
pub async fn execute(
    transport: &ApiTransport,
    category: SuggestionCategory,
    payload: &Value,
    guard: &AttemptGuard,
) -> FetchOutcome {
    let builder = match transport.post_json(endpoint(category), payload) {
        Ok(builder) => builder,
        Err(err) => {
            return FetchOutcome::Failure {
                message: err.to_string(),
                retry_delay: None,
            }
        }
    };

    let response = match builder.send().await {
        Ok(response) => response,
        Err(err) => {
            if !guard.is_current() {
                return FetchOutcome::Cancelled;
            }
            let message = if err.is_timeout() {
                format!("{} request timed out", category.label())
            } else {
                format!("{} request failed: {}", category.label(), err)
            };
            return FetchOutcome::Failure {
                message,
                retry_delay: None,
            };
        }
    };
    if !guard.is_current() {
        return FetchOutcome::Cancelled;
    }

    let status = response.status();
    if !status.is_success() {
        let header_hint = retry_hint_from_headers(response.headers());
        let text = response.text().await.unwrap_or_default();
        if !guard.is_current() {
            return FetchOutcome::Cancelled;
        }
        let body: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default()));
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("{} endpoint returned HTTP {}", category.label(), status.as_u16())
            });
        // Body hint wins; the header is only a fallback.
        let retry_delay = retry_hint_from_body(&body).or(header_hint);
        return FetchOutcome::Failure {
            message,
            retry_delay,
        };
    }

    let text = response.text().await.unwrap_or_default();
    if !guard.is_current() {
        return FetchOutcome::Cancelled;
    }
    let body: Value =
        serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default()));
    FetchOutcome::Success {
        items: map_response(category, &body),
    }
}
