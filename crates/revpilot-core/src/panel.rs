//! View-side helpers for the suggestion panel.
//!
//! Filtering and badge text are purely presentational: they read category
//! state but never feed back into the fetch/retry machinery.

use crate::state::{CategoryState, CategoryStatus};
use crate::suggest::Suggestion;
use std::collections::HashSet;

/// Codes already added to the visit session.
///
/// The panel excludes these from rendered suggestion lists; the raw fetch
/// results stay available for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SessionCodes {
    codes: HashSet<String>,
}

impl SessionCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a code to the session. Blank input is a no-op.
    pub fn add(&mut self, code: &str) -> bool {
        let code = code.trim();
        if code.is_empty() {
            return false;
        }
        self.codes.insert(code.to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    pub fn as_vec(&self) -> Vec<String> {
        let mut out: Vec<_> = self.codes.iter().cloned().collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Items to render: everything fetched minus codes already in the session.
pub fn visible_items<'a>(items: &'a [Suggestion], added: &SessionCodes) -> Vec<&'a Suggestion> {
    items
        .iter()
        .filter(|item| !added.contains(&item.code))
        .collect()
}

/// Combined status badge for one category.
///
/// `Loading…` during a fresh fetch, `Degraded · retry in Ns` (or just
/// `Degraded`) while failing, nothing when online or idle.
pub fn badge(state: &CategoryState) -> Option<String> {
    match state.status {
        CategoryStatus::Loading => Some("Loading…".to_string()),
        CategoryStatus::Degraded => Some(match state.retry_eta_seconds {
            Some(secs) => format!("Degraded · retry in {}s", secs),
            None => "Degraded".to_string(),
        }),
        CategoryStatus::Idle | CategoryStatus::Online => None,
    }
}
