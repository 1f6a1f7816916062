//! Panel aggregator: owns the four category controllers and the event
//! channel their tasks report through.
//!
//! The drain loop is the only place state mutates, so a rendering layer can
//! call [`SuggestionPanel::apply_pending`] from its own tick and read
//! consistent snapshots. Fetch cycles start only on panel start, on input
//! change, or when a scheduled timer fires; taking snapshots never does.

use crate::poll::controller::{CategoryController, PollEvent};
use crate::poll::executor::SuggestClient;
use crate::poll::PollConfig;
use revpilot_core::panel::{badge, visible_items, SessionCodes};
use revpilot_core::state::{CategoryState, CategoryStatus};
use revpilot_core::suggest::{Suggestion, SuggestionCategory};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Render-ready view of one category.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub category: SuggestionCategory,
    pub status: CategoryStatus,
    /// `Loading…`, `Degraded · retry in Ns`, or nothing when healthy
    pub badge: Option<String>,
    /// Items to render: fetched minus codes already in the session
    pub items: Vec<Suggestion>,
    /// Count of everything the last fetch returned, before dedupe
    pub raw_count: usize,
    pub error: Option<String>,
    pub retry_eta_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PanelSnapshot {
    pub categories: Vec<CategorySnapshot>,
}

impl PanelSnapshot {
    pub fn get(&self, category: SuggestionCategory) -> &CategorySnapshot {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .expect("snapshot covers every category")
    }
}

pub struct SuggestionPanel {
    controllers: Vec<CategoryController>,
    rx: mpsc::UnboundedReceiver<PollEvent>,
    added: SessionCodes,
    note_text: String,
}

impl SuggestionPanel {
    pub fn new(client: Arc<dyn SuggestClient>, config: PollConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controllers = SuggestionCategory::ALL
            .iter()
            .map(|&category| {
                CategoryController::new(category, Arc::clone(&client), config.clone(), tx.clone())
            })
            .collect();
        Self {
            controllers,
            rx,
            added: SessionCodes::new(),
            note_text: String::new(),
        }
    }

    /// Start polling. Content-independent categories begin immediately;
    /// the rest wait for note text.
    pub fn start(&mut self) {
        for controller in &mut self.controllers {
            controller.start();
        }
    }

    /// Update the current note text. Identical text is a no-op.
    pub fn set_note_text(&mut self, note_text: &str) {
        self.note_text = note_text.to_string();
        let codes = self.added.as_vec();
        for controller in &mut self.controllers {
            controller.set_input(note_text, &codes);
        }
    }

    /// Record a code as added to the session. Blank input is a no-op.
    /// Affects the rendered lists and future compliance payloads, never the
    /// retry state machines.
    pub fn add_code(&mut self, code: &str) -> bool {
        if !self.added.add(code) {
            return false;
        }
        let codes = self.added.as_vec();
        for controller in &mut self.controllers {
            controller.set_input(&self.note_text, &codes);
        }
        true
    }

    pub fn added_codes(&self) -> &SessionCodes {
        &self.added
    }

    /// Apply everything already queued without blocking. Returns whether
    /// any state changed.
    pub fn apply_pending(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    /// Wait for the next event and apply it. Returns whether state changed.
    pub async fn apply_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    pub fn state(&self, category: SuggestionCategory) -> &CategoryState {
        self.controller(category).state()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        let categories = self
            .controllers
            .iter()
            .map(|controller| {
                let state = controller.state();
                CategorySnapshot {
                    category: controller.category(),
                    status: state.status,
                    badge: badge(state),
                    items: visible_items(&state.items, &self.added)
                        .into_iter()
                        .cloned()
                        .collect(),
                    raw_count: state.items.len(),
                    error: state.error.clone(),
                    retry_eta_seconds: state.retry_eta_seconds,
                }
            })
            .collect();
        PanelSnapshot { categories }
    }

    /// Abort all in-flight work and timers.
    pub fn shutdown(&mut self) {
        for controller in &mut self.controllers {
            controller.shutdown();
        }
    }

    fn apply(&mut self, event: PollEvent) -> bool {
        let category = event.category();
        self.controller_mut(category).handle_event(event)
    }

    fn controller(&self, category: SuggestionCategory) -> &CategoryController {
        self.controllers
            .iter()
            .find(|c| c.category() == category)
            .expect("panel owns every category")
    }

    fn controller_mut(&mut self, category: SuggestionCategory) -> &mut CategoryController {
        self.controllers
            .iter_mut()
            .find(|c| c.category() == category)
            .expect("panel owns every category")
    }
}
