//! Domain model for the RevenuePilot suggestion panel.
//!
//! Pure types and rules: suggestion categories, the normalized
//! [`suggest::Suggestion`] shape, per-category response mapping, the
//! [`state::CategoryState`] machine, and view-side helpers (dedupe filter,
//! status badges). No I/O lives here.

pub mod panel;
pub mod state;
pub mod suggest;
