//! Endpoint and request-body wiring per category.

use revpilot_core::suggest::SuggestionCategory;
use serde_json::{json, Value};

/// Backend endpoint for one category.
pub fn endpoint(category: SuggestionCategory) -> &'static str {
    match category {
        SuggestionCategory::Codes => "/api/ai/codes/suggest",
        SuggestionCategory::Compliance => "/api/ai/compliance/check",
        SuggestionCategory::Differentials => "/api/ai/differentials/generate",
        SuggestionCategory::Prevention => "/api/ai/prevention/suggest",
    }
}

/// JSON request body for one attempt.
///
/// Compliance checks run against the note *and* the codes already added to
/// the session; prevention is independent of both.
pub fn build_payload(category: SuggestionCategory, note_text: &str, codes: &[String]) -> Value {
    match category {
        SuggestionCategory::Codes | SuggestionCategory::Differentials => {
            json!({ "content": note_text })
        }
        SuggestionCategory::Compliance => json!({ "content": note_text, "codes": codes }),
        SuggestionCategory::Prevention => json!({}),
    }
}
