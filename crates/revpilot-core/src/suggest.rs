//! Suggestion model for RevenuePilot.
//!
//! Each category is fetched independently from the inference service and
//! normalized into one [`Suggestion`] shape. Mapping is deliberately lenient:
//! a missing or odd-typed list field is an empty result, never an error, so
//! minor schema drift on the server does not flap the panel between error
//! and success states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One independent suggestion type fetched by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    /// Billing/diagnosis codes for the current note
    Codes,
    /// Compliance alerts against the note and already-added codes
    Compliance,
    /// Differential diagnoses
    Differentials,
    /// Preventive-care recommendations
    Prevention,
}

impl SuggestionCategory {
    pub const ALL: [SuggestionCategory; 4] = [
        SuggestionCategory::Codes,
        SuggestionCategory::Compliance,
        SuggestionCategory::Differentials,
        SuggestionCategory::Prevention,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SuggestionCategory::Codes => "Codes",
            SuggestionCategory::Compliance => "Compliance",
            SuggestionCategory::Differentials => "Differentials",
            SuggestionCategory::Prevention => "Prevention",
        }
    }

    /// Name of the list field carrying results in a success body.
    pub fn response_field(&self) -> &'static str {
        match self {
            SuggestionCategory::Codes => "suggestions",
            SuggestionCategory::Compliance => "alerts",
            SuggestionCategory::Differentials => "differentials",
            SuggestionCategory::Prevention => "recommendations",
        }
    }

    /// Whether this category is keyed on the current note text.
    ///
    /// Content-dependent categories clear to idle when the note empties;
    /// prevention polls for the lifetime of the panel regardless.
    pub fn content_dependent(&self) -> bool {
        !matches!(self, SuggestionCategory::Prevention)
    }

    /// Whether the request body carries the session's already-added codes.
    pub fn sends_codes(&self) -> bool {
        matches!(self, SuggestionCategory::Compliance)
    }
}

impl std::fmt::Display for SuggestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Category-specific payload carried alongside the uniform fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionDetail {
    Code {
        #[serde(default)]
        usage_rules: Vec<String>,
        #[serde(default)]
        reimbursement: Option<String>,
    },
    Compliance {
        #[serde(default)]
        severity: Option<String>,
        #[serde(default)]
        citation: Option<String>,
    },
    Differential {
        #[serde(default)]
        supporting_factors: Vec<String>,
        #[serde(default)]
        contradicting_factors: Vec<String>,
    },
    Prevention {
        #[serde(default)]
        priority: Option<String>,
        #[serde(default)]
        source: Option<String>,
    },
}

/// A normalized suggestion from any category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub category: SuggestionCategory,
    /// Primary code or label (ICD/CPT code, diagnosis name, alert title)
    pub code: String,
    pub description: String,
    /// 0-100, absent when the server did not state one
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub rationale: Option<String>,
    pub detail: SuggestionDetail,
    pub received_at: DateTime<Utc>,
}

/// Normalize a confidence value to an integer percentage in [0, 100].
///
/// Servers send either a 0-1 fraction or a 0-100 percentage; fractions are
/// rescaled x100 and rounded, everything clamps to [0, 100]. Absent or
/// unparseable values stay absent, never coerced to 0.
pub fn normalize_confidence(value: Option<&Value>) -> Option<u8> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let scaled = if raw.abs() <= 1.0 { raw * 100.0 } else { raw };
    Some(scaled.round().clamp(0.0, 100.0) as u8)
}

/// Map one category's success body into normalized suggestions.
///
/// Response order is preserved. A body without the expected list field (or
/// with a non-array there) maps to no suggestions.
pub fn map_response(category: SuggestionCategory, body: &Value) -> Vec<Suggestion> {
    let Some(items) = body.get(category.response_field()).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| map_item(category, item))
        .collect()
}

fn map_item(category: SuggestionCategory, item: &Value) -> Option<Suggestion> {
    // Entries that are not objects carry nothing usable.
    item.as_object()?;

    let (code, description, detail) = match category {
        SuggestionCategory::Codes => {
            let code = first_string(item, &["code"])?;
            let description = first_string(item, &["description", "label"]).unwrap_or_default();
            let detail = SuggestionDetail::Code {
                usage_rules: string_list(item, &["usageRules", "usage_rules"]),
                reimbursement: first_string(item, &["reimbursement", "reimbursementEstimate"]),
            };
            (code, description, detail)
        }
        SuggestionCategory::Compliance => {
            let description =
                first_string(item, &["text", "message", "description", "alert"])?;
            let code = first_string(item, &["title", "rule", "category"])
                .unwrap_or_else(|| "Compliance".to_string());
            let detail = SuggestionDetail::Compliance {
                severity: first_string(item, &["severity", "priority"]),
                citation: first_string(item, &["citation", "reference"]),
            };
            (code, description, detail)
        }
        SuggestionCategory::Differentials => {
            let code = first_string(item, &["diagnosis", "dx", "label"])?;
            let description = first_string(item, &["description"]).unwrap_or_default();
            let detail = SuggestionDetail::Differential {
                supporting_factors: string_list(
                    item,
                    &["supportingFactors", "supporting_factors", "supporting"],
                ),
                contradicting_factors: string_list(
                    item,
                    &["contradictingFactors", "contradicting_factors", "contradicting"],
                ),
            };
            (code, description, detail)
        }
        SuggestionCategory::Prevention => {
            let code = first_string(item, &["recommendation", "code", "label"])?;
            let description = first_string(item, &["description"]).unwrap_or_default();
            let detail = SuggestionDetail::Prevention {
                priority: first_string(item, &["priority"]),
                source: first_string(item, &["source", "guideline"]),
            };
            (code, description, detail)
        }
    };

    Some(Suggestion {
        id: item
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4),
        category,
        code,
        description,
        confidence: normalize_confidence(item.get("confidence")),
        rationale: first_string(item, &["rationale", "reasoning", "reason"]),
        detail,
        received_at: Utc::now(),
    })
}

/// First non-blank string under any of the given keys.
fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// String list under any of the given keys; non-string entries are skipped.
fn string_list(item: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find_map(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confidence_fraction_rescales_to_percentage() {
        assert_eq!(normalize_confidence(Some(&json!(0.87))), Some(87));
        assert_eq!(normalize_confidence(Some(&json!(0.004))), Some(0));
        assert_eq!(normalize_confidence(Some(&json!(1.0))), Some(100));
    }

    #[test]
    fn confidence_percentage_passes_through_and_clamps() {
        assert_eq!(normalize_confidence(Some(&json!(92))), Some(92));
        assert_eq!(normalize_confidence(Some(&json!(150))), Some(100));
        assert_eq!(normalize_confidence(Some(&json!(-3))), Some(0));
    }

    #[test]
    fn confidence_numeric_string_parses() {
        assert_eq!(normalize_confidence(Some(&json!("0.5"))), Some(50));
        assert_eq!(normalize_confidence(Some(&json!("73"))), Some(73));
    }

    #[test]
    fn confidence_absent_or_garbage_stays_absent() {
        assert_eq!(normalize_confidence(None), None);
        assert_eq!(normalize_confidence(Some(&json!(null))), None);
        assert_eq!(normalize_confidence(Some(&json!("n/a"))), None);
        assert_eq!(normalize_confidence(Some(&json!({"v": 1}))), None);
    }

    #[test]
    fn codes_response_maps_fields() {
        let body = json!({
            "suggestions": [{
                "code": "E11.9",
                "description": "Type 2 diabetes mellitus without complications",
                "confidence": 0.91,
                "reasoning": "documented A1c and medication history",
                "usageRules": ["requires supporting lab value"],
                "reimbursement": "$42.10"
            }]
        });
        let items = map_response(SuggestionCategory::Codes, &body);
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.code, "E11.9");
        assert_eq!(item.confidence, Some(91));
        assert_eq!(
            item.rationale.as_deref(),
            Some("documented A1c and medication history")
        );
        match &item.detail {
            SuggestionDetail::Code {
                usage_rules,
                reimbursement,
            } => {
                assert_eq!(usage_rules.len(), 1);
                assert_eq!(reimbursement.as_deref(), Some("$42.10"));
            }
            other => panic!("wrong detail: {:?}", other),
        }
    }

    #[test]
    fn differential_factor_lists_default_empty() {
        let body = json!({
            "differentials": [{ "diagnosis": "Viral pharyngitis" }]
        });
        let items = map_response(SuggestionCategory::Differentials, &body);
        assert_eq!(items.len(), 1);
        match &items[0].detail {
            SuggestionDetail::Differential {
                supporting_factors,
                contradicting_factors,
            } => {
                assert!(supporting_factors.is_empty());
                assert!(contradicting_factors.is_empty());
            }
            other => panic!("wrong detail: {:?}", other),
        }
    }

    #[test]
    fn missing_or_mistyped_list_field_maps_to_empty() {
        assert!(map_response(SuggestionCategory::Codes, &json!({})).is_empty());
        assert!(map_response(SuggestionCategory::Codes, &json!({"suggestions": "x"})).is_empty());
        assert!(
            map_response(SuggestionCategory::Compliance, &json!({"alerts": null})).is_empty()
        );
    }

    #[test]
    fn unusable_entries_are_skipped_without_failing_the_batch() {
        let body = json!({
            "alerts": [
                "not an object",
                { "no_text_field": true },
                { "text": "Missing attestation for time-based billing", "severity": "high" }
            ]
        });
        let items = map_response(SuggestionCategory::Compliance, &body);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].description,
            "Missing attestation for time-based billing"
        );
    }

    #[test]
    fn response_order_is_preserved() {
        let body = json!({
            "suggestions": [
                { "code": "A" }, { "code": "B" }, { "code": "C" }
            ]
        });
        let codes: Vec<_> = map_response(SuggestionCategory::Codes, &body)
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }
}
