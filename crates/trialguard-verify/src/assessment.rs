//! Match-result normalizer for raw model assessments.

use serde_json::Value;

use trialguard_contracts::{
    assessment::{ConfidenceLevel, MatchResult},
    validation::{Correction, Normalized},
};

use crate::coerce::{field, is_non_list, render, scalar_string, string_list};
use crate::trial::clamp_score;

/// Coerce a raw assessment into a `MatchResult`.
///
/// The score is clamped to `[0, 100]`; a confidence the normalizer cannot
/// read becomes `low`; non-array lists become empty.
pub fn normalize_match_result(raw: &Value) -> Normalized<MatchResult> {
    let mut corrections = Vec::new();

    if !raw.is_object() {
        corrections.push(Correction::new("assessment", render(Some(raw)), "empty assessment", "expected a JSON object"));
    }

    let match_score = clamp_score(
        field(raw, &["matchScore", "match_score", "score"]),
        "matchScore",
        &mut corrections,
    );

    let confidence_raw = field(raw, &["confidenceLevel", "confidence_level", "confidence"]);
    let confidence_level = match confidence_raw.and_then(scalar_string).map(|s| s.to_lowercase()).as_deref() {
        Some("high") => ConfidenceLevel::High,
        Some("medium") | Some("moderate") => ConfidenceLevel::Medium,
        Some("low") => ConfidenceLevel::Low,
        _ => {
            corrections.push(Correction::new(
                "confidenceLevel",
                render(confidence_raw),
                "low",
                "unrecognized confidence level",
            ));
            ConfidenceLevel::Low
        }
    };

    let mut list = |name: &str, keys: &[&str]| {
        let value = field(raw, keys);
        if is_non_list(value) {
            corrections.push(Correction::new(name, render(value), "[]", "expected a list"));
        }
        string_list(value)
    };
    let inclusion_matches = list("inclusionMatches", &["inclusionMatches", "inclusion_matches"]);
    let exclusion_flags = list("exclusionFlags", &["exclusionFlags", "exclusion_flags"]);
    let uncertain_factors = list("uncertainFactors", &["uncertainFactors", "uncertain_factors"]);
    let questions_to_ask = list("questionsToAsk", &["questionsToAsk", "questions_to_ask", "questions"]);

    let explanation = field(raw, &["explanation", "rationale", "reasoning"])
        .and_then(scalar_string)
        .unwrap_or_default();

    Normalized {
        value: MatchResult {
            match_score,
            confidence_level,
            inclusion_matches,
            exclusion_flags,
            uncertain_factors,
            explanation,
            questions_to_ask,
        },
        corrections,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_well_formed_assessment() {
        let raw = json!({
            "matchScore": 72,
            "confidenceLevel": "Medium",
            "inclusionMatches": ["Age 18 or older"],
            "exclusionFlags": [],
            "uncertainFactors": ["Cardiac function not documented"],
            "explanation": "Likely eligible pending echo.",
            "questionsToAsk": ["Most recent LVEF?"]
        });
        let n = normalize_match_result(&raw);
        assert!(n.corrections.is_empty(), "{:?}", n.corrections);
        assert_eq!(n.value.match_score, 72);
        assert_eq!(n.value.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(n.value.uncertain_factors.len(), 1);
    }

    #[test]
    fn test_malformed_assessment_degrades() {
        let raw = json!({
            "matchScore": "150",
            "confidenceLevel": 0.9,
            "exclusionFlags": "none",
            "questionsToAsk": null
        });
        let n = normalize_match_result(&raw);
        assert_eq!(n.value.match_score, 100);
        assert_eq!(n.value.confidence_level, ConfidenceLevel::Low);
        assert!(n.value.exclusion_flags.is_empty());
        assert!(n.value.questions_to_ask.is_empty());
        assert_eq!(n.value.explanation, "");
        assert!(n.corrections.iter().any(|c| c.field == "exclusionFlags"));
    }

    #[test]
    fn test_non_object_assessment() {
        let n = normalize_match_result(&json!("eligible"));
        assert_eq!(n.value, MatchResult::default());
        assert!(!n.corrections.is_empty());
    }
}
