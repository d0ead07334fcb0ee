//! Trial normalizer and validator.
//!
//! A trial batch is blocking in the consultation flow: if the validator
//! reports any error the pipeline discards the whole batch and shows the
//! fallback set instead.

use std::collections::HashSet;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use trialguard_contracts::{
    trial::{MatchType, Phase, TrialBatch, TrialRecord},
    validation::{Correction, Normalized, ValidationResult},
};
use trialguard_policy::TrialLimits;

use crate::coerce::{field, integer, is_non_list, render, scalar_string, string_list};
use crate::fallback::fallback_trials;

static NCT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^NCT\d{8}$").expect("valid regex"));

/// Whether `identifier` is `NCT` followed by exactly 8 ASCII digits.
pub fn is_nct_identifier(identifier: &str) -> bool {
    NCT_GRAMMAR.is_match(identifier)
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Normalize with the stock limits. Always returns exactly three records.
pub fn normalize_trials(raw: &Value) -> Vec<TrialRecord> {
    normalize_trial_batch(raw, &TrialLimits::default()).value.trials
}

/// Normalize a raw trial payload into a batch of exactly `batch_size`.
///
/// Accepts a bare array or an object carrying a `trials` array. Extra records
/// are truncated. A shortfall is filled from the fallback set and recorded in
/// `TrialBatch::backfilled`; criteria text is never invented.
pub fn normalize_trial_batch(raw: &Value, limits: &TrialLimits) -> Normalized<TrialBatch> {
    let mut corrections = Vec::new();

    let items: &[Value] = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => match field(raw, &["trials", "clinicalTrials", "results"]) {
            Some(Value::Array(items)) => items.as_slice(),
            // A single bare trial record.
            _ if field(raw, &["identifier", "nctId", "title"]).is_some() => std::slice::from_ref(raw),
            _ => {
                corrections.push(Correction::new("trials", render(Some(raw)), "[]", "no trial list found"));
                &[][..]
            }
        },
        other => {
            corrections.push(Correction::new("trials", render(Some(other)), "[]", "expected a list of trials"));
            &[][..]
        }
    };

    let records: Vec<&Value> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if item.is_object() {
                Some(item)
            } else {
                corrections.push(Correction::new(
                    format!("trials[{i}]"),
                    render(Some(item)),
                    "<dropped>",
                    "trial is not an object",
                ));
                None
            }
        })
        .collect();

    let source_count = records.len();
    if source_count > limits.batch_size {
        corrections.push(Correction::new(
            "trials",
            format!("{source_count} records"),
            format!("{} records", limits.batch_size),
            "batch truncated",
        ));
    }

    let mut trials: Vec<TrialRecord> = Vec::with_capacity(limits.batch_size);
    for (i, raw_trial) in records.into_iter().take(limits.batch_size).enumerate() {
        let taken: HashSet<String> = trials.iter().map(|t| t.identifier.clone()).collect();
        trials.push(normalize_trial(i, raw_trial, &taken, &mut corrections));
    }

    let mut backfilled = 0;
    if trials.len() < limits.batch_size {
        let needed = limits.batch_size - trials.len();
        let fill: Vec<TrialRecord> = fallback_trials()
            .into_iter()
            .filter(|f| !trials.iter().any(|t| t.identifier == f.identifier))
            .take(needed)
            .collect();
        backfilled = fill.len();
        trials.extend(fill);
    }

    debug!(source_count, backfilled, corrections = corrections.len(), "trial batch normalized");
    Normalized {
        value: TrialBatch {
            trials,
            source_count,
            backfilled,
        },
        corrections,
    }
}

fn normalize_trial(
    index: usize,
    raw: &Value,
    taken: &HashSet<String>,
    corrections: &mut Vec<Correction>,
) -> TrialRecord {
    let at = |name: &str| format!("trials[{index}].{name}");
    let text = |keys: &[&str]| field(raw, keys).and_then(scalar_string).unwrap_or_default();

    // ── Identifier ──────────────────────────────────────────────────────────
    let given = field(raw, &["identifier", "nctId", "nct_id", "id", "trialId"])
        .and_then(scalar_string)
        .map(|s| s.to_ascii_uppercase());
    let identifier = match given {
        Some(id) if is_nct_identifier(&id) => id,
        other => {
            let fresh = synthetic_identifier(taken);
            corrections.push(Correction::new(
                at("identifier"),
                other.unwrap_or_else(|| "<missing>".to_string()),
                fresh.clone(),
                "identifier does not match NCT + 8 digits",
            ));
            fresh
        }
    };

    // ── Phase ───────────────────────────────────────────────────────────────
    let phase_raw = field(raw, &["phase"]);
    let phase = match phase_raw.and_then(parse_phase) {
        Some(phase) => phase,
        None => {
            corrections.push(Correction::new(
                at("phase"),
                render(phase_raw),
                Phase::default().as_str(),
                "unrecognized phase",
            ));
            Phase::default()
        }
    };

    // ── Match type and score ────────────────────────────────────────────────
    let type_raw = field(raw, &["matchType", "match_type"]);
    let match_type = match type_raw.and_then(scalar_string).and_then(|s| parse_match_type(&s)) {
        Some(t) => t,
        None => {
            corrections.push(Correction::new(
                at("matchType"),
                render(type_raw),
                MatchType::Uncertain.as_str(),
                "unrecognized match type",
            ));
            MatchType::Uncertain
        }
    };

    let score_raw = field(raw, &["matchScore", "match_score", "score"]);
    let match_score = clamp_score(score_raw, &at("matchScore"), corrections);

    // ── Criteria ────────────────────────────────────────────────────────────
    let mut criteria = |name: &str, keys: &[&str]| {
        let value = field(raw, keys);
        if is_non_list(value) {
            corrections.push(Correction::new(at(name), render(value), "[]", "expected a list"));
        }
        string_list(value)
    };
    let inclusion_criteria = criteria("inclusionCriteria", &["inclusionCriteria", "inclusion_criteria", "inclusion"]);
    let exclusion_criteria = criteria("exclusionCriteria", &["exclusionCriteria", "exclusion_criteria", "exclusion"]);

    TrialRecord {
        identifier,
        title: text(&["title", "briefTitle", "name"]),
        phase,
        summary: text(&["summary", "briefSummary", "description"]),
        inclusion_criteria,
        exclusion_criteria,
        match_type,
        match_score,
    }
}

/// A random, grammar-conforming identifier not already used in the batch.
fn synthetic_identifier(taken: &HashSet<String>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("NCT{:08}", rng.gen_range(0..100_000_000u32));
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

fn parse_phase(value: &Value) -> Option<Phase> {
    let text = scalar_string(value)?.to_lowercase();
    let stripped = text
        .strip_prefix("phase")
        .unwrap_or(&text)
        .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '-');
    match stripped {
        "1" | "i" | "one" => Some(Phase::One),
        "2" | "ii" | "two" => Some(Phase::Two),
        "3" | "iii" | "three" => Some(Phase::Three),
        _ => None,
    }
}

fn parse_match_type(text: &str) -> Option<MatchType> {
    let lower = text.to_lowercase();
    MatchType::ALL.into_iter().find(|t| t.as_str() == lower)
}

/// Read a score and clamp it into `[0, 100]`, recording any repair.
pub(crate) fn clamp_score(value: Option<&Value>, path: &str, corrections: &mut Vec<Correction>) -> u32 {
    let Some(n) = value.and_then(integer) else {
        corrections.push(Correction::new(path, render(value), "0", "score is missing or not numeric"));
        return 0;
    };
    let clamped = n.clamp(0, 100);
    if clamped != n {
        corrections.push(Correction::new(path, n.to_string(), clamped.to_string(), "score outside [0, 100]"));
    }
    u32::try_from(clamped).unwrap_or(0)
}

// ── Validator ─────────────────────────────────────────────────────────────────

/// Validate a trial list with the stock limits.
pub fn validate_trials(trials: &[TrialRecord]) -> ValidationResult {
    validate_trials_with(trials, &TrialLimits::default())
}

/// Check a trial list for structural completeness and internal consistency.
pub fn validate_trials_with(trials: &[TrialRecord], limits: &TrialLimits) -> ValidationResult {
    let mut result = ValidationResult::new();

    if trials.len() != limits.batch_size {
        result.error(format!(
            "batch: expected {} trials, got {}",
            limits.batch_size,
            trials.len()
        ));
    }

    for (i, trial) in trials.iter().enumerate() {
        if !is_nct_identifier(&trial.identifier) {
            result.error(format!(
                "trials[{i}].identifier: '{}' does not match NCT + 8 digits",
                trial.identifier
            ));
        }
        if trial.title.trim().is_empty() {
            result.error(format!("trials[{i}].title: required field is empty"));
        }
        if trial.summary.trim().is_empty() {
            result.error(format!("trials[{i}].summary: required field is empty"));
        }
        if trial.inclusion_criteria.len() < limits.min_inclusion_criteria {
            result.error(format!(
                "trials[{i}].inclusionCriteria: {} criteria, at least {} required",
                trial.inclusion_criteria.len(),
                limits.min_inclusion_criteria
            ));
        }
        if trial.exclusion_criteria.len() < limits.min_exclusion_criteria {
            result.error(format!(
                "trials[{i}].exclusionCriteria: {} criteria, at least {} required",
                trial.exclusion_criteria.len(),
                limits.min_exclusion_criteria
            ));
        }

        match trial.match_type {
            MatchType::Perfect if trial.match_score < limits.perfect_score_floor => {
                result.warning(format!(
                    "trials[{i}]: matchType 'perfect' with matchScore {} below {}",
                    trial.match_score, limits.perfect_score_floor
                ));
            }
            MatchType::Excluded if trial.match_score > limits.excluded_score_ceiling => {
                result.warning(format!(
                    "trials[{i}]: matchType 'excluded' with matchScore {} above {}",
                    trial.match_score, limits.excluded_score_ceiling
                ));
            }
            _ => {}
        }
    }

    let mut seen = HashSet::new();
    for trial in trials {
        if !seen.insert(trial.identifier.as_str()) {
            result.warning(format!("batch: identifier {} appears more than once", trial.identifier));
        }
    }

    for match_type in MatchType::ALL {
        if !trials.iter().any(|t| t.match_type == match_type) {
            result.warning(format!(
                "batch: no '{}' trial; expected one of each match type",
                match_type.as_str()
            ));
        }
    }

    debug!(
        trials = trials.len(),
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "trial list validated"
    );
    result
}

/// Validate a normalized batch. A backfilled batch is rejected so the caller
/// substitutes the complete fallback set.
pub fn validate_batch(batch: &TrialBatch, limits: &TrialLimits) -> ValidationResult {
    let mut result = validate_trials_with(&batch.trials, limits);
    if batch.backfilled > 0 {
        result.error(format!(
            "batch: only {} usable trial records received; {} backfilled from reference data",
            batch.source_count, batch.backfilled
        ));
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_trial(id: &str, match_type: &str, score: i64) -> Value {
        json!({
            "identifier": id,
            "title": "Neoadjuvant pembrolizumab in early breast cancer",
            "phase": "Phase II",
            "summary": "Evaluates pembrolizumab before surgery.",
            "inclusionCriteria": ["Age 18 or older", "Stage II-III disease", "ECOG 0-1"],
            "exclusionCriteria": ["Prior immunotherapy", "Active autoimmune disease"],
            "matchType": match_type,
            "matchScore": score
        })
    }

    fn three_raw() -> Value {
        json!([
            raw_trial("NCT01234567", "perfect", 91),
            raw_trial("NCT02345678", "excluded", 10),
            raw_trial("NCT03456789", "uncertain", 55),
        ])
    }

    #[test]
    fn test_clean_batch_needs_no_repair() {
        let n = normalize_trial_batch(&three_raw(), &TrialLimits::default());
        assert!(n.corrections.is_empty(), "{:?}", n.corrections);
        assert_eq!(n.value.source_count, 3);
        assert_eq!(n.value.backfilled, 0);
        assert_eq!(n.value.trials[0].phase, Phase::Two);

        let result = validate_batch(&n.value, &TrialLimits::default());
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.warnings().is_empty());
    }

    /// Output length is always three.
    #[test]
    fn test_count_invariant() {
        let many: Vec<Value> = (0..10)
            .map(|i| raw_trial(&format!("NCT{:08}", i + 1), "uncertain", 50))
            .collect();
        let one = vec![raw_trial("NCT01234567", "perfect", 90)];
        for raw in [json!([]), json!(one), json!(many), json!(null), json!("trials"), json!([1, "x"])] {
            assert_eq!(normalize_trials(&raw).len(), 3, "for {raw}");
        }
    }

    #[test]
    fn test_wrapped_batch_accepted() {
        let raw = json!({ "trials": three_raw() });
        let n = normalize_trial_batch(&raw, &TrialLimits::default());
        assert_eq!(n.value.source_count, 3);
        assert_eq!(n.value.backfilled, 0);
    }

    #[test]
    fn test_bad_identifier_replaced() {
        let raw = json!([raw_trial("NCT-123", "perfect", 90)]);
        let n = normalize_trial_batch(&raw, &TrialLimits::default());
        let id = &n.value.trials[0].identifier;
        assert!(is_nct_identifier(id), "{id}");
        assert!(n.corrections.iter().any(|c| c.field == "trials[0].identifier" && c.original == "NCT-123"));
    }

    #[test]
    fn test_lowercase_identifier_upcased() {
        let raw = json!([raw_trial(" nct01234567 ", "perfect", 90)]);
        assert_eq!(normalize_trials(&raw)[0].identifier, "NCT01234567");
    }

    #[test]
    fn test_phase_variants() {
        for (raw, phase) in [
            (json!("phase 1"), Phase::One),
            (json!("Phase I"), Phase::One),
            (json!("1"), Phase::One),
            (json!(3), Phase::Three),
            (json!("PHASE III"), Phase::Three),
            (json!("Phase 2"), Phase::Two),
            (json!("Phase 1/2"), Phase::Two),
            (json!("early"), Phase::Two),
        ] {
            let mut t = raw_trial("NCT01234567", "perfect", 90);
            t["phase"] = raw.clone();
            assert_eq!(normalize_trials(&json!([t]))[0].phase, phase, "for {raw}");
        }
    }

    #[test]
    fn test_score_clamped_and_type_defaulted() {
        let mut t = raw_trial("NCT01234567", "maybe", 140);
        t["matchScore"] = json!(140);
        let trial = &normalize_trials(&json!([t]))[0];
        assert_eq!(trial.match_score, 100);
        assert_eq!(trial.match_type, MatchType::Uncertain);

        let t = raw_trial("NCT01234567", "Perfect", -20);
        let trial = &normalize_trials(&json!([t]))[0];
        assert_eq!(trial.match_score, 0);
        assert_eq!(trial.match_type, MatchType::Perfect);
    }

    /// Scores stay within [0, 100] for any numeric or textual input.
    #[test]
    fn test_score_range_invariant() {
        for score in [json!(-1), json!(101), json!(1e12), json!("87.9"), json!("n/a"), json!(null)] {
            let mut t = raw_trial("NCT01234567", "perfect", 0);
            t["matchScore"] = score;
            assert!(normalize_trials(&json!([t]))[0].match_score <= 100);
        }
    }

    /// Blank criteria are dropped and the shortfall is not padded.
    #[test]
    fn test_criteria_not_padded() {
        let mut t = raw_trial("NCT01234567", "perfect", 90);
        t["inclusionCriteria"] = json!(["Age 18 or older", "  ", ""]);
        t["exclusionCriteria"] = json!("none");
        let trial = &normalize_trials(&json!([t]))[0];
        assert_eq!(trial.inclusion_criteria, vec!["Age 18 or older"]);
        assert!(trial.exclusion_criteria.is_empty());

        let result = validate_trials(&[trial.clone()]);
        assert!(result.errors().iter().any(|e| e.contains("inclusionCriteria")));
        assert!(result.errors().iter().any(|e| e.contains("exclusionCriteria")));
    }

    #[test]
    fn test_truncation() {
        let many: Vec<Value> = (0..5)
            .map(|i| raw_trial(&format!("NCT1000000{i}"), "uncertain", 50))
            .collect();
        let n = normalize_trial_batch(&json!(many), &TrialLimits::default());
        assert_eq!(n.value.source_count, 5);
        assert_eq!(n.value.trials.len(), 3);
        assert_eq!(n.value.trials[2].identifier, "NCT10000002");
        assert!(n.corrections.iter().any(|c| c.reason == "batch truncated"));
    }

    /// Scenario B: two trials in, three out; the short input is itself
    /// invalid and the backfilled batch is rejected.
    #[test]
    fn test_scenario_b_short_batch() {
        let two = json!([
            raw_trial("NCT01234567", "perfect", 91),
            raw_trial("NCT02345678", "excluded", 10),
        ]);
        let limits = TrialLimits::default();
        let n = normalize_trial_batch(&two, &limits);
        assert_eq!(n.value.trials.len(), 3);
        assert_eq!(n.value.backfilled, 1);
        assert_eq!(n.value.trials[2].identifier, "NCT99000001");

        let batch_report = validate_batch(&n.value, &limits);
        assert!(!batch_report.is_valid());
        assert!(batch_report.errors().iter().any(|e| e.contains("backfilled")));

        let unrepaired: Vec<TrialRecord> = n.value.trials[..2].to_vec();
        let raw_report = validate_trials(&unrepaired);
        assert!(raw_report.errors().iter().any(|e| e.contains("expected 3 trials, got 2")));
    }

    #[test]
    fn test_backfill_skips_present_identifiers() {
        let raw = json!([raw_trial("NCT99000001", "perfect", 90)]);
        let n = normalize_trial_batch(&raw, &TrialLimits::default());
        let ids = n.value.identifiers();
        assert_eq!(ids, vec!["NCT99000001", "NCT99000002", "NCT99000003"]);
        assert_eq!(n.value.backfilled, 2);
    }

    #[test]
    fn test_validator_names_index_and_value() {
        let mut trials = fallback_trials();
        trials[1].identifier = "NCT123".into();
        trials[2].title = "  ".into();
        let result = validate_trials(&trials);
        assert!(result.errors().iter().any(|e| e.contains("trials[1]") && e.contains("NCT123")));
        assert!(result.errors().iter().any(|e| e.contains("trials[2].title")));
    }

    #[test]
    fn test_misalignment_and_distribution_are_warnings() {
        let mut trials = fallback_trials();
        trials[0].match_score = 60;
        trials[1].match_type = MatchType::Uncertain;
        let result = validate_trials(&trials);
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.warnings().iter().any(|w| w.contains("'perfect'") && w.contains("60")));
        assert!(result.warnings().iter().any(|w| w.contains("no 'excluded' trial")));
    }

    #[test]
    fn test_duplicate_identifiers_warn() {
        let mut trials = fallback_trials();
        trials[2].identifier = trials[0].identifier.clone();
        let result = validate_trials(&trials);
        assert!(result.warnings().iter().any(|w| w.contains("more than once")));
    }
}
