//! Profile normalizer and validator.
//!
//! The normalizer coerces whatever the model returned into a fully-populated
//! `PatientProfile` and never fails. The validator then checks the canonical
//! profile against medical plausibility rules. Every rule runs; failures are
//! accumulated rather than short-circuited.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use trialguard_contracts::{
    patient::{Gender, PatientProfile},
    validation::{Correction, Normalized, ValidationResult},
};
use trialguard_policy::ProfileLimits;

use crate::coerce::{field, integer, is_non_list, render, scalar_string, string_list};
use crate::markers::{canonical_key, readings, CORE_RECEPTORS};

static STAGE_GRAMMAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Stage (I|II|III|IV)[A-C]?$").expect("valid regex"));

/// A lone stage token: Roman I-IV or a digit 0-4, optional sub-stage letter.
static STAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(iv|i{1,3}|[0-4])([a-c])?$").expect("valid regex"));

static ECOG_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:ecog)?\s*(?:ps|performance\s+status)?\s*[:=]?\s*([+-]?\d+)$")
        .expect("valid regex")
});

static METASTATIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)metasta|\bm1[a-c]?\b").expect("valid regex"));

static CANCER_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cancer|carcinoma|tumou?r|neoplasm|malignan|oncolog|sarcoma|lymphoma|leukemi|leukaemi|melanoma|myeloma|glioma|blastoma|adenocarcinoma|tnbc")
        .expect("valid regex")
});

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Normalize with the stock limits, discarding the correction list.
pub fn normalize_profile(raw: &Value) -> PatientProfile {
    normalize_profile_with_report(raw, &ProfileLimits::default()).value
}

/// Normalize a raw profile and report every repair applied.
///
/// Age is clamped to `[0, limits.max_age]`; a clamp is a blocking
/// correction because it hides an implausible source value.
pub fn normalize_profile_with_report(raw: &Value, limits: &ProfileLimits) -> Normalized<PatientProfile> {
    let mut corrections = Vec::new();
    let raw = unwrap_envelope(raw);

    if !raw.is_object() {
        corrections.push(Correction::new(
            "profile",
            render(Some(raw)),
            "empty profile",
            "expected a JSON object",
        ));
        return Normalized {
            value: PatientProfile::default(),
            corrections,
        };
    }

    let profile = PatientProfile {
        age: normalize_age(field(raw, &["age"]), limits, &mut corrections),
        gender: normalize_gender(field(raw, &["gender", "sex"]), &mut corrections),
        conditions: list(raw, "conditions", &["conditions", "diagnoses"], &mut corrections),
        medications: list(raw, "medications", &["medications", "meds"], &mut corrections),
        allergies: list(raw, "allergies", &["allergies"], &mut corrections),
        biomarkers: normalize_biomarkers(field(raw, &["biomarkers", "markers"]), &mut corrections),
        stage: normalize_stage(field(raw, &["stage"]), &mut corrections),
        prior_treatments: list(
            raw,
            "priorTreatments",
            &["priorTreatments", "prior_treatments", "treatments"],
            &mut corrections,
        ),
        performance_status: normalize_performance_status(
            field(raw, &["performanceStatus", "performance_status", "ecog"]),
            &mut corrections,
        ),
        lab_values: normalize_lab_values(field(raw, &["labValues", "lab_values", "labs"]), &mut corrections),
    };

    debug!(corrections = corrections.len(), "profile normalized");
    Normalized {
        value: profile,
        corrections,
    }
}

/// Models sometimes wrap the record, e.g. `{"patient": {...}}`.
pub(crate) fn unwrap_envelope(raw: &Value) -> &Value {
    let looks_like_profile = field(raw, &["age", "conditions", "biomarkers", "stage"]).is_some();
    if looks_like_profile {
        return raw;
    }
    match field(raw, &["patientProfile", "patient_profile", "profile", "patient"]) {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    }
}

fn normalize_age(value: Option<&Value>, limits: &ProfileLimits, corrections: &mut Vec<Correction>) -> u32 {
    let Some(raw) = value else {
        corrections.push(Correction::new("age", "<missing>", "0", "age not extracted"));
        return 0;
    };
    let Some(n) = integer(raw) else {
        corrections.push(Correction::new("age", render(value), "0", "age is not numeric"));
        return 0;
    };

    let max = i64::from(limits.max_age);
    let clamped = n.clamp(0, max);
    if clamped != n {
        corrections.push(
            Correction::new(
                "age",
                n.to_string(),
                clamped.to_string(),
                format!("age outside [0, {max}]"),
            )
            .blocking(),
        );
    }
    // Clamped into [0, max_age], which fits u32.
    u32::try_from(clamped).unwrap_or(0)
}

fn normalize_gender(value: Option<&Value>, corrections: &mut Vec<Correction>) -> Gender {
    let Some(text) = value.and_then(scalar_string) else {
        return Gender::Unknown;
    };
    let gender = match text.to_lowercase().as_str() {
        "male" | "m" | "man" => Gender::Male,
        "female" | "f" | "woman" => Gender::Female,
        "other" | "non-binary" | "nonbinary" | "x" => Gender::Other,
        _ => Gender::Unknown,
    };
    if gender == Gender::Unknown && !text.eq_ignore_ascii_case("unknown") {
        corrections.push(Correction::new("gender", text, "unknown", "unrecognized gender"));
    }
    gender
}

fn list(raw: &Value, name: &str, keys: &[&str], corrections: &mut Vec<Correction>) -> Vec<String> {
    let value = field(raw, keys);
    if is_non_list(value) {
        corrections.push(Correction::new(name, render(value), "[]", "expected a list"));
    }
    string_list(value)
}

/// `"iiia"` → `"IIIA"`, `"3b"` → `"IIIB"`; `None` if `token` is not a stage.
fn stage_numeral(token: &str) -> Option<String> {
    let caps = STAGE_TOKEN.captures(token)?;
    let numeral = match caps[1].to_ascii_uppercase().as_str() {
        "1" => "I".to_string(),
        "2" => "II".to_string(),
        "3" => "III".to_string(),
        "4" => "IV".to_string(),
        other => other.to_string(),
    };
    let letter = caps.get(2).map(|m| m.as_str().to_ascii_uppercase()).unwrap_or_default();
    Some(format!("{numeral}{letter}"))
}

/// Canonicalize a stage string; `None` for blank input.
///
/// `"stage iiia"` → `"Stage IIIA"`, `"3b"` → `"Stage IIIB"`. Text that is not
/// a single stage token is preserved behind the `Stage` prefix so the
/// validator can name it, with a leading stage token still canonicalized
/// (`"stage iv metastatic"` → `"Stage IV metastatic"`).
pub fn canonical_stage(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let (had_prefix, rest) = match collapsed.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("stage") => (true, collapsed[5..].trim()),
        _ => (false, collapsed.as_str()),
    };

    if let Some(numeral) = stage_numeral(rest) {
        return Some(format!("Stage {numeral}"));
    }
    if !had_prefix {
        return Some(collapsed);
    }

    if rest.is_empty() {
        return Some("Stage".to_string());
    }
    let word_end = rest.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(rest.len());
    let (head, tail) = rest.split_at(word_end);
    Some(match stage_numeral(head) {
        Some(numeral) => format!("Stage {numeral}{tail}"),
        None => format!("Stage {rest}"),
    })
}

fn normalize_stage(value: Option<&Value>, corrections: &mut Vec<Correction>) -> Option<String> {
    let text = value.and_then(scalar_string)?;
    let stage = canonical_stage(&text)?;
    if stage != text {
        corrections.push(Correction::new("stage", text, stage.clone(), "stage spelling"));
    }
    Some(stage)
}

/// Canonicalize a performance status to `ECOG n` where a number can be
/// found; other text is kept for the validator to reject.
pub fn canonical_ecog(value: &Value) -> Option<String> {
    if let Value::Number(_) = value {
        return integer(value).map(|n| format!("ECOG {n}"));
    }
    let text = scalar_string(value)?;
    match ECOG_TEXT.captures(&text) {
        Some(caps) => {
            let n: i64 = caps[1].parse().unwrap_or(i64::MAX);
            Some(format!("ECOG {n}"))
        }
        None => Some(text),
    }
}

fn normalize_performance_status(value: Option<&Value>, corrections: &mut Vec<Correction>) -> Option<String> {
    let raw = value?;
    let ecog = canonical_ecog(raw)?;
    let original = render(Some(raw));
    if ecog != original {
        corrections.push(Correction::new("performanceStatus", original, ecog.clone(), "ECOG spelling"));
    }
    Some(ecog)
}

fn marker_status(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => field(value, &["status", "value", "result"]).and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn insert_marker(
    markers: &mut BTreeMap<String, String>,
    name: &str,
    status: String,
    corrections: &mut Vec<Correction>,
) {
    let key = canonical_key(name);
    if key.is_empty() {
        corrections.push(Correction::new("biomarkers", name, "<dropped>", "biomarker name has no letters or digits"));
        return;
    }
    if key != name {
        corrections.push(Correction::new("biomarkers", name, key.clone(), "biomarker key spelling"));
    }
    match markers.get_mut(&key) {
        Some(existing) if existing.split(" / ").any(|s| s == status) => {}
        Some(existing) => {
            let merged = format!("{existing} / {status}");
            corrections.push(Correction::new(
                format!("biomarkers.{key}"),
                status,
                merged.clone(),
                "colliding biomarker readings merged",
            ));
            *existing = merged;
        }
        None => {
            markers.insert(key, status);
        }
    }
}

fn normalize_biomarkers(value: Option<&Value>, corrections: &mut Vec<Correction>) -> BTreeMap<String, String> {
    let mut markers = BTreeMap::new();
    match value {
        None => {}
        Some(Value::Object(map)) => {
            for (name, v) in map {
                if let Some(status) = marker_status(v) {
                    insert_marker(&mut markers, name, status, corrections);
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let name = field(item, &["name", "marker", "biomarker"]).and_then(scalar_string);
                let status = field(item, &["status", "value", "result"]).and_then(scalar_string);
                if let (Some(name), Some(status)) = (name, status) {
                    insert_marker(&mut markers, &name, status, corrections);
                }
            }
        }
        Some(other) => {
            corrections.push(Correction::new("biomarkers", render(Some(other)), "{}", "expected a map"));
        }
    }
    markers
}

fn normalize_lab_values(value: Option<&Value>, corrections: &mut Vec<Correction>) -> BTreeMap<String, String> {
    let mut labs = BTreeMap::new();
    match value {
        None => {}
        Some(Value::Object(map)) => {
            for (name, v) in map {
                let name = name.trim();
                if let (false, Some(reading)) = (name.is_empty(), scalar_string(v)) {
                    labs.insert(name.to_string(), reading);
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let name = field(item, &["name", "test"]).and_then(scalar_string);
                let reading = field(item, &["value", "result"]).and_then(scalar_string);
                let unit = field(item, &["unit", "units"]).and_then(scalar_string);
                if let (Some(name), Some(reading)) = (name, reading) {
                    let reading = match unit {
                        Some(unit) => format!("{reading} {unit}"),
                        None => reading,
                    };
                    labs.insert(name, reading);
                }
            }
        }
        Some(other) => {
            corrections.push(Correction::new("labValues", render(Some(other)), "{}", "expected a map"));
        }
    }
    labs
}

// ── Validator ─────────────────────────────────────────────────────────────────

/// Validate with the stock limits.
pub fn validate_profile(profile: &PatientProfile) -> ValidationResult {
    validate_profile_with(profile, &ProfileLimits::default())
}

/// Check a canonical profile against the plausibility rules.
///
/// Advisory in the consultation flow: the pipeline logs the result and keeps
/// matching.
pub fn validate_profile_with(profile: &PatientProfile, limits: &ProfileLimits) -> ValidationResult {
    let mut result = ValidationResult::new();

    // ── Age ─────────────────────────────────────────────────────────────────
    if profile.age == 0 {
        result.error("age: 0 means profile extraction failed (no usable age)");
    } else if profile.age < limits.min_adult_age || profile.age > limits.max_age {
        result.error(format!(
            "age: {} is outside the adult-oncology plausibility range [{}, {}]",
            profile.age, limits.min_adult_age, limits.max_age
        ));
    }

    // ── Stage grammar ───────────────────────────────────────────────────────
    if let Some(stage) = profile.stage.as_deref() {
        if !STAGE_GRAMMAR.is_match(stage) {
            result.error(format!(
                "stage: '{stage}' does not match the staging grammar (Stage I-IV with optional A-C sub-stage)"
            ));
        }
    }

    // ── Performance status ──────────────────────────────────────────────────
    if let Some(ps) = profile.performance_status.as_deref() {
        match profile.ecog_value() {
            None => result.error(format!("performanceStatus: '{ps}' is not a recognized ECOG value")),
            Some(n) if n < 0 || n > i64::from(limits.max_ecog) => result.error(format!(
                "performanceStatus: ECOG {n} is outside 0-{}",
                limits.max_ecog
            )),
            Some(_) => {}
        }
    }

    // ── Triple-negative contradiction ───────────────────────────────────────
    if let Some(condition) = profile.conditions.iter().find(|c| is_triple_negative(c)) {
        for marker in CORE_RECEPTORS {
            if let Some(status) = profile.biomarker(marker) {
                if readings(status).positive {
                    result.error(format!(
                        "biomarker contradiction: condition '{condition}' is triple-negative \
                         (HER2-, ER-, PR- by definition) but {marker} is recorded as '{status}'"
                    ));
                }
            }
        }
    }

    // ── In-situ versus metastatic ───────────────────────────────────────────
    if profile.stage.as_deref().is_some_and(is_stage_zero) {
        let stage_text = profile.stage.iter();
        if let Some(evidence) = profile
            .conditions
            .iter()
            .chain(stage_text)
            .find(|text| METASTATIC.is_match(text))
        {
            result.error(format!(
                "stage: Stage 0 (in situ) contradicts metastatic disease indicated by '{evidence}'"
            ));
        }
    }

    // ── Precision warnings ──────────────────────────────────────────────────
    if profile.conditions.is_empty() {
        result.warning("conditions: no diagnoses were extracted");
    } else if let Some(cancer) = profile.conditions.iter().find(|c| CANCER_TERMS.is_match(c)) {
        let has_receptor = CORE_RECEPTORS.iter().any(|m| profile.biomarkers.contains_key(*m));
        if profile.stage.is_none() && !has_receptor {
            result.warning(format!(
                "conditions: '{cancer}' indicates cancer but neither stage nor HER2/ER/PR status \
                 was extracted; matching precision is reduced"
            ));
        }
    }

    for (key, status) in &profile.biomarkers {
        if readings(status).conflicting() {
            result.warning(format!("biomarkers: {key} has conflicting readings '{status}'"));
        }
    }

    debug!(
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "profile validated"
    );
    result
}

fn is_triple_negative(condition: &str) -> bool {
    let lower = condition.to_lowercase();
    lower.contains("triple negative") || lower.contains("triple-negative") || lower.contains("tnbc")
}

fn is_stage_zero(stage: &str) -> bool {
    stage
        .strip_prefix("Stage ")
        .unwrap_or(stage)
        .trim_start()
        .starts_with('0')
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile(raw: Value) -> PatientProfile {
        normalize_profile(&raw)
    }

    fn canonical_json(p: &PatientProfile) -> Value {
        serde_json::to_value(p).unwrap()
    }

    // ── Normalizer ───────────────────────────────────────────────────────────

    /// Garbage in still yields a fully-populated default profile.
    #[test]
    fn test_non_object_degrades_to_defaults() {
        for raw in [json!(null), json!("patient"), json!([1, 2]), json!(7)] {
            let n = normalize_profile_with_report(&raw, &ProfileLimits::default());
            assert_eq!(n.value, PatientProfile::default());
            assert_eq!(n.corrections.len(), 1);
        }
    }

    #[test]
    fn test_age_parsing_and_clamping() {
        assert_eq!(profile(json!({ "age": "52" })).age, 52);
        assert_eq!(profile(json!({ "age": "61 years" })).age, 61);
        assert_eq!(profile(json!({ "age": 44.9 })).age, 44);
        assert_eq!(profile(json!({ "age": "unknown" })).age, 0);
        assert_eq!(profile(json!({})).age, 0);
        assert_eq!(profile(json!({ "age": -3 })).age, 0);
        assert_eq!(profile(json!({ "age": 150 })).age, 120);
        assert_eq!(profile(json!({ "age": 1e300 })).age, 120);
    }

    /// Clamping hides a real problem, so it is reported as blocking.
    #[test]
    fn test_age_clamp_is_blocking_correction() {
        let n = normalize_profile_with_report(&json!({ "age": 150 }), &ProfileLimits::default());
        let c = n.corrections.iter().find(|c| c.field == "age").unwrap();
        assert!(c.blocking);
        assert_eq!(c.original, "150");
        assert_eq!(c.applied, "120");
    }

    #[test]
    fn test_gender_variants() {
        assert_eq!(profile(json!({ "gender": "F" })).gender, Gender::Female);
        assert_eq!(profile(json!({ "sex": "Male" })).gender, Gender::Male);
        assert_eq!(profile(json!({ "gender": "non-binary" })).gender, Gender::Other);
        assert_eq!(profile(json!({ "gender": "n/a" })).gender, Gender::Unknown);
        assert_eq!(profile(json!({ "gender": 3 })).gender, Gender::Unknown);
    }

    #[test]
    fn test_stage_spelling() {
        assert_eq!(canonical_stage("stage iiia").as_deref(), Some("Stage IIIA"));
        assert_eq!(canonical_stage("  STAGE   iv ").as_deref(), Some("Stage IV"));
        assert_eq!(canonical_stage("IIb").as_deref(), Some("Stage IIB"));
        assert_eq!(canonical_stage("3c").as_deref(), Some("Stage IIIC"));
        assert_eq!(canonical_stage("stage 0").as_deref(), Some("Stage 0"));
        assert_eq!(canonical_stage("Stage V").as_deref(), Some("Stage V"));
        assert_eq!(canonical_stage("T2N1M0").as_deref(), Some("T2N1M0"));
        assert_eq!(canonical_stage("stage iv metastatic").as_deref(), Some("Stage IV metastatic"));
        assert_eq!(canonical_stage("Stage 3b, nodal").as_deref(), Some("Stage IIIB, nodal"));
        assert_eq!(canonical_stage("stage iiia (cT2 N2)").as_deref(), Some("Stage IIIA (cT2 N2)"));
        assert_eq!(canonical_stage("stage unknown").as_deref(), Some("Stage unknown"));
        assert_eq!(canonical_stage("   "), None);
        assert_eq!(profile(json!({ "stage": 2 })).stage.as_deref(), Some("Stage II"));
    }

    #[test]
    fn test_performance_status_forms() {
        assert_eq!(profile(json!({ "performanceStatus": "1" })).performance_status.as_deref(), Some("ECOG 1"));
        assert_eq!(profile(json!({ "performanceStatus": 2 })).performance_status.as_deref(), Some("ECOG 2"));
        assert_eq!(profile(json!({ "performance_status": "ecog:0" })).performance_status.as_deref(), Some("ECOG 0"));
        // Out of range is preserved for the validator.
        assert_eq!(profile(json!({ "performanceStatus": "ECOG 7" })).performance_status.as_deref(), Some("ECOG 7"));
        assert_eq!(profile(json!({ "performanceStatus": "bedbound" })).performance_status.as_deref(), Some("bedbound"));
        assert_eq!(profile(json!({ "performanceStatus": "" })).performance_status, None);
    }

    #[test]
    fn test_biomarker_keys_collapse() {
        let p = profile(json!({ "biomarkers": { "her2-neu": "positive", "Estrogen Receptor": "negative" } }));
        assert_eq!(p.biomarker("HER2"), Some("positive"));
        assert_eq!(p.biomarker("ER"), Some("negative"));
        assert_eq!(p.biomarkers.len(), 2);
    }

    /// Colliding keys keep both readings instead of silently dropping one.
    #[test]
    fn test_biomarker_collision_merges() {
        let p = profile(json!({ "biomarkers": { "HER2": "positive", "her2": "negative" } }));
        let status = p.biomarker("HER2").unwrap();
        assert!(status.contains("positive") && status.contains("negative"), "{status}");

        let result = validate_profile(&p);
        assert!(result.warnings().iter().any(|w| w.contains("HER2") && w.contains("conflicting")));
    }

    #[test]
    fn test_biomarker_list_form() {
        let p = profile(json!({ "biomarkers": [
            { "name": "PgR", "status": "positive" },
            { "marker": "EGFR", "value": "L858R" },
            { "name": "", "status": "x" }
        ] }));
        assert_eq!(p.biomarker("PR"), Some("positive"));
        assert_eq!(p.biomarker("EGFR"), Some("L858R"));
        assert_eq!(p.biomarkers.len(), 2);
    }

    #[test]
    fn test_lists_coerced() {
        let p = profile(json!({
            "conditions": "breast cancer",
            "medications": ["  letrozole ", "", null],
            "prior_treatments": ["lumpectomy"]
        }));
        assert!(p.conditions.is_empty());
        assert_eq!(p.medications, vec!["letrozole"]);
        assert_eq!(p.prior_treatments, vec!["lumpectomy"]);
    }

    #[test]
    fn test_envelope_unwrapped() {
        let p = profile(json!({ "patient": { "age": 58, "conditions": ["NSCLC"] } }));
        assert_eq!(p.age, 58);
        assert_eq!(p.conditions, vec!["NSCLC"]);
    }

    /// normalize(normalize(x)) == normalize(x) over a spread of messy input.
    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = vec![
            json!({}),
            json!(null),
            json!({ "age": 150, "gender": "F", "stage": "stage iiia", "performanceStatus": 1 }),
            json!({ "age": "-5", "stage": "Stage V", "performanceStatus": "ECOG 9" }),
            json!({ "biomarkers": { "her2-neu": "positive", "HER2": "negative", "pd-l1": "50%" } }),
            json!({ "biomarkers": [{ "name": "ER", "status": "positive" }], "labValues": [{ "name": "ANC", "value": 1.8, "unit": "x10^9/L" }] }),
            json!({ "conditions": ["  triple negative breast cancer "], "stage": "0", "medications": "none" }),
            json!({ "stage": "T2N1M0", "performanceStatus": "bedbound", "gender": "woman" }),
        ];
        for raw in inputs {
            let once = normalize_profile(&raw);
            let twice = normalize_profile(&canonical_json(&once));
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    /// Age stays within [0, 120] no matter what arrives.
    #[test]
    fn test_age_range_invariant() {
        for raw in [json!(-1e9), json!(0), json!(121), json!("999"), json!(i64::MIN), json!(u64::MAX)] {
            let age = profile(json!({ "age": raw })).age;
            assert!(age <= 120, "age {age} out of range");
        }
    }

    // ── Validator ────────────────────────────────────────────────────────────

    fn valid_profile() -> PatientProfile {
        profile(json!({
            "age": 52,
            "gender": "female",
            "conditions": ["breast cancer"],
            "biomarkers": { "HER2": "positive", "ER": "positive" },
            "stage": "Stage IIB",
            "performanceStatus": "ECOG 1"
        }))
    }

    #[test]
    fn test_valid_profile_passes() {
        let result = validate_profile(&valid_profile());
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.warnings().is_empty(), "{:?}", result.warnings());
    }

    #[test]
    fn test_age_rules() {
        let mut p = valid_profile();
        p.age = 0;
        assert!(validate_profile(&p).errors()[0].contains("extraction failed"));

        p.age = 16;
        assert!(validate_profile(&p).errors()[0].contains("plausibility range"));

        p.age = 18;
        assert!(validate_profile(&p).is_valid());

        p.age = 120;
        assert!(validate_profile(&p).is_valid());
    }

    #[test]
    fn test_stage_grammar_names_value() {
        let mut p = valid_profile();
        p.stage = canonical_stage("Stage V");
        let result = validate_profile(&p);
        assert!(!result.is_valid());
        assert!(result.errors().iter().any(|e| e.contains("Stage V")));
    }

    #[test]
    fn test_ecog_out_of_range_and_unrecognized() {
        let mut p = valid_profile();
        p.performance_status = Some("ECOG 6".into());
        assert!(validate_profile(&p).errors().iter().any(|e| e.contains("ECOG 6")));

        p.performance_status = Some("bedbound".into());
        assert!(validate_profile(&p).errors().iter().any(|e| e.contains("bedbound")));

        p.performance_status = Some("ECOG 5".into());
        assert!(validate_profile(&p).is_valid());
    }

    /// The triple-negative contradiction names the marker and the conflict.
    #[test]
    fn test_triple_negative_contradiction() {
        let p = profile(json!({
            "age": 47,
            "conditions": ["triple negative breast cancer"],
            "biomarkers": { "HER2": "positive" },
            "stage": "Stage II"
        }));
        let result = validate_profile(&p);
        assert!(!result.is_valid());
        let error = &result.errors()[0];
        assert!(error.contains("HER2"), "{error}");
        assert!(error.contains("contradiction"), "{error}");
    }

    #[test]
    fn test_triple_negative_with_negative_markers_is_fine() {
        let p = profile(json!({
            "age": 47,
            "conditions": ["TNBC"],
            "biomarkers": { "HER2": "negative", "ER": "negative", "PR": "0" },
            "stage": "Stage II"
        }));
        assert!(validate_profile(&p).is_valid());
    }

    #[test]
    fn test_stage_zero_metastatic() {
        let p = profile(json!({
            "age": 60,
            "conditions": ["DCIS with metastatic spread to bone"],
            "stage": "0"
        }));
        let result = validate_profile(&p);
        assert!(result.errors().iter().any(|e| e.contains("in situ") && e.contains("metastatic")));
    }

    /// Several independent problems are all reported in one pass.
    #[test]
    fn test_rules_accumulate() {
        let p = profile(json!({
            "age": 0,
            "conditions": ["TNBC"],
            "biomarkers": { "ER": "positive", "PR": "positive" },
            "stage": "Stage V",
            "performanceStatus": "ECOG 8"
        }));
        let result = validate_profile(&p);
        assert_eq!(result.errors().len(), 5, "{:?}", result.errors());
    }

    #[test]
    fn test_precision_warnings() {
        let p = profile(json!({ "age": 55, "conditions": ["metastatic colorectal carcinoma"] }));
        let result = validate_profile(&p);
        assert!(result.is_valid());
        assert!(result.warnings()[0].contains("precision"));

        let p = profile(json!({ "age": 55 }));
        assert!(validate_profile(&p).warnings()[0].contains("no diagnoses"));
    }

    /// Scenario C: 150 clamps to 120, which is itself a valid boundary; the
    /// blocking correction carries the error into the absorbed report.
    #[test]
    fn test_scenario_c_age_150() {
        let limits = ProfileLimits::default();
        let n = normalize_profile_with_report(
            &json!({ "age": 150, "conditions": ["breast cancer"], "stage": "Stage I" }),
            &limits,
        );
        assert_eq!(n.value.age, 120);

        let bare = validate_profile_with(&n.value, &limits);
        assert!(bare.is_valid());

        let report = bare.absorb(&n.corrections);
        assert!(!report.is_valid());
        assert!(report.errors()[0].contains("150"));
    }
}
