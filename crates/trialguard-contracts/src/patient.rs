//! Canonical patient profile.
//!
//! A `PatientProfile` is only ever produced by the profile normalizer. Its
//! serialized form uses camelCase keys so it can be fed straight back into
//! the normalizer (normalization is idempotent).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Upper bound of the normalized `age` field.
pub const MAX_AGE: u32 = 120;

/// Recorded gender. Anything the normalizer cannot place becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

impl Gender {
    /// Lowercase label, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

/// The structured patient record extracted from a free-text clinical note.
///
/// Invariants held after normalization:
/// - `age` is in `[0, MAX_AGE]`; `0` means extraction failed.
/// - `biomarkers` keys are uppercase alphanumeric with aliases collapsed
///   (`"her2-neu"` and `"HER2"` are the same key).
/// - `stage` and `performance_status`, when present, are in canonical
///   spelling; whether they are *valid* is the validator's call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub age: u32,
    pub gender: Gender,
    /// Diagnoses in the order the model reported them.
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    /// Marker name → status string, e.g. `"HER2" → "positive"`.
    pub biomarkers: BTreeMap<String, String>,
    /// e.g. `"Stage IIIA"`.
    pub stage: Option<String>,
    pub prior_treatments: Vec<String>,
    /// e.g. `"ECOG 1"`.
    pub performance_status: Option<String>,
    pub lab_values: BTreeMap<String, String>,
}

impl PatientProfile {
    /// Look up a biomarker status by its canonical key.
    pub fn biomarker(&self, key: &str) -> Option<&str> {
        self.biomarkers.get(key).map(String::as_str)
    }

    /// The numeric part of `performance_status`, if it has the `ECOG n` form.
    pub fn ecog_value(&self) -> Option<i64> {
        self.performance_status
            .as_deref()
            .and_then(|ps| ps.strip_prefix("ECOG "))
            .and_then(|n| n.trim().parse().ok())
    }

    /// A one-line summary for display and for the history log.
    ///
    /// Deliberately omits medications, allergies and lab values.
    pub fn display_summary(&self) -> String {
        let age = if self.age == 0 {
            "age unknown".to_string()
        } else {
            format!("{}y", self.age)
        };
        let primary = self
            .conditions
            .first()
            .map(String::as_str)
            .unwrap_or("no recorded condition");
        match &self.stage {
            Some(stage) => format!("{age} {}, {primary} ({stage})", self.gender.as_str()),
            None => format!("{age} {}, {primary}", self.gender.as_str()),
        }
    }
}
