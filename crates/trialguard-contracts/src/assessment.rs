//! Patient-trial assessment types.
//!
//! A `MatchResult` starts life as untrusted model output. The guardrail
//! engine is the only component allowed to rewrite it, and it may only move
//! it toward exclusion and caution.

use serde::{Deserialize, Serialize};

use crate::trial::TrialRecord;

/// How much weight the clinician should give the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

/// The assessment of one patient against one trial.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// In `[0, 100]`.
    pub match_score: u32,
    pub confidence_level: ConfidenceLevel,
    /// Criteria judged satisfied.
    pub inclusion_matches: Vec<String>,
    /// Criteria judged violated, by the model or the guardrail.
    pub exclusion_flags: Vec<String>,
    pub uncertain_factors: Vec<String>,
    pub explanation: String,
    pub questions_to_ask: Vec<String>,
}

/// What the guardrail engine decided for one model-produced `MatchResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailOutcome {
    /// The final result to show the clinician.
    pub result: MatchResult,
    /// True when the score or confidence was rewritten deterministically.
    pub overridden: bool,
    /// Every hard exclusion the guardrail derived, whether or not the model
    /// had already reported it.
    pub flags: Vec<String>,
}

impl GuardrailOutcome {
    /// An outcome that leaves the model's result untouched.
    pub fn pass_through(result: MatchResult) -> Self {
        Self {
            result,
            overridden: false,
            flags: Vec::new(),
        }
    }
}

/// Where an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    /// The model answered and its answer was normalized.
    Model,
    /// The model call failed; the fallback provider's conservative result was used.
    Fallback,
}

/// One row of the clinician-facing result screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialAssessment {
    pub trial: TrialRecord,
    pub result: MatchResult,
    pub overridden: bool,
    pub guardrail_flags: Vec<String>,
    pub source: AssessmentSource,
}
