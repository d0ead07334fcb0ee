//! Canonical trial records and the fixed-size batch the assessment flow uses.

use serde::{Deserialize, Serialize};

/// Trial phase. Serialized as `"Phase 1"`, `"Phase 2"`, `"Phase 3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "Phase 1")]
    One,
    #[default]
    #[serde(rename = "Phase 2")]
    Two,
    #[serde(rename = "Phase 3")]
    Three,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::One => "Phase 1",
            Phase::Two => "Phase 2",
            Phase::Three => "Phase 3",
        }
    }
}

/// Coarse match bucket, independent of the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Perfect,
    Excluded,
    /// The conservative default for anything the normalizer cannot place.
    #[default]
    Uncertain,
}

impl MatchType {
    pub const ALL: [MatchType; 3] = [MatchType::Perfect, MatchType::Excluded, MatchType::Uncertain];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Perfect => "perfect",
            MatchType::Excluded => "excluded",
            MatchType::Uncertain => "uncertain",
        }
    }
}

/// A single clinical trial after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    /// `NCT` followed by eight ASCII digits.
    pub identifier: String,
    pub title: String,
    pub phase: Phase,
    pub summary: String,
    pub inclusion_criteria: Vec<String>,
    pub exclusion_criteria: Vec<String>,
    pub match_type: MatchType,
    /// In `[0, 100]`.
    pub match_score: u32,
}

/// The output of the trial normalizer.
///
/// `trials` always holds exactly the configured batch size. When the raw
/// input was short, the tail is backfilled from the fallback set and
/// `backfilled` says how many slots that took; the trial validator treats
/// any backfill as blocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBatch {
    pub trials: Vec<TrialRecord>,
    /// How many usable records the raw input contained (before truncation).
    pub source_count: usize,
    /// How many trailing slots were filled from the fallback set.
    pub backfilled: usize,
}

impl TrialBatch {
    /// Wrap an already-canonical list that needed no backfill.
    pub fn from_trials(trials: Vec<TrialRecord>) -> Self {
        let source_count = trials.len();
        Self {
            trials,
            source_count,
            backfilled: 0,
        }
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.trials.iter().map(|t| t.identifier.as_str()).collect()
    }
}
