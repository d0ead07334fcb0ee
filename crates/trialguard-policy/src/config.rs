//! Guardrail policy schema.
//!
//! A `GuardrailPolicy` is deserialized from TOML. Every section and every
//! field has a default, so an empty document yields the stock policy.
//!
//! ```toml
//! [profile]
//! min_adult_age = 18
//!
//! [guardrail]
//! exclusion_score_ceiling = 25
//!
//! [model]
//! timeout_ms = 30000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The only batch size the pipeline supports; the reference fallback set
/// holds exactly this many trials.
pub const TRIAL_BATCH_SIZE: usize = 3;

/// Highest score a confirmed hard exclusion may leave standing.
pub const MAX_EXCLUSION_SCORE_CEILING: u32 = 25;

/// Plausibility bounds for extracted patient profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileLimits {
    /// Lowest age accepted for adult-oncology matching.
    pub min_adult_age: u32,
    /// Highest plausible age. Ages above it are clamped by the normalizer
    /// and reported as a blocking correction.
    pub max_age: u32,
    /// Highest valid ECOG value.
    pub max_ecog: i64,
}

impl Default for ProfileLimits {
    fn default() -> Self {
        Self {
            min_adult_age: 18,
            max_age: 120,
            max_ecog: 5,
        }
    }
}

/// Structural expectations for a trial batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialLimits {
    /// Exact number of trials a batch must hold.
    pub batch_size: usize,
    pub min_inclusion_criteria: usize,
    pub min_exclusion_criteria: usize,
    /// A `perfect` trial scored below this draws a warning.
    pub perfect_score_floor: u32,
    /// An `excluded` trial scored above this draws a warning.
    pub excluded_score_ceiling: u32,
}

impl Default for TrialLimits {
    fn default() -> Self {
        Self {
            batch_size: TRIAL_BATCH_SIZE,
            min_inclusion_criteria: 3,
            min_exclusion_criteria: 2,
            perfect_score_floor: 85,
            excluded_score_ceiling: 25,
        }
    }
}

/// Guardrail engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailLimits {
    /// Score ceiling applied once a confirmed hard exclusion is found.
    pub exclusion_score_ceiling: u32,
}

impl Default for GuardrailLimits {
    fn default() -> Self {
        Self {
            exclusion_score_ceiling: MAX_EXCLUSION_SCORE_CEILING,
        }
    }
}

/// Bounds the pipeline applies to the model collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelLimits {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Extra attempts after a response that holds no parseable JSON.
    pub parse_retries: u32,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            parse_retries: 1,
        }
    }
}

impl ModelLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailPolicy {
    pub profile: ProfileLimits,
    pub trials: TrialLimits,
    pub guardrail: GuardrailLimits,
    pub model: ModelLimits,
}
