//! # trialguard-ref-oncology
//!
//! Oncology reference runtime for trialguard.
//!
//! Wires the real sanitizer, guardrail, fallback provider and history log
//! to a static trial corpus and a scripted model, and ships three runnable
//! scenarios:
//!
//! - **A** (`her2_exclusion`): the guardrail overrides a model that missed a
//!   HER2-negative requirement.
//! - **B** (`short_batch`): a two-trial corpus slice is backfilled, rejected
//!   and replaced by the fallback set.
//! - **C** (`implausible_age`): an extracted age of 150 is clamped to 120 and
//!   surfaced as a profile error.

pub mod corpus;
pub mod mock_data;
pub mod model;
pub mod scenarios;

use trialguard_contracts::error::TrialGuardResult;
use trialguard_policy::GuardrailPolicy;

pub use corpus::StaticTrialCorpus;
pub use model::ScriptedModel;
pub use scenarios::run_all;

/// The bundled oncology policy, as TOML.
pub const ONCOLOGY_POLICY: &str = include_str!("../policies/oncology.toml");

/// Parse [`ONCOLOGY_POLICY`].
pub fn oncology_policy() -> TrialGuardResult<GuardrailPolicy> {
    GuardrailPolicy::from_toml_str(ONCOLOGY_POLICY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_policy_parses() {
        let policy = oncology_policy().unwrap();
        assert_eq!(policy.profile.min_adult_age, 18);
        assert_eq!(policy.trials.batch_size, 3);
        assert_eq!(policy.guardrail.exclusion_score_ceiling, 25);
        assert_eq!(policy, GuardrailPolicy::default());
    }

    #[tokio::test]
    async fn test_run_all() {
        let reports = run_all(&oncology_policy().unwrap()).await.unwrap();
        assert_eq!(reports.len(), 3);
        let overrides: usize = reports.iter().map(|r| r.override_count()).sum();
        assert_eq!(overrides, 1);
    }
}
