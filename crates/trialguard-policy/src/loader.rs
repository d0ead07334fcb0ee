//! Loading a `GuardrailPolicy` from TOML.

use std::path::Path;

use tracing::{debug, warn};

use trialguard_contracts::error::{TrialGuardError, TrialGuardResult};

use crate::config::{GuardrailPolicy, MAX_EXCLUSION_SCORE_CEILING, TRIAL_BATCH_SIZE};

impl GuardrailPolicy {
    /// Parse `s` as TOML.
    ///
    /// Returns `TrialGuardError::ConfigError` if the TOML is malformed, does
    /// not match the schema, or describes limits that cannot be satisfied.
    pub fn from_toml_str(s: &str) -> TrialGuardResult<Self> {
        let policy: GuardrailPolicy = toml::from_str(s).map_err(|e| TrialGuardError::ConfigError {
            reason: format!("failed to parse guardrail policy TOML: {}", e),
        })?;
        policy.check()?;
        debug!(
            batch_size = policy.trials.batch_size,
            ceiling = policy.guardrail.exclusion_score_ceiling,
            timeout_ms = policy.model.timeout_ms,
            "guardrail policy loaded"
        );
        Ok(policy)
    }

    /// Read the file at `path` and parse it as a guardrail policy.
    pub fn from_file(path: &Path) -> TrialGuardResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TrialGuardError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject limit combinations the validators cannot honour.
    fn check(&self) -> TrialGuardResult<()> {
        let mut problems = Vec::new();
        if self.profile.min_adult_age > self.profile.max_age {
            problems.push(format!(
                "profile.min_adult_age ({}) exceeds profile.max_age ({})",
                self.profile.min_adult_age, self.profile.max_age
            ));
        }
        if self.profile.max_age > trialguard_contracts::patient::MAX_AGE {
            problems.push(format!(
                "profile.max_age ({}) exceeds the hard ceiling of {}",
                self.profile.max_age,
                trialguard_contracts::patient::MAX_AGE
            ));
        }
        if self.trials.batch_size != TRIAL_BATCH_SIZE {
            problems.push(format!(
                "trials.batch_size ({}) must be {TRIAL_BATCH_SIZE}",
                self.trials.batch_size
            ));
        }
        if self.guardrail.exclusion_score_ceiling > MAX_EXCLUSION_SCORE_CEILING {
            problems.push(format!(
                "guardrail.exclusion_score_ceiling ({}) is outside [0, {MAX_EXCLUSION_SCORE_CEILING}]",
                self.guardrail.exclusion_score_ceiling
            ));
        }
        if self.model.timeout_ms == 0 {
            problems.push("model.timeout_ms must be positive".to_string());
        }

        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            warn!(%problem, "rejected guardrail policy");
        }
        Err(TrialGuardError::ConfigError {
            reason: problems.join("; "),
        })
    }
}
