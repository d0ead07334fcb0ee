//! `Sanitizer` implementation that runs shape diagnostics, normalization and
//! validation under one policy.

use serde_json::Value;
use tracing::warn;

use trialguard_contracts::{
    assessment::MatchResult,
    patient::PatientProfile,
    trial::TrialBatch,
    validation::{Correction, Normalized, ValidationResult},
};
use trialguard_core::traits::Sanitizer;
use trialguard_policy::GuardrailPolicy;

use crate::assessment::normalize_match_result;
use crate::profile::{normalize_profile_with_report, unwrap_envelope, validate_profile_with};
use crate::shape::{diagnose, Shape};
use crate::trial::{normalize_trial_batch, validate_batch};

/// The clinical sanitizer used by the consultation pipeline.
#[derive(Debug, Clone, Default)]
pub struct ClinicalSanitizer {
    policy: GuardrailPolicy,
}

impl ClinicalSanitizer {
    pub fn new(policy: GuardrailPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GuardrailPolicy {
        &self.policy
    }
}

/// Shape findings first, then the normalizer's own repairs.
fn with_shape<T>(raw: &Value, shape: Shape, mut normalized: Normalized<T>) -> Normalized<T> {
    let mut corrections: Vec<Correction> = diagnose(raw, shape);
    corrections.append(&mut normalized.corrections);
    for c in corrections.iter().filter(|c| !c.reason.starts_with("shape mismatch")) {
        warn!(
            shape = shape.as_str(),
            field = %c.field,
            original = %c.original,
            applied = %c.applied,
            blocking = c.blocking,
            "{}", c.reason
        );
    }
    Normalized {
        value: normalized.value,
        corrections,
    }
}

impl Sanitizer for ClinicalSanitizer {
    fn normalize_profile(&self, raw: &Value) -> Normalized<PatientProfile> {
        with_shape(
            unwrap_envelope(raw),
            Shape::Profile,
            normalize_profile_with_report(raw, &self.policy.profile),
        )
    }

    fn validate_profile(&self, profile: &PatientProfile) -> ValidationResult {
        validate_profile_with(profile, &self.policy.profile)
    }

    fn normalize_trials(&self, raw: &Value) -> Normalized<TrialBatch> {
        with_shape(raw, Shape::TrialBatch, normalize_trial_batch(raw, &self.policy.trials))
    }

    fn validate_trials(&self, batch: &TrialBatch) -> ValidationResult {
        validate_batch(batch, &self.policy.trials)
    }

    fn normalize_match(&self, raw: &Value) -> Normalized<MatchResult> {
        with_shape(raw, Shape::MatchResult, normalize_match_result(raw))
    }
}
