//! Trait definitions for the trialguard pipeline.
//!
//! Two kinds of collaborator meet here:
//!
//! - untrusted: `ModelClient` (a generative model) and `TrialSource`
//!   (reference corpus or generator). Anything they return is raw text or
//!   raw JSON and goes through the `Sanitizer` before use.
//! - trusted: `Sanitizer`, `Guardrail`, `FallbackProvider` and
//!   `HistoryWriter`. They are deterministic and infallible, except for the
//!   history log, whose write failure is fatal for the consultation.
//!
//! The pipeline receives every collaborator through its constructor; none
//! are looked up at call time.

use async_trait::async_trait;
use serde_json::Value;

use trialguard_contracts::{
    assessment::{GuardrailOutcome, MatchResult},
    consultation::ConsultationSummary,
    error::TrialGuardResult,
    patient::PatientProfile,
    trial::{TrialBatch, TrialRecord},
    validation::{Normalized, ValidationResult},
};

/// The language-model boundary.
///
/// Implementations own prompt construction and provider selection. They
/// return the model's raw text; the pipeline locates and parses the JSON in
/// it, bounds each call with a timeout, and retries once on a parse failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Extract a patient profile from a free-text clinical note.
    async fn extract_profile(&self, note: &str) -> TrialGuardResult<String>;

    /// Assess one patient against one trial.
    async fn assess_match(
        &self,
        profile: &PatientProfile,
        trial: &TrialRecord,
    ) -> TrialGuardResult<String>;
}

/// A read-only source of candidate trials.
///
/// Results are unfiltered and untrusted; the sanitizer decides what survives.
#[async_trait]
pub trait TrialSource: Send + Sync {
    /// Return raw trial candidates for this patient, as a JSON array.
    async fn candidates(&self, profile: &PatientProfile) -> TrialGuardResult<Value>;
}

/// Normalization and validation of untrusted payloads.
///
/// Every method is total: malformed input degrades to safe defaults and
/// the problems are reported, never raised.
pub trait Sanitizer: Send + Sync {
    fn normalize_profile(&self, raw: &Value) -> Normalized<PatientProfile>;

    /// Advisory: the pipeline logs the result but keeps going.
    fn validate_profile(&self, profile: &PatientProfile) -> ValidationResult;

    fn normalize_trials(&self, raw: &Value) -> Normalized<TrialBatch>;

    /// Blocking: an invalid batch is replaced with the fallback set.
    fn validate_trials(&self, batch: &TrialBatch) -> ValidationResult;

    fn normalize_match(&self, raw: &Value) -> Normalized<MatchResult>;
}

/// The deterministic safety net over model-produced assessments.
///
/// May only move a result toward exclusion and caution: it never raises a
/// score and never lowers confidence once it has overridden.
pub trait Guardrail: Send + Sync {
    fn apply(
        &self,
        profile: &PatientProfile,
        trial: &TrialRecord,
        proposed: &MatchResult,
    ) -> GuardrailOutcome;
}

/// Static, pre-validated substitutes for failed stages.
///
/// Implementations must be deterministic and side-effect free.
pub trait FallbackProvider: Send + Sync {
    /// A full batch, one trial per match type.
    fn trials(&self) -> Vec<TrialRecord>;

    /// An empty but well-typed profile.
    fn profile(&self) -> PatientProfile;

    /// A conservative assessment used when the model cannot assess `trial`.
    fn match_result(&self, trial: &TrialRecord) -> MatchResult;
}

/// The consultation history log.
///
/// Append-only and keyed by session. Only display summaries are stored.
pub trait HistoryWriter: Send + Sync {
    /// Append one consultation summary.
    ///
    /// A failure here is returned to the caller: a consultation that cannot
    /// be recorded is not reported as complete.
    fn append(&self, summary: &ConsultationSummary) -> TrialGuardResult<()>;
}
