//! The consultation pipeline: one note in, one clinician-facing report out.
//!
//!   note → [model] → Sanitizer (profile, advisory) → [trial source]
//!        → Sanitizer (trials, blocking) → per trial: [model] → Sanitizer
//!        → Guardrail → sort by score → HistoryWriter
//!
//! Upstream failures never escape: a failed or timed-out model call, an
//! unparseable response after the retry, an unavailable trial source or a
//! batch that fails validation each switch that stage to the fallback
//! provider. The only error `run` returns is a history-write failure.
//!
//! Per-trial assessments are issued concurrently and awaited jointly.
//! Dropping the future returned by `run` abandons any in-flight model calls.

use chrono::Utc;
use futures_util::future::{join_all, BoxFuture};
use serde_json::Value;
use tracing::{debug, info, warn};

use trialguard_contracts::{
    assessment::{AssessmentSource, TrialAssessment},
    consultation::{ConsultationReport, DataSource, SessionId},
    error::{TrialGuardError, TrialGuardResult},
    patient::PatientProfile,
    trial::{TrialBatch, TrialRecord},
    validation::{Correction, ValidationResult},
};
use trialguard_policy::{GuardrailPolicy, ModelLimits};

use crate::{
    response::extract_json,
    traits::{FallbackProvider, Guardrail, HistoryWriter, ModelClient, Sanitizer, TrialSource},
};

/// Runs consultations against a fixed set of collaborators.
///
/// One pipeline can serve many requests; it holds no per-request state.
pub struct ConsultationPipeline {
    model: Box<dyn ModelClient>,
    source: Box<dyn TrialSource>,
    history: Box<dyn HistoryWriter>,
    sanitizer: Box<dyn Sanitizer>,
    guardrail: Box<dyn Guardrail>,
    fallback: Box<dyn FallbackProvider>,
    limits: ModelLimits,
}

impl ConsultationPipeline {
    pub fn new(
        model: Box<dyn ModelClient>,
        source: Box<dyn TrialSource>,
        history: Box<dyn HistoryWriter>,
        sanitizer: Box<dyn Sanitizer>,
        guardrail: Box<dyn Guardrail>,
        fallback: Box<dyn FallbackProvider>,
        policy: &GuardrailPolicy,
    ) -> Self {
        Self {
            model,
            source,
            history,
            sanitizer,
            guardrail,
            fallback,
            limits: policy.model.clone(),
        }
    }

    /// Run one consultation for `note`.
    ///
    /// # Errors
    ///
    /// Only `TrialGuardError::HistoryWriteFailed` (or whatever the history
    /// writer returns). Every other failure is absorbed by a fallback.
    pub async fn run(&self, session_id: SessionId, note: &str) -> TrialGuardResult<ConsultationReport> {
        info!(session = %session_id, "consultation started");

        let (profile, profile_source, corrections) = self.extract_profile(note).await;
        let profile_report = self.sanitizer.validate_profile(&profile).absorb(&corrections);
        log_report("profile", &session_id, &profile_report);

        let (batch, trial_source, trial_report) = self.candidate_trials(&session_id, &profile).await;

        let mut assessments = join_all(
            batch
                .trials
                .iter()
                .map(|trial| self.assess(&session_id, &profile, trial)),
        )
        .await;
        assessments.sort_by(|a, b| b.result.match_score.cmp(&a.result.match_score));

        let report = ConsultationReport {
            session_id,
            profile,
            profile_source,
            profile_report,
            trial_source,
            trial_report,
            assessments,
        };

        self.history.append(&report.summary(Utc::now()))?;

        info!(
            session = %report.session_id,
            trials = report.assessments.len(),
            overrides = report.override_count(),
            "consultation complete"
        );
        Ok(report)
    }

    // ── Stages ────────────────────────────────────────────────────────────────

    async fn extract_profile(&self, note: &str) -> (PatientProfile, DataSource, Vec<Correction>) {
        match self
            .call_model("profile-extraction", || self.model.extract_profile(note))
            .await
        {
            Ok(raw) => {
                let normalized = self.sanitizer.normalize_profile(&raw);
                (normalized.value, DataSource::Upstream, normalized.corrections)
            }
            Err(e) => {
                warn!(error = %e, "profile extraction failed; using fallback profile");
                (self.fallback.profile(), DataSource::Fallback, Vec::new())
            }
        }
    }

    async fn candidate_trials(
        &self,
        session_id: &SessionId,
        profile: &PatientProfile,
    ) -> (TrialBatch, DataSource, ValidationResult) {
        let fetched = match tokio::time::timeout(self.limits.timeout(), self.source.candidates(profile)).await {
            Ok(result) => result,
            Err(_) => Err(TrialGuardError::TrialSource {
                reason: format!("no candidates after {} ms", self.limits.timeout_ms),
            }),
        };

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                warn!(session = %session_id, error = %e, "trial source failed; using fallback trials");
                let mut report = ValidationResult::new();
                report.error(format!("trial source failed: {e}"));
                return (self.fallback_batch(), DataSource::Fallback, report);
            }
        };

        let normalized = self.sanitizer.normalize_trials(&raw);
        let report = self
            .sanitizer
            .validate_trials(&normalized.value)
            .absorb(&normalized.corrections);
        log_report("trials", session_id, &report);

        if report.is_valid() {
            (normalized.value, DataSource::Upstream, report)
        } else {
            info!(
                session = %session_id,
                errors = report.errors().len(),
                "trial batch rejected; substituting fallback trials"
            );
            (self.fallback_batch(), DataSource::Fallback, report)
        }
    }

    async fn assess(
        &self,
        session_id: &SessionId,
        profile: &PatientProfile,
        trial: &TrialRecord,
    ) -> TrialAssessment {
        let (proposed, source) = match self
            .call_model("assessment", || self.model.assess_match(profile, trial))
            .await
        {
            Ok(raw) => {
                let normalized = self.sanitizer.normalize_match(&raw);
                for c in &normalized.corrections {
                    debug!(trial = %trial.identifier, field = %c.field, "match result repaired");
                }
                (normalized.value, AssessmentSource::Model)
            }
            Err(e) => {
                warn!(
                    session = %session_id,
                    trial = %trial.identifier,
                    error = %e,
                    "assessment failed; using fallback result"
                );
                (self.fallback.match_result(trial), AssessmentSource::Fallback)
            }
        };

        let outcome = self.guardrail.apply(profile, trial, &proposed);
        if outcome.overridden {
            info!(
                session = %session_id,
                trial = %trial.identifier,
                proposed = proposed.match_score,
                applied = outcome.result.match_score,
                flags = ?outcome.flags,
                "guardrail override"
            );
        }

        TrialAssessment {
            trial: trial.clone(),
            result: outcome.result,
            overridden: outcome.overridden,
            guardrail_flags: outcome.flags,
            source,
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn fallback_batch(&self) -> TrialBatch {
        TrialBatch::from_trials(self.fallback.trials())
    }

    /// Call the model with the configured timeout and parse its JSON,
    /// retrying only when the text held no parseable JSON.
    async fn call_model<'a, F>(&self, stage: &'static str, mut call: F) -> TrialGuardResult<Value>
    where
        F: FnMut() -> BoxFuture<'a, TrialGuardResult<String>>,
    {
        let attempts = 1 + self.limits.parse_retries;
        let mut last_error = TrialGuardError::UnparseableResponse {
            reason: "no attempt made".to_string(),
        };

        for attempt in 1..=attempts {
            let text = match tokio::time::timeout(self.limits.timeout(), call()).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(TrialGuardError::ModelTimeout {
                        after_ms: self.limits.timeout_ms,
                    })
                }
            };

            match extract_json(&text) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(stage, attempt, error = %e, "model response held no usable JSON");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

fn log_report(stage: &'static str, session_id: &SessionId, report: &ValidationResult) {
    for error in report.errors() {
        warn!(stage, session = %session_id, %error, "validation error");
    }
    for warning in report.warnings() {
        warn!(stage, session = %session_id, %warning, "validation warning");
    }
    debug!(stage, session = %session_id, valid = report.is_valid(), "validation complete");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use trialguard_contracts::{
        assessment::{ConfidenceLevel, GuardrailOutcome, MatchResult},
        consultation::ConsultationSummary,
        trial::{MatchType, Phase},
        validation::Normalized,
    };

    use super::*;

    // ── Mocks ─────────────────────────────────────────────────────────────────

    /// A model that replays scripted extraction responses and answers every
    /// assessment with a score looked up by trial identifier.
    struct ScriptedModel {
        extraction: Mutex<Vec<TrialGuardResult<String>>>,
        extraction_calls: Arc<Mutex<u32>>,
        scores: Vec<(&'static str, u32)>,
        failing_trial: Option<&'static str>,
        extraction_delay: Option<Duration>,
    }

    impl ScriptedModel {
        fn new(extraction: Vec<TrialGuardResult<String>>) -> Self {
            Self {
                extraction: Mutex::new(extraction),
                extraction_calls: Arc::new(Mutex::new(0)),
                scores: vec![("NCT00000001", 40), ("NCT00000002", 90), ("NCT00000003", 65)],
                failing_trial: None,
                extraction_delay: None,
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn extract_profile(&self, _note: &str) -> TrialGuardResult<String> {
            *self.extraction_calls.lock().unwrap() += 1;
            if let Some(delay) = self.extraction_delay {
                tokio::time::sleep(delay).await;
            }
            let mut script = self.extraction.lock().unwrap();
            if script.is_empty() {
                Ok(r#"{"age": 50}"#.to_string())
            } else {
                script.remove(0)
            }
        }

        async fn assess_match(
            &self,
            _profile: &PatientProfile,
            trial: &TrialRecord,
        ) -> TrialGuardResult<String> {
            if self.failing_trial == Some(trial.identifier.as_str()) {
                return Err(TrialGuardError::ModelCall {
                    reason: "provider returned 503".to_string(),
                });
            }
            let score = self
                .scores
                .iter()
                .find(|(id, _)| *id == trial.identifier)
                .map(|(_, s)| *s)
                .unwrap_or(50);
            Ok(json!({ "matchScore": score, "confidenceLevel": "medium" }).to_string())
        }
    }

    struct StaticSource(TrialGuardResult<Value>);

    #[async_trait]
    impl TrialSource for StaticSource {
        async fn candidates(&self, _profile: &PatientProfile) -> TrialGuardResult<Value> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(TrialGuardError::TrialSource { reason: e.to_string() }),
            }
        }
    }

    /// Never answers within any sensible timeout.
    struct StalledSource;

    #[async_trait]
    impl TrialSource for StalledSource {
        async fn candidates(&self, _profile: &PatientProfile) -> TrialGuardResult<Value> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(good_trials())
        }
    }

    /// Deserializes with serde and rejects batches whose first title is empty.
    struct SerdeSanitizer;

    impl Sanitizer for SerdeSanitizer {
        fn normalize_profile(&self, raw: &Value) -> Normalized<PatientProfile> {
            let age = raw["age"].as_u64().unwrap_or(0) as u32;
            Normalized::clean(PatientProfile { age, ..Default::default() })
        }

        fn validate_profile(&self, profile: &PatientProfile) -> ValidationResult {
            let mut report = ValidationResult::new();
            if profile.age == 0 {
                report.error("age is 0");
            }
            report
        }

        fn normalize_trials(&self, raw: &Value) -> Normalized<TrialBatch> {
            let trials = raw
                .as_array()
                .map(|a| a.iter().map(|t| trial(t["id"].as_str().unwrap_or(""), t["title"].as_str().unwrap_or(""))).collect())
                .unwrap_or_default();
            Normalized::clean(TrialBatch::from_trials(trials))
        }

        fn validate_trials(&self, batch: &TrialBatch) -> ValidationResult {
            let mut report = ValidationResult::new();
            if batch.trials.iter().any(|t| t.title.is_empty()) {
                report.error("trial title empty");
            }
            report
        }

        fn normalize_match(&self, raw: &Value) -> Normalized<MatchResult> {
            Normalized::clean(MatchResult {
                match_score: raw["matchScore"].as_u64().unwrap_or(0) as u32,
                confidence_level: ConfidenceLevel::Medium,
                ..Default::default()
            })
        }
    }

    /// Caps any trial whose identifier ends in "2" to a score of 20.
    struct CapSecondTrial;

    impl Guardrail for CapSecondTrial {
        fn apply(&self, _profile: &PatientProfile, trial: &TrialRecord, proposed: &MatchResult) -> GuardrailOutcome {
            if trial.identifier.ends_with('2') {
                GuardrailOutcome {
                    result: MatchResult {
                        match_score: proposed.match_score.min(20),
                        confidence_level: ConfidenceLevel::High,
                        ..proposed.clone()
                    },
                    overridden: true,
                    flags: vec!["test exclusion".to_string()],
                }
            } else {
                GuardrailOutcome::pass_through(proposed.clone())
            }
        }
    }

    struct FixedFallback;

    impl FallbackProvider for FixedFallback {
        fn trials(&self) -> Vec<TrialRecord> {
            vec![trial("NCT99000001", "Fallback A"), trial("NCT99000002", "Fallback B"), trial("NCT99000003", "Fallback C")]
        }

        fn profile(&self) -> PatientProfile {
            PatientProfile::default()
        }

        fn match_result(&self, _trial: &TrialRecord) -> MatchResult {
            MatchResult {
                match_score: 0,
                explanation: "manual review required".to_string(),
                ..Default::default()
            }
        }
    }

    /// Records every appended summary; can be told to fail.
    struct RecordingHistory {
        entries: Arc<Mutex<Vec<ConsultationSummary>>>,
        fail: bool,
    }

    impl HistoryWriter for RecordingHistory {
        fn append(&self, summary: &ConsultationSummary) -> TrialGuardResult<()> {
            if self.fail {
                return Err(TrialGuardError::HistoryWriteFailed {
                    reason: "disk full".to_string(),
                });
            }
            self.entries.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    fn trial(id: &str, title: &str) -> TrialRecord {
        TrialRecord {
            identifier: id.to_string(),
            title: title.to_string(),
            phase: Phase::Two,
            summary: "summary".to_string(),
            inclusion_criteria: vec![],
            exclusion_criteria: vec![],
            match_type: MatchType::Uncertain,
            match_score: 50,
        }
    }

    fn good_trials() -> Value {
        json!([
            { "id": "NCT00000001", "title": "Trial one" },
            { "id": "NCT00000002", "title": "Trial two" },
            { "id": "NCT00000003", "title": "Trial three" }
        ])
    }

    fn pipeline(
        model: ScriptedModel,
        trials: TrialGuardResult<Value>,
        history: RecordingHistory,
        policy: &GuardrailPolicy,
    ) -> ConsultationPipeline {
        ConsultationPipeline::new(
            Box::new(model),
            Box::new(StaticSource(trials)),
            Box::new(history),
            Box::new(SerdeSanitizer),
            Box::new(CapSecondTrial),
            Box::new(FixedFallback),
            policy,
        )
    }

    fn history() -> (RecordingHistory, Arc<Mutex<Vec<ConsultationSummary>>>) {
        let entries = Arc::new(Mutex::new(vec![]));
        (
            RecordingHistory { entries: Arc::clone(&entries), fail: false },
            entries,
        )
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    /// A clean run uses upstream data, applies the guardrail and sorts by score.
    #[tokio::test]
    async fn test_clean_run_sorted_and_recorded() {
        let model = ScriptedModel::new(vec![Ok(r#"{"age": 52}"#.to_string())]);
        let (history, entries) = history();
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "52F with breast cancer").await.unwrap();

        assert_eq!(report.profile_source, DataSource::Upstream);
        assert_eq!(report.profile.age, 52);
        assert_eq!(report.trial_source, DataSource::Upstream);

        // NCT..02 proposed 90 but the guardrail capped it at 20.
        let scores: Vec<u32> = report.assessments.iter().map(|a| a.result.match_score).collect();
        assert_eq!(scores, vec![65, 40, 20]);
        assert_eq!(report.override_count(), 1);
        assert_eq!(report.assessments[2].trial.identifier, "NCT00000002");

        let recorded = entries.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].top_match.as_ref().unwrap().identifier, "NCT00000003");
        assert!(!recorded[0].used_fallback);
    }

    // ── Profile extraction fallbacks ──────────────────────────────────────────

    /// One unparseable response is retried; the second answer is used.
    #[tokio::test]
    async fn test_parse_failure_retried_once() {
        let model = ScriptedModel::new(vec![
            Ok("Sorry, here you go: patient is 61".to_string()),
            Ok(r#"```json
{"age": 61}
```"#
                .to_string()),
        ]);
        let calls = Arc::clone(&model.extraction_calls);
        let (history, _) = history();
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(report.profile_source, DataSource::Upstream);
        assert_eq!(report.profile.age, 61);
    }

    /// Two unparseable responses exhaust the retry and select the fallback profile.
    #[tokio::test]
    async fn test_parse_failure_twice_uses_fallback_profile() {
        let model = ScriptedModel::new(vec![Ok("no json".to_string()), Ok("still none".to_string())]);
        let calls = Arc::clone(&model.extraction_calls);
        let (history, entries) = history();
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(report.profile_source, DataSource::Fallback);
        assert_eq!(report.profile, PatientProfile::default());
        assert!(!report.profile_report.is_valid(), "fallback profile is flagged by the validator");
        assert!(entries.lock().unwrap()[0].used_fallback);
    }

    /// A transport error is not retried.
    #[tokio::test]
    async fn test_model_error_not_retried() {
        let model = ScriptedModel::new(vec![Err(TrialGuardError::ModelCall {
            reason: "connection reset".to_string(),
        })]);
        let calls = Arc::clone(&model.extraction_calls);
        let (history, _) = history();
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(report.profile_source, DataSource::Fallback);
    }

    /// A slow model is abandoned at the configured timeout.
    #[tokio::test]
    async fn test_timeout_uses_fallback_profile() {
        let mut model = ScriptedModel::new(vec![]);
        model.extraction_delay = Some(Duration::from_secs(30));
        let (history, _) = history();
        let mut policy = GuardrailPolicy::default();
        policy.model.timeout_ms = 20;
        let p = pipeline(model, Ok(good_trials()), history, &policy);

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(report.profile_source, DataSource::Fallback);
    }

    // ── Trial batch fallbacks ─────────────────────────────────────────────────

    /// A batch that fails validation is replaced wholesale by the fallback set.
    #[tokio::test]
    async fn test_invalid_batch_replaced_by_fallback() {
        let model = ScriptedModel::new(vec![]);
        let (history, _) = history();
        let bad = json!([
            { "id": "NCT00000001", "title": "" },
            { "id": "NCT00000002", "title": "Trial two" },
            { "id": "NCT00000003", "title": "Trial three" }
        ]);
        let p = pipeline(model, Ok(bad), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(report.trial_source, DataSource::Fallback);
        assert!(!report.trial_report.is_valid());
        let mut ids: Vec<&str> = report.assessments.iter().map(|a| a.trial.identifier.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["NCT99000001", "NCT99000002", "NCT99000003"]);
    }

    /// An unavailable source is reported in the trial report and falls back.
    #[tokio::test]
    async fn test_source_failure_uses_fallback_trials() {
        let model = ScriptedModel::new(vec![]);
        let (history, _) = history();
        let p = pipeline(
            model,
            Err(TrialGuardError::TrialSource { reason: "corpus offline".to_string() }),
            history,
            &GuardrailPolicy::default(),
        );

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(report.trial_source, DataSource::Fallback);
        assert!(report.trial_report.errors()[0].contains("corpus offline"));
        assert_eq!(report.assessments.len(), 3);
    }

    /// A stalled source is reported as a trial source failure, not a model one.
    #[tokio::test]
    async fn test_source_timeout_is_a_trial_source_failure() {
        let (history, entries) = history();
        let mut policy = GuardrailPolicy::default();
        policy.model.timeout_ms = 20;
        let p = ConsultationPipeline::new(
            Box::new(ScriptedModel::new(vec![Ok(r#"{"age": 52}"#.to_string())])),
            Box::new(StalledSource),
            Box::new(history),
            Box::new(SerdeSanitizer),
            Box::new(CapSecondTrial),
            Box::new(FixedFallback),
            &policy,
        );

        let report = p.run(SessionId::new(), "note").await.unwrap();

        assert_eq!(report.trial_source, DataSource::Fallback);
        let error = &report.trial_report.errors()[0];
        assert!(error.contains("trial source unavailable: no candidates after 20 ms"), "{error}");
        assert!(!error.contains("model"), "{error}");
        assert!(entries.lock().unwrap()[0].used_fallback);
    }

    // ── Assessment fallbacks ──────────────────────────────────────────────────

    /// A failed per-trial call yields the fallback result for that trial only.
    #[tokio::test]
    async fn test_assessment_failure_isolated_to_one_trial() {
        let mut model = ScriptedModel::new(vec![]);
        model.failing_trial = Some("NCT00000003");
        let (history, _) = history();
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        let report = p.run(SessionId::new(), "note").await.unwrap();

        let failed = report
            .assessments
            .iter()
            .find(|a| a.trial.identifier == "NCT00000003")
            .unwrap();
        assert_eq!(failed.source, AssessmentSource::Fallback);
        assert_eq!(failed.result.match_score, 0);
        assert_eq!(
            report
                .assessments
                .iter()
                .filter(|a| a.source == AssessmentSource::Model)
                .count(),
            2
        );
    }

    // ── History ───────────────────────────────────────────────────────────────

    /// A history write failure is the one error `run` surfaces.
    #[tokio::test]
    async fn test_history_failure_is_returned() {
        let model = ScriptedModel::new(vec![]);
        let history = RecordingHistory {
            entries: Arc::new(Mutex::new(vec![])),
            fail: true,
        };
        let p = pipeline(model, Ok(good_trials()), history, &GuardrailPolicy::default());

        match p.run(SessionId::new(), "note").await {
            Err(TrialGuardError::HistoryWriteFailed { reason }) => assert_eq!(reason, "disk full"),
            other => panic!("expected HistoryWriteFailed, got {:?}", other.map(|r| r.assessments.len())),
        }
    }
}
