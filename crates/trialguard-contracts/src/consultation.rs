//! Request-scoped consultation types.
//!
//! A consultation is one run of the pipeline for one submitted note. Nothing
//! here outlives the request except the `ConsultationSummary` handed to the
//! history log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    assessment::TrialAssessment, patient::PatientProfile, validation::ValidationResult,
};

/// Identifies the clinician session a consultation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a stage ran on upstream data or on the fallback provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Upstream,
    Fallback,
}

/// Everything the clinician-facing screen needs for one consultation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationReport {
    pub session_id: SessionId,
    pub profile: PatientProfile,
    pub profile_source: DataSource,
    /// Advisory only; a failing profile report does not stop the pipeline.
    pub profile_report: ValidationResult,
    pub trial_source: DataSource,
    /// The report of the batch that was rejected or accepted upstream.
    pub trial_report: ValidationResult,
    /// Sorted by final match score, highest first.
    pub assessments: Vec<TrialAssessment>,
}

impl ConsultationReport {
    /// Number of assessments the guardrail rewrote.
    pub fn override_count(&self) -> usize {
        self.assessments.iter().filter(|a| a.overridden).count()
    }

    pub fn summary(&self, recorded_at: DateTime<Utc>) -> ConsultationSummary {
        let top_match = self.assessments.first().map(|a| TopMatch {
            identifier: a.trial.identifier.clone(),
            title: a.trial.title.clone(),
            match_score: a.result.match_score,
        });
        ConsultationSummary {
            session_id: self.session_id.clone(),
            recorded_at,
            patient: self.profile.display_summary(),
            trial_identifiers: self
                .assessments
                .iter()
                .map(|a| a.trial.identifier.clone())
                .collect(),
            top_match,
            used_fallback: self.profile_source == DataSource::Fallback
                || self.trial_source == DataSource::Fallback,
            overrides: self.override_count(),
        }
    }
}

/// The highest-scoring trial of a consultation, as shown in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMatch {
    pub identifier: String,
    pub title: String,
    pub match_score: u32,
}

/// The display summary stored in the history log.
///
/// Contains no structured patient data beyond a one-line description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationSummary {
    pub session_id: SessionId,
    pub recorded_at: DateTime<Utc>,
    pub patient: String,
    pub trial_identifiers: Vec<String>,
    pub top_match: Option<TopMatch>,
    pub used_fallback: bool,
    pub overrides: usize,
}
