//! A scripted `ModelClient` that replays canned responses.
//!
//! Stands in for a hosted model so the scenarios are deterministic. The
//! responses are raw text, fences and all, so the pipeline's JSON recovery
//! and the sanitizer see what a real model would send.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use trialguard_contracts::{
    error::{TrialGuardError, TrialGuardResult},
    patient::PatientProfile,
    trial::TrialRecord,
};
use trialguard_core::traits::ModelClient;

use crate::mock_data::fenced;

#[derive(Debug, Clone)]
pub struct ScriptedModel {
    extraction: String,
    assessments: BTreeMap<String, String>,
    default_assessment: Option<String>,
}

impl ScriptedModel {
    /// A model that answers every extraction with `extraction` and has no
    /// assessments scripted yet.
    pub fn new(extraction: impl Into<String>) -> Self {
        Self {
            extraction: extraction.into(),
            assessments: BTreeMap::new(),
            default_assessment: None,
        }
    }

    /// Extraction answered with `profile` inside a fenced block.
    pub fn extracting(profile: &Value) -> Self {
        Self::new(fenced("Extracted patient profile:", profile))
    }

    /// Answer assessments of trial `identifier` with `assessment`.
    pub fn with_assessment(mut self, identifier: &str, assessment: &Value) -> Self {
        self.assessments.insert(
            identifier.to_string(),
            fenced(&format!("Assessment for {identifier}:"), assessment),
        );
        self
    }

    /// Answer assessments of any unscripted trial with `assessment`.
    pub fn with_default_assessment(mut self, assessment: &Value) -> Self {
        self.default_assessment = Some(fenced("Assessment:", assessment));
        self
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn extract_profile(&self, note: &str) -> TrialGuardResult<String> {
        debug!(note_chars = note.chars().count(), "scripted extraction");
        Ok(self.extraction.clone())
    }

    async fn assess_match(&self, _profile: &PatientProfile, trial: &TrialRecord) -> TrialGuardResult<String> {
        self.assessments
            .get(&trial.identifier)
            .or(self.default_assessment.as_ref())
            .cloned()
            .ok_or_else(|| TrialGuardError::ModelCall {
                reason: format!("no scripted assessment for {}", trial.identifier),
            })
    }
}
