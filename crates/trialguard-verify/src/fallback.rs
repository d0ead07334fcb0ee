//! Static substitutes for failed pipeline stages.
//!
//! The fallback trials use identifiers in the `NCT99` block and say so in
//! their summaries, so a clinician can tell them from live results.

use trialguard_contracts::{
    assessment::{ConfidenceLevel, MatchResult},
    patient::PatientProfile,
    trial::{MatchType, Phase, TrialRecord},
};
use trialguard_core::traits::FallbackProvider;

const REFERENCE_NOTE: &str =
    "Reference trial shown because live trial data was unavailable or failed validation.";

fn criteria(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Exactly three pre-validated trials, one per match type, always the same.
pub fn fallback_trials() -> Vec<TrialRecord> {
    vec![
        TrialRecord {
            identifier: "NCT99000001".to_string(),
            title: "Reference: Endocrine Therapy Plus CDK4/6 Inhibition in HR-Positive Advanced Breast Cancer"
                .to_string(),
            phase: Phase::Three,
            summary: format!(
                "{REFERENCE_NOTE} Evaluates first-line endocrine therapy combined with a CDK4/6 inhibitor."
            ),
            inclusion_criteria: criteria(&[
                "Adults aged 18 years or older",
                "Histologically confirmed HR-positive breast cancer",
                "ECOG performance status 0-1",
                "Adequate bone marrow and organ function",
            ]),
            exclusion_criteria: criteria(&[
                "Prior systemic therapy for advanced disease",
                "Active uncontrolled central nervous system metastases",
            ]),
            match_type: MatchType::Perfect,
            match_score: 90,
        },
        TrialRecord {
            identifier: "NCT99000002".to_string(),
            title: "Reference: Antibody-Drug Conjugate in HER2-Positive Metastatic Breast Cancer".to_string(),
            phase: Phase::Two,
            summary: format!(
                "{REFERENCE_NOTE} Studies an antibody-drug conjugate after progression on prior HER2-directed therapy."
            ),
            inclusion_criteria: criteria(&[
                "Adults aged 18 years or older",
                "Documented HER2-positive disease by central review",
                "At least one prior HER2-directed regimen",
            ]),
            exclusion_criteria: criteria(&[
                "Left ventricular ejection fraction below 50%",
                "ECOG performance status of 2 or greater",
                "History of interstitial lung disease",
            ]),
            match_type: MatchType::Excluded,
            match_score: 15,
        },
        TrialRecord {
            identifier: "NCT99000003".to_string(),
            title: "Reference: Biomarker-Guided Therapy Selection for Advanced Solid Tumors".to_string(),
            phase: Phase::Two,
            summary: format!(
                "{REFERENCE_NOTE} Assigns targeted therapy based on tumor molecular profiling results."
            ),
            inclusion_criteria: criteria(&[
                "Adults aged 18 years or older",
                "Advanced solid tumor with available molecular profiling",
                "Measurable disease per RECIST 1.1",
            ]),
            exclusion_criteria: criteria(&[
                "Pregnancy or breastfeeding",
                "Known hypersensitivity to study drug components",
            ]),
            match_type: MatchType::Uncertain,
            match_score: 50,
        },
    ]
}

/// An empty but well-typed profile.
pub fn fallback_profile() -> PatientProfile {
    PatientProfile::default()
}

/// The conservative assessment used when the model could not assess `trial`.
pub fn fallback_match_result(trial: &TrialRecord) -> MatchResult {
    MatchResult {
        match_score: 0,
        confidence_level: ConfidenceLevel::Low,
        inclusion_matches: Vec::new(),
        exclusion_flags: Vec::new(),
        uncertain_factors: vec![format!(
            "Automated assessment unavailable for {}",
            trial.identifier
        )],
        explanation: format!(
            "The automated assessment for {} could not be completed. Eligibility must be reviewed manually against the full criteria.",
            trial.identifier
        ),
        questions_to_ask: vec![
            "Does the patient meet each listed inclusion criterion?".to_string(),
            "Does any listed exclusion criterion apply to the patient?".to_string(),
        ],
    }
}

/// `FallbackProvider` over the static data in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFallback;

impl FallbackProvider for StaticFallback {
    fn trials(&self) -> Vec<TrialRecord> {
        fallback_trials()
    }

    fn profile(&self) -> PatientProfile {
        fallback_profile()
    }

    fn match_result(&self, trial: &TrialRecord) -> MatchResult {
        fallback_match_result(trial)
    }
}
