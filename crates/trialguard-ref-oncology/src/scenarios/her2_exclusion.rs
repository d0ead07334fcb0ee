//! Scenario A: HER2 hard exclusion missed by the model
//!
//! A HER2-positive metastatic breast cancer patient is matched against the
//! breast slice of the corpus. One trial requires HER2-negative disease in
//! its exclusion criteria; the scripted model overlooks this and scores the
//! trial 78 with medium confidence and no exclusion flags.
//!
//! The guardrail detects the contradiction between the recorded
//! `HER2: 3+` and the criterion, caps the score at the policy ceiling,
//! raises confidence to high, adds a HER2 exclusion flag and rewrites the
//! explanation. The other two trials pass through untouched.

use std::sync::Arc;

use trialguard_contracts::{
    consultation::{ConsultationReport, SessionId},
    error::TrialGuardResult,
};
use trialguard_history::InMemoryHistoryLog;
use trialguard_policy::GuardrailPolicy;

use crate::{
    corpus::StaticTrialCorpus,
    mock_data::{assessment, her2_positive_profile, NOTE_HER2_POSITIVE},
    model::ScriptedModel,
};

use super::{pipeline, print_history, print_report};

/// The trial whose exclusion criteria require HER2-negative disease.
pub const HER2_NEGATIVE_TRIAL: &str = "NCT04987612";

fn model() -> ScriptedModel {
    ScriptedModel::extracting(&her2_positive_profile())
        .with_assessment(
            "NCT05123401",
            &assessment(
                88,
                "high",
                &["HER2-positive metastatic disease", "Progressed on prior anti-HER2 regimen"],
                &[],
                "Strong fit: HER2-positive metastatic disease with progression after trastuzumab and pertuzumab.",
            ),
        )
        .with_assessment(
            HER2_NEGATIVE_TRIAL,
            &assessment(
                78,
                "medium",
                &["Metastatic breast cancer", "Two or more prior systemic therapies"],
                &[],
                "Likely eligible: pretreated metastatic breast cancer with adequate performance status.",
            ),
        )
        .with_assessment(
            "NCT05234518",
            &assessment(
                40,
                "medium",
                &["Breast cancer"],
                &["Hormone receptor status: patient is ER-negative and PR-negative"],
                "Unlikely fit: the study enrolls hormone receptor-positive disease.",
            ),
        )
}

pub async fn run_scenario(policy: &GuardrailPolicy) -> TrialGuardResult<ConsultationReport> {
    println!("=== Scenario A: HER2 Hard Exclusion ===");
    println!();
    println!("  Note:     HER2 3+ metastatic breast cancer, ECOG 1");
    println!("  Model:    scores {HER2_NEGATIVE_TRIAL} (requires HER2-negative) at 78, no flags");
    println!();

    let history = Arc::new(InMemoryHistoryLog::new());
    let pipeline = pipeline(model(), StaticTrialCorpus::oncology(), &history, policy);
    let report = pipeline.run(SessionId::new(), NOTE_HER2_POSITIVE).await?;

    print_report(&report);
    print_history(&history, &report)?;
    println!();
    println!("  Scenario A complete.");
    println!();
    Ok(report)
}
