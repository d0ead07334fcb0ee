//! Scenario C: implausible age
//!
//! The note for a metastatic colorectal cancer patient carries a
//! transcription error and the model faithfully extracts `age: 150`. The
//! normalizer clamps the age to 120 and records a blocking correction, so
//! the consultation's profile report carries an error even though 120
//! alone would pass the plausibility range.
//!
//! Profile validation is advisory: the consultation still runs against
//! the colorectal slice of the corpus, and the clinician sees the error
//! next to the results. The `KRAS mutated` exclusion does not fire for
//! this KRAS wild-type patient.

use std::sync::Arc;

use trialguard_contracts::{
    consultation::{ConsultationReport, SessionId},
    error::TrialGuardResult,
};
use trialguard_history::InMemoryHistoryLog;
use trialguard_policy::GuardrailPolicy;

use crate::{
    corpus::StaticTrialCorpus,
    mock_data::{assessment, colorectal_profile, NOTE_COLORECTAL_AGE_TYPO},
    model::ScriptedModel,
};

use super::{pipeline, print_history, print_report};

fn model() -> ScriptedModel {
    ScriptedModel::extracting(&colorectal_profile())
        .with_assessment(
            "NCT05345621",
            &assessment(
                86,
                "high",
                &["RAS wild-type metastatic disease", "Prior oxaliplatin and irinotecan"],
                &[],
                "Strong fit: RAS wild-type disease after FOLFOX and FOLFIRI.",
            ),
        )
        .with_assessment(
            "NCT04876543",
            &assessment(
                10,
                "high",
                &[],
                &["Tumor is microsatellite stable; study requires MSI-high"],
                "Not eligible: the study enrolls MSI-high or dMMR disease only.",
            ),
        )
        .with_default_assessment(&assessment(
            55,
            "moderate",
            &["Liver-dominant metastatic disease"],
            &[],
            "Possible fit pending hepatic function results.",
        ))
}

pub async fn run_scenario(policy: &GuardrailPolicy) -> TrialGuardResult<ConsultationReport> {
    println!("=== Scenario C: Implausible Age ===");
    println!();
    println!("  Note:     metastatic colorectal cancer, age transcribed as 150");
    println!();

    let history = Arc::new(InMemoryHistoryLog::new());
    let pipeline = pipeline(model(), StaticTrialCorpus::oncology(), &history, policy);
    let report = pipeline.run(SessionId::new(), NOTE_COLORECTAL_AGE_TYPO).await?;

    print_report(&report);
    print_history(&history, &report)?;
    println!();
    println!("  Scenario C complete.");
    println!();
    Ok(report)
}
