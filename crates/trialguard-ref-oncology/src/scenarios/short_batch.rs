//! Scenario B: short trial batch
//!
//! An EGFR-mutated NSCLC patient matches only two trials in the corpus. The
//! trial normalizer still returns exactly three records by backfilling one
//! pre-validated reference trial, and the validator rejects the batch
//! because it was backfilled. The pipeline then runs the assessment on the
//! full fallback set rather than mixing corpus and reference trials.
//!
//! The scenario also shows the pure functions directly: `validate_trials`
//! on the two un-repaired records reports the count error that the
//! normalizer's backfill would otherwise hide.

use std::sync::Arc;

use trialguard_contracts::{
    consultation::{ConsultationReport, SessionId},
    error::TrialGuardResult,
};
use trialguard_history::InMemoryHistoryLog;
use trialguard_policy::GuardrailPolicy;
use trialguard_verify::{normalize_profile, normalize_trial_batch, validate_trials_with};

use crate::{
    corpus::StaticTrialCorpus,
    mock_data::{assessment, egfr_nsclc_profile, NOTE_EGFR_NSCLC},
    model::ScriptedModel,
};

use super::{pipeline, print_history, print_report};

fn model() -> ScriptedModel {
    ScriptedModel::extracting(&egfr_nsclc_profile())
        .with_assessment(
            "NCT99000003",
            &assessment(
                55,
                "medium",
                &["Molecular profiling available (EGFR L858R)"],
                &[],
                "Possible fit: biomarker-guided study open to advanced solid tumors.",
            ),
        )
        .with_default_assessment(&assessment(
            35,
            "low",
            &[],
            &[],
            "Study population is breast cancer; the patient has lung cancer.",
        ))
}

/// Show the batch repair without the pipeline around it.
fn print_batch_repair(corpus: &StaticTrialCorpus, policy: &GuardrailPolicy) {
    let profile = normalize_profile(&egfr_nsclc_profile());
    let raw = serde_json::Value::Array(corpus.matching(&profile));
    let batch = normalize_trial_batch(&raw, &policy.trials).value;
    let unrepaired = validate_trials_with(&batch.trials[..batch.source_count], &policy.trials);

    println!(
        "  Corpus:   {} candidates -> normalized to {} ({} backfilled)",
        batch.source_count,
        batch.trials.len(),
        batch.backfilled
    );
    for error in unrepaired.errors() {
        println!("            un-repaired input: {error}");
    }
    println!();
}

pub async fn run_scenario(policy: &GuardrailPolicy) -> TrialGuardResult<ConsultationReport> {
    println!("=== Scenario B: Short Trial Batch ===");
    println!();
    println!("  Note:     EGFR L858R stage IIIB NSCLC, ECOG 0");

    let corpus = StaticTrialCorpus::oncology();
    print_batch_repair(&corpus, policy);

    let history = Arc::new(InMemoryHistoryLog::new());
    let pipeline = pipeline(model(), corpus, &history, policy);
    let report = pipeline.run(SessionId::new(), NOTE_EGFR_NSCLC).await?;

    print_report(&report);
    print_history(&history, &report)?;
    println!();
    println!("  Scenario B complete.");
    println!();
    Ok(report)
}
