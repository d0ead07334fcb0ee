//! Oncology reference runtime demo scenarios.
//!
//! Each scenario wires real trialguard components (sanitizer, guardrail,
//! fallback provider, history log) to the static corpus and a scripted
//! model, runs one consultation, prints the result screen and verifies the
//! session's history chain.

pub mod her2_exclusion;
pub mod implausible_age;
pub mod short_batch;

use std::sync::Arc;

use trialguard_contracts::{
    assessment::AssessmentSource,
    consultation::{ConsultationReport, ConsultationSummary, DataSource},
    error::TrialGuardResult,
};
use trialguard_core::{pipeline::ConsultationPipeline, traits::HistoryWriter};
use trialguard_history::InMemoryHistoryLog;
use trialguard_policy::GuardrailPolicy;
use trialguard_verify::{ClinicalSanitizer, GuardrailEngine, StaticFallback};

use crate::{corpus::StaticTrialCorpus, model::ScriptedModel};

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Lets the scenario keep a handle on the log the pipeline owns.
struct ArcHistory(Arc<InMemoryHistoryLog>);

impl HistoryWriter for ArcHistory {
    fn append(&self, summary: &ConsultationSummary) -> TrialGuardResult<()> {
        self.0.append(summary)
    }
}

pub(crate) fn pipeline(
    model: ScriptedModel,
    corpus: StaticTrialCorpus,
    history: &Arc<InMemoryHistoryLog>,
    policy: &GuardrailPolicy,
) -> ConsultationPipeline {
    ConsultationPipeline::new(
        Box::new(model),
        Box::new(corpus),
        Box::new(ArcHistory(Arc::clone(history))),
        Box::new(ClinicalSanitizer::new(policy.clone())),
        Box::new(GuardrailEngine::new(&policy.guardrail)),
        Box::new(StaticFallback),
        policy,
    )
}

// ── Output ────────────────────────────────────────────────────────────────────

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Upstream => "upstream",
        DataSource::Fallback => "FALLBACK",
    }
}

pub(crate) fn print_report(report: &ConsultationReport) {
    let profile = &report.profile_report;
    println!("  Patient:  {}", report.profile.display_summary());
    println!(
        "  Profile:  {} ({}, {} errors, {} warnings)",
        if profile.is_valid() { "VALID" } else { "INVALID" },
        source_label(report.profile_source),
        profile.errors().len(),
        profile.warnings().len()
    );
    for error in profile.errors() {
        println!("            error: {error}");
    }
    println!(
        "  Trials:   {} ({} errors, {} warnings)",
        source_label(report.trial_source),
        report.trial_report.errors().len(),
        report.trial_report.warnings().len()
    );
    for error in report.trial_report.errors() {
        println!("            error: {error}");
    }
    println!();

    for a in &report.assessments {
        println!(
            "  {}  score {:>3}  {:<6}  {}{}",
            a.trial.identifier,
            a.result.match_score,
            a.result.confidence_level.as_str(),
            match a.source {
                AssessmentSource::Model => "model",
                AssessmentSource::Fallback => "fallback",
            },
            if a.overridden { "  OVERRIDDEN" } else { "" }
        );
        for flag in &a.guardrail_flags {
            println!("      {flag}");
        }
    }
    println!();
}

pub(crate) fn print_history(history: &InMemoryHistoryLog, report: &ConsultationReport) -> TrialGuardResult<()> {
    let export = history.export_session(&report.session_id)?;
    let intact = history.verify_session(&report.session_id)?;
    println!(
        "  History chain: {} ({} entries, terminal {})",
        if intact { "VALID" } else { "BROKEN" },
        export.entries.len(),
        export.terminal_hash.get(..16).unwrap_or(export.terminal_hash.as_str())
    );
    Ok(())
}

/// Run all three scenarios in order.
pub async fn run_all(policy: &GuardrailPolicy) -> TrialGuardResult<Vec<ConsultationReport>> {
    Ok(vec![
        her2_exclusion::run_scenario(policy).await?,
        short_batch::run_scenario(policy).await?,
        implausible_age::run_scenario(policy).await?,
    ])
}
