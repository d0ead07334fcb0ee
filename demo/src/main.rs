//! trialguard Oncology Reference Runtime: Demo CLI
//!
//! Runs one or all of the three oncology demo scenarios, or sanitizes a
//! profile and a trial batch read from disk.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- scenario-a
//!   cargo run -p demo -- scenario-b
//!   cargo run -p demo -- scenario-c
//!   cargo run -p demo -- check --profile profile.json --trials trials.json
//!   cargo run -p demo -- --policy my-policy.toml run-all

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trialguard_core::traits::Sanitizer;
use trialguard_policy::GuardrailPolicy;
use trialguard_ref_oncology::{
    oncology_policy,
    scenarios::{her2_exclusion, implausible_age, run_all, short_batch},
};
use trialguard_verify::ClinicalSanitizer;

type DemoResult = Result<(), Box<dyn Error>>;

// ── CLI definition ────────────────────────────────────────────────────────────

/// trialguard: validation and guardrails for AI-assisted trial matching.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "trialguard oncology reference runtime demo",
    long_about = "Runs trialguard oncology scenarios showing profile and trial sanitization,\n\
                  guardrail overrides, fallback substitution and history chain integrity."
)]
struct Cli {
    /// Policy TOML to use instead of the bundled oncology policy.
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three oncology scenarios in sequence.
    RunAll,
    /// Scenario A: guardrail override of a missed HER2 exclusion.
    ScenarioA,
    /// Scenario B: short trial batch, backfill and fallback substitution.
    ScenarioB,
    /// Scenario C: implausible extracted age.
    ScenarioC,
    /// Normalize and validate a profile and a trial batch from JSON files.
    Check {
        /// Raw patient profile JSON.
        #[arg(long)]
        profile: PathBuf,
        /// Raw trial batch JSON.
        #[arg(long)]
        trials: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set RUST_LOG=debug for rule-level output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match load_policy(cli.policy.as_deref()) {
        Ok(policy) => run(cli.command, &policy).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load_policy(path: Option<&Path>) -> trialguard_contracts::error::TrialGuardResult<GuardrailPolicy> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading policy");
            GuardrailPolicy::from_file(path)
        }
        None => oncology_policy(),
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

async fn run(command: Command, policy: &GuardrailPolicy) -> DemoResult {
    match command {
        Command::Check { profile, trials } => return check(&profile, &trials, policy),
        Command::RunAll => {
            print_banner();
            run_all(policy).await?;
        }
        Command::ScenarioA => {
            print_banner();
            her2_exclusion::run_scenario(policy).await?;
        }
        Command::ScenarioB => {
            print_banner();
            short_batch::run_scenario(policy).await?;
        }
        Command::ScenarioC => {
            print_banner();
            implausible_age::run_scenario(policy).await?;
        }
    }
    println!("All selected scenarios completed successfully.");
    Ok(())
}

fn read_json(path: &Path) -> Result<Value, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("'{}' is not valid JSON: {}", path.display(), e))?;
    Ok(value)
}

/// Print the sanitized profile and batch with both validation results.
fn check(profile_path: &Path, trials_path: &Path, policy: &GuardrailPolicy) -> DemoResult {
    let sanitizer = ClinicalSanitizer::new(policy.clone());

    let profile = sanitizer.normalize_profile(&read_json(profile_path)?);
    let profile_report = sanitizer.validate_profile(&profile.value).absorb(&profile.corrections);

    let batch = sanitizer.normalize_trials(&read_json(trials_path)?);
    let trial_report = sanitizer.validate_trials(&batch.value).absorb(&batch.corrections);

    let output = json!({
        "profile": profile.value,
        "profileCorrections": profile.corrections,
        "profileValidation": profile_report,
        "trials": batch.value,
        "trialCorrections": batch.corrections,
        "trialValidation": trial_report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("trialguard: AI Trial-Matching Guardrails");
    println!("Oncology Reference Demo");
    println!("========================================");
    println!();
    println!("Per consultation:");
    println!("  [1] Model extracts a profile; normalizer repairs it, validator flags implausible values");
    println!("  [2] Trial source returns candidates; batch forced to 3 records, rejected batches use fallback");
    println!("  [3] Model assesses each trial; guardrail caps scores on hard exclusions");
    println!("  [4] Display summary appended to the session's SHA-256 history chain");
    println!();
}
