//! # trialguard-policy
//!
//! TOML-driven thresholds for the trialguard validation and guardrail layer.
//!
//! The numbers that decide what counts as plausible, how large a trial batch
//! is, and how far the guardrail pushes a score down all live here, so a
//! deployment can tighten them without touching code.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trialguard_policy::GuardrailPolicy;
//!
//! let policy = GuardrailPolicy::from_file(Path::new("policies/oncology.toml"))?;
//! ```

pub mod config;
pub mod loader;

pub use config::{
    GuardrailLimits, GuardrailPolicy, ModelLimits, ProfileLimits, TrialLimits, MAX_EXCLUSION_SCORE_CEILING,
    TRIAL_BATCH_SIZE,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
