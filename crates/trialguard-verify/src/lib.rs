//! # trialguard-verify
//!
//! The validation, sanitization and guardrail layer between a generative
//! model and the clinician-facing result screen.
//!
//! Components:
//! - **Profile normalizer / validator** (`profile`): coerce an extracted
//!   patient record into canonical shape, then check medical plausibility.
//! - **Trial normalizer / validator** (`trial`): force a trial batch into
//!   exactly `batch_size` canonical records, then check completeness.
//! - **Match-result normalizer** (`assessment`).
//! - **Guardrail engine** (`guardrail`): deterministic hard-exclusion
//!   override of model-produced match results.
//! - **Fallback provider** (`fallback`): static, pre-validated substitutes.
//! - **Shape diagnostics** (`shape`): JSON Schema checks over raw payloads.
//!
//! The free functions below use the stock limits. `ClinicalSanitizer`,
//! `GuardrailEngine` and `StaticFallback` implement the `trialguard-core`
//! traits under a loaded `GuardrailPolicy`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trialguard_verify::{apply_guardrails, normalize_profile, validate_profile};
//!
//! let profile = normalize_profile(&raw);
//! let report = validate_profile(&profile);
//! let outcome = apply_guardrails(&profile, &trial, &ai_result);
//! ```

pub mod assessment;
mod coerce;
pub mod fallback;
pub mod guardrail;
pub mod markers;
pub mod profile;
pub mod sanitizer;
pub mod shape;
pub mod trial;

pub use assessment::normalize_match_result;
pub use fallback::{fallback_match_result, fallback_profile, fallback_trials, StaticFallback};
pub use guardrail::{apply_guardrails, GuardrailEngine};
pub use profile::{normalize_profile, normalize_profile_with_report, validate_profile, validate_profile_with};
pub use sanitizer::ClinicalSanitizer;
pub use trial::{normalize_trial_batch, normalize_trials, validate_batch, validate_trials, validate_trials_with};
