//! Error types for the trialguard pipeline.
//!
//! Only the collaborator boundaries (model calls, trial source, history log,
//! configuration) are fallible. The normalizers, validators and guardrail
//! never produce a `TrialGuardError`; they degrade to well-typed data plus
//! diagnostics instead.

use thiserror::Error;

/// The unified error type for trialguard.
#[derive(Debug, Error)]
pub enum TrialGuardError {
    /// The language-model collaborator failed (transport, provider error).
    #[error("model call failed: {reason}")]
    ModelCall { reason: String },

    /// The language-model collaborator did not answer within the configured bound.
    #[error("model call timed out after {after_ms} ms")]
    ModelTimeout { after_ms: u64 },

    /// The model answered, but no JSON document could be recovered from the text.
    #[error("unparseable model response: {reason}")]
    UnparseableResponse { reason: String },

    /// The trial source could not produce candidates.
    #[error("trial source unavailable: {reason}")]
    TrialSource { reason: String },

    /// The history log could not record a consultation.
    #[error("history write failed: {reason}")]
    HistoryWriteFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An embedded JSON Schema document could not be compiled.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

/// Convenience alias used throughout the trialguard crates.
pub type TrialGuardResult<T> = Result<T, TrialGuardError>;
