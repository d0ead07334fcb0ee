//! # trialguard-core
//!
//! Collaborator traits and the consultation pipeline for trialguard.
//!
//! This crate provides:
//! - The trait seams (`ModelClient`, `TrialSource`, `Sanitizer`, `Guardrail`,
//!   `FallbackProvider`, `HistoryWriter`)
//! - `ConsultationPipeline`, which wires them together in a fixed order
//! - `extract_json`, which recovers a JSON document from model text
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trialguard_core::ConsultationPipeline;
//!
//! let pipeline = ConsultationPipeline::new(model, source, history, sanitizer, guardrail, fallback, &policy);
//! let report = pipeline.run(SessionId::new(), note).await?;
//! ```

pub mod pipeline;
pub mod response;
pub mod traits;

pub use pipeline::ConsultationPipeline;
pub use response::extract_json;
