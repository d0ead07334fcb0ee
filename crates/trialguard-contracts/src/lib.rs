//! # trialguard-contracts
//!
//! Shared types and error contracts for the trialguard pipeline.
//!
//! All crates in the workspace import from here. No validation logic lives
//! in this crate, only data definitions, small accessors and error types.

pub mod assessment;
pub mod consultation;
pub mod error;
pub mod patient;
pub mod trial;
pub mod validation;
