//! # trialguard-history
//!
//! Append-only consultation history, SHA-256 hash-chained per session.
//!
//! Only the display summary of a consultation is stored, never the
//! structured patient profile. Each session's entries form their own chain;
//! editing any stored entry breaks it and `verify_session` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trialguard_history::InMemoryHistoryLog;
//! use trialguard_core::traits::HistoryWriter;
//!
//! let log = InMemoryHistoryLog::new();
//! log.append(&report.summary(Utc::now()))?;
//! assert!(log.verify_session(&report.session_id)?);
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::{HistoryEntry, SessionHistory};
pub use memory::InMemoryHistoryLog;

// ── Tests ─────────────────────────────────────────────────────────────────────
