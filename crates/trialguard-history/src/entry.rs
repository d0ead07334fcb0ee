//! History entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trialguard_contracts::consultation::{ConsultationSummary, SessionId};

/// One consultation summary in a session's hash chain.
///
/// Changing any field, including inside `summary`, invalidates `this_hash`
/// and every later `prev_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the session's chain, starting at 0.
    pub sequence: u64,
    pub session_id: SessionId,
    pub summary: ConsultationSummary,
    /// `this_hash` of the previous entry, or `GENESIS_HASH`.
    pub prev_hash: String,
    pub this_hash: String,
}

impl HistoryEntry {
    /// The `prev_hash` of the first entry in every session.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A point-in-time export of one session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: SessionId,
    /// Chain order, sequence 0 first.
    pub entries: Vec<HistoryEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when the session has none.
    pub terminal_hash: String,
}
