//! In-memory implementation of `HistoryWriter`.
//!
//! Each session has its own chain. All chains live behind one `Mutex`, so a
//! single log can be shared by concurrent consultations.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, warn};

use trialguard_contracts::{
    consultation::{ConsultationSummary, SessionId},
    error::{TrialGuardError, TrialGuardResult},
};
use trialguard_core::traits::HistoryWriter;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::{HistoryEntry, SessionHistory},
};

/// One session's chain.
#[derive(Debug, Default)]
pub(crate) struct SessionChain {
    pub(crate) entries: Vec<HistoryEntry>,
}

impl SessionChain {
    fn last_hash(&self) -> &str {
        self.entries
            .last()
            .map(|e| e.this_hash.as_str())
            .unwrap_or(HistoryEntry::GENESIS_HASH)
    }
}

/// An append-only consultation history keyed by session.
#[derive(Debug, Default)]
pub struct InMemoryHistoryLog {
    pub(crate) sessions: Mutex<BTreeMap<SessionId, SessionChain>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> TrialGuardError {
    TrialGuardError::HistoryWriteFailed {
        reason: format!("history lock poisoned: {e}"),
    }
}

impl InMemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions with at least one entry, in id order.
    pub fn sessions(&self) -> TrialGuardResult<Vec<SessionId>> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.keys().cloned().collect())
    }

    /// Export every entry recorded for `session_id`.
    pub fn export_session(&self, session_id: &SessionId) -> TrialGuardResult<SessionHistory> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        let entries = sessions
            .get(session_id)
            .map(|chain| chain.entries.clone())
            .unwrap_or_default();
        let terminal_hash = entries.last().map(|e| e.this_hash.clone()).unwrap_or_default();

        Ok(SessionHistory {
            session_id: session_id.clone(),
            entries,
            exported_at: Utc::now(),
            terminal_hash,
        })
    }

    /// Check one session's chain. A session with no entries is valid.
    pub fn verify_session(&self, session_id: &SessionId) -> TrialGuardResult<bool> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        let valid = sessions
            .get(session_id)
            .map_or(true, |chain| verify_chain(&chain.entries));
        if !valid {
            warn!(session = %session_id, "history chain failed verification");
        }
        Ok(valid)
    }
}

impl HistoryWriter for InMemoryHistoryLog {
    /// Append to the chain of `summary.session_id`.
    fn append(&self, summary: &ConsultationSummary) -> TrialGuardResult<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let chain = sessions.entry(summary.session_id.clone()).or_default();

        let sequence = chain.entries.len() as u64;
        let prev_hash = chain.last_hash().to_string();
        let this_hash = hash_entry(&summary.session_id, sequence, summary, &prev_hash)?;

        debug!(session = %summary.session_id, sequence, hash = %this_hash, "history entry appended");
        chain.entries.push(HistoryEntry {
            sequence,
            session_id: summary.session_id.clone(),
            summary: summary.clone(),
            prev_hash,
            this_hash,
        });
        Ok(())
    }
}
