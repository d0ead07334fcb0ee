//! Hash-chain primitives for the consultation history.
//!
//! Hash input layout (bytes, in order):
//!   1. session id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the summary

use sha2::{Digest, Sha256};

use trialguard_contracts::{
    consultation::{ConsultationSummary, SessionId},
    error::{TrialGuardError, TrialGuardResult},
};

use crate::entry::HistoryEntry;

/// Compute the SHA-256 hash of one history entry as lowercase hex.
pub fn hash_entry(
    session_id: &SessionId,
    sequence: u64,
    summary: &ConsultationSummary,
    prev_hash: &str,
) -> TrialGuardResult<String> {
    let summary_json = serde_json::to_vec(summary).map_err(|e| TrialGuardError::HistoryWriteFailed {
        reason: format!("summary is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(session_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&summary_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify one session's chain.
///
/// Valid when every entry links to its predecessor (the first to
/// `GENESIS_HASH`), carries the expected sequence number, and its stored
/// hash matches the recomputed one. An empty chain is valid.
pub fn verify_chain(entries: &[HistoryEntry]) -> bool {
    let mut expected_prev = HistoryEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.prev_hash != expected_prev || entry.sequence != position as u64 {
            return false;
        }
        match hash_entry(&entry.session_id, entry.sequence, &entry.summary, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
