//! Log entry types.
//!
//! A log entry is the atomic unit of the claim event chain. Entries are
//! immutable once written; each one carries a chain hash binding it to its
//! predecessor, so any later mutation invalidates the chain from that point
//! forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::crypto::Hash;
use crate::error::{Error, Result};

/// Identifier of a log entry. Gap-free ascending sequence starting at 1,
/// assigned by the store at insertion; the sole ordering key.
pub type EntryId = u64;

/// Maximum accepted `claim_id` length in bytes.
pub const MAX_CLAIM_ID_LEN: usize = 100;

/// Maximum accepted `event_type` length in bytes.
pub const MAX_EVENT_TYPE_LEN: usize = 50;

/// A recorded claim event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Insertion-assigned identifier.
    pub id: EntryId,
    /// Business object this event belongs to.
    pub claim_id: String,
    /// Short tag: `submit`, `review`, `score`, ...
    pub event_type: String,
    /// Insertion instant, UTC, microsecond resolution.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub timestamp: DateTime<Utc>,
    /// SHA3-256 of the canonical payload serialization.
    pub payload_hash: Hash,
    /// Chain hash binding this entry to its predecessor.
    pub prev_hash: Hash,
    /// Optional post-quantum signature by an external actor over
    /// `payload_hash`. Stored opaquely; actor key distribution is a
    /// collaborator concern.
    pub actor_sig: Option<Vec<u8>>,
    /// Epoch in which the entry was accepted (informational).
    pub epoch_id: Option<String>,
}

impl LogEntry {
    /// The timestamp bytes that feed the chain hash: big-endian 8-byte
    /// count of microseconds since the UNIX epoch.
    pub fn timestamp_bytes(&self) -> [u8; 8] {
        timestamp_bytes(self.timestamp)
    }

    /// Recompute the chain hash this entry should carry given its
    /// predecessor's chain hash.
    pub fn expected_chain_hash(&self, prev: &Hash) -> Hash {
        chain_hash(prev, &self.payload_hash, self.timestamp)
    }
}

/// An entry awaiting insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub claim_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload_hash: Hash,
    pub prev_hash: Hash,
    pub actor_sig: Option<Vec<u8>>,
    pub epoch_id: Option<String>,
}

impl NewEntry {
    /// Attach the store-assigned id, producing the persisted form.
    pub fn into_entry(self, id: EntryId) -> LogEntry {
        LogEntry {
            id,
            claim_id: self.claim_id,
            event_type: self.event_type,
            timestamp: self.timestamp,
            payload_hash: self.payload_hash,
            prev_hash: self.prev_hash,
            actor_sig: self.actor_sig,
            epoch_id: self.epoch_id,
        }
    }
}

/// Compute the chain hash
/// `SHA3-256(prev || payload_hash || timestamp_micros_be8)`.
///
/// For the first entry `prev` is [`Hash::genesis`].
pub fn chain_hash(prev: &Hash, payload_hash: &Hash, timestamp: DateTime<Utc>) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update(prev.as_bytes());
    hasher.update(payload_hash.as_bytes());
    hasher.update(timestamp_bytes(timestamp));
    Hash::from_bytes(hasher.finalize().into())
}

/// Big-endian 8-byte microseconds-since-epoch encoding used in hash inputs.
pub fn timestamp_bytes(ts: DateTime<Utc>) -> [u8; 8] {
    (ts.timestamp_micros() as u64).to_be_bytes()
}

/// The current instant truncated to microsecond resolution.
///
/// Entries must never carry sub-microsecond precision: the chain hash covers
/// only microseconds, so anything finer would be silently unverifiable after
/// a storage round-trip.
pub fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros())
        .expect("current time is representable in microseconds")
}

/// Validate caller-supplied identifiers against the schema bounds.
pub fn validate_identifiers(claim_id: &str, event_type: &str) -> Result<()> {
    if claim_id.is_empty() || claim_id.len() > MAX_CLAIM_ID_LEN {
        return Err(Error::invalid_input(format!(
            "claim_id must be 1..={MAX_CLAIM_ID_LEN} bytes"
        )));
    }
    if event_type.is_empty() || event_type.len() > MAX_EVENT_TYPE_LEN {
        return Err(Error::invalid_input(format!(
            "event_type must be 1..={MAX_EVENT_TYPE_LEN} bytes"
        )));
    }
    Ok(())
}
