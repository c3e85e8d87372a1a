//! The append-only log.
//!
//! Appending is the one mutation in the system and it must be serializable:
//! "read the tail, compute the chain hash, insert the next entry" can never
//! interleave with another appender. A process-level mutex serializes local
//! writers; the store's tail compare-and-set backstops it, so even a second
//! process racing on the same backend fails with `ChainRaced` instead of
//! forking the chain.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use claimchain_core::entry::{now_micros, validate_identifiers};
use claimchain_core::{canonical, chain_hash, EntryId, Error, Hash, LogEntry, NewEntry, Result};
use claimchain_storage::EntryStore;

/// Records claim lifecycle events in hash-chained order.
pub struct AppendLog<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: EntryStore> AppendLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an event. Canonicalizes the payload, hashes it, links it to
    /// the current tail, and persists. Returns the stored entry.
    pub fn append(&self, claim_id: &str, event_type: &str, payload: &Value) -> Result<LogEntry> {
        self.append_signed(claim_id, event_type, payload, None, None)
    }

    /// Append an event carrying an optional external actor signature over
    /// the payload hash and an informational epoch label. The signature is
    /// stored opaquely; it is not required for chain integrity.
    pub fn append_signed(
        &self,
        claim_id: &str,
        event_type: &str,
        payload: &Value,
        actor_sig: Option<Vec<u8>>,
        epoch_id: Option<String>,
    ) -> Result<LogEntry> {
        validate_identifiers(claim_id, event_type)?;
        let payload_hash = canonical::payload_hash(payload);

        let _guard = self.write_lock.lock();

        let last = self.store.last_entry()?;
        let (expect_last_id, prev) = match &last {
            Some(entry) => (Some(entry.id), entry.prev_hash),
            None => (None, Hash::genesis()),
        };

        let timestamp = now_micros();
        let entry = self.store.insert_entry(
            expect_last_id,
            NewEntry {
                claim_id: claim_id.to_string(),
                event_type: event_type.to_string(),
                timestamp,
                payload_hash,
                prev_hash: chain_hash(&prev, &payload_hash, timestamp),
                actor_sig,
                epoch_id,
            },
        )?;

        debug!(
            entry = entry.id,
            claim = %entry.claim_id,
            event = %entry.event_type,
            "appended log entry"
        );
        Ok(entry)
    }

    /// Get an entry by id.
    pub fn get(&self, id: EntryId) -> Result<LogEntry> {
        self.store.entry(id)?.ok_or(Error::EntryNotFound(id))
    }

    /// Get entries with ids in `lo..=hi`, ascending.
    pub fn range(&self, lo: EntryId, hi: EntryId) -> Result<Vec<LogEntry>> {
        self.store.entries_in(lo, hi)
    }

    /// Get the last `n` entries in id order.
    pub fn tail(&self, n: u64) -> Result<Vec<LogEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        match self.store.last_entry()? {
            Some(last) => {
                let lo = last.id.saturating_sub(n - 1).max(1);
                self.store.entries_in(lo, last.id)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Id of the most recent entry, if any.
    pub fn last_id(&self) -> Result<Option<EntryId>> {
        Ok(self.store.last_entry()?.map(|e| e.id))
    }

    /// All entries for one claim, in id order.
    pub fn entries_for_claim(&self, claim_id: &str) -> Result<Vec<LogEntry>> {
        self.store.entries_for_claim(claim_id)
    }
}
