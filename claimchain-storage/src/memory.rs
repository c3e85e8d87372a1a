//! In-memory storage backend.
//!
//! Keeps everything behind one `RwLock`. Entries live in a `Vec` indexed by
//! `id - 1`, which the gap-free id invariant makes exact.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use claimchain_core::{
    Checkpoint, CheckpointId, EntryId, EpochRecord, Error, LogEntry, NewCheckpoint, NewEntry,
    Result,
};

use crate::traits::{CheckpointStore, EntryStore, EpochStore};

/// Process-local store for tests and ephemeral tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<LogEntry>,
    checkpoints: Vec<Checkpoint>,
    epochs: BTreeMap<String, EpochRecord>,
    epoch_order: Vec<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate a stored entry in place, bypassing the append-only discipline.
    ///
    /// Test support only: simulates an attacker with direct storage access so
    /// tamper-detection paths can be exercised. Returns `EntryNotFound` if no
    /// such entry exists.
    pub fn tamper_entry(&self, id: EntryId, mutate: impl FnOnce(&mut LogEntry)) -> Result<()> {
        let mut inner = self.inner.write();
        let idx = entry_index(id)?;
        let entry = inner
            .entries
            .get_mut(idx)
            .ok_or(Error::EntryNotFound(id))?;
        mutate(entry);
        Ok(())
    }

    /// Mutate a stored checkpoint in place. Test support only, as
    /// [`tamper_entry`](Self::tamper_entry).
    pub fn tamper_checkpoint(
        &self,
        id: CheckpointId,
        mutate: impl FnOnce(&mut Checkpoint),
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let idx = entry_index(id)?;
        let checkpoint = inner
            .checkpoints
            .get_mut(idx)
            .ok_or(Error::CheckpointNotFound(id))?;
        mutate(checkpoint);
        Ok(())
    }
}

fn entry_index(id: u64) -> Result<usize> {
    if id == 0 {
        return Err(Error::invalid_input("ids start at 1"));
    }
    Ok((id - 1) as usize)
}

impl EntryStore for MemoryStore {
    fn insert_entry(&self, expect_last_id: Option<EntryId>, entry: NewEntry) -> Result<LogEntry> {
        let mut inner = self.inner.write();

        let last_id = inner.entries.last().map(|e| e.id);
        if last_id != expect_last_id {
            debug!(?expect_last_id, ?last_id, "append raced on chain tail");
            return Err(Error::ChainRaced);
        }

        let id = last_id.unwrap_or(0) + 1;
        let entry = entry.into_entry(id);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    fn entry(&self, id: EntryId) -> Result<Option<LogEntry>> {
        let inner = self.inner.read();
        Ok(inner.entries.get(entry_index(id)?).cloned())
    }

    fn entries_in(&self, lo: EntryId, hi: EntryId) -> Result<Vec<LogEntry>> {
        if lo == 0 || lo > hi {
            return Err(Error::invalid_input(format!("invalid range {lo}..={hi}")));
        }
        let inner = self.inner.read();
        let start = (lo - 1) as usize;
        let end = (hi as usize).min(inner.entries.len());
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(inner.entries[start..end].to_vec())
    }

    fn last_entry(&self) -> Result<Option<LogEntry>> {
        Ok(self.inner.read().entries.last().cloned())
    }

    fn entries_for_claim(&self, claim_id: &str) -> Result<Vec<LogEntry>> {
        let inner = self.inner.read();
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.claim_id == claim_id)
            .cloned()
            .collect())
    }
}

impl CheckpointStore for MemoryStore {
    fn insert_checkpoint(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint> {
        let mut inner = self.inner.write();
        let id = inner.checkpoints.last().map(|c| c.id).unwrap_or(0) + 1;
        let checkpoint = checkpoint.into_checkpoint(id);
        inner.checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    fn checkpoint(&self, id: CheckpointId) -> Result<Option<Checkpoint>> {
        let inner = self.inner.read();
        Ok(inner.checkpoints.get(entry_index(id)?).cloned())
    }

    fn last_checkpoint(&self) -> Result<Option<Checkpoint>> {
        Ok(self.inner.read().checkpoints.last().cloned())
    }

    fn checkpoints(&self) -> Result<Vec<Checkpoint>> {
        Ok(self.inner.read().checkpoints.clone())
    }

    fn checkpoint_containing(&self, entry_id: EntryId) -> Result<Option<Checkpoint>> {
        let inner = self.inner.read();
        Ok(inner
            .checkpoints
            .iter()
            .find(|c| c.contains(entry_id))
            .cloned())
    }
}

impl EpochStore for MemoryStore {
    fn insert_epoch(&self, record: EpochRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.epochs.contains_key(&record.epoch_id) {
            return Err(Error::invalid_input(format!(
                "epoch {} already has a stored key",
                record.epoch_id
            )));
        }
        inner.epoch_order.push(record.epoch_id.clone());
        inner.epochs.insert(record.epoch_id.clone(), record);
        Ok(())
    }

    fn epoch(&self, epoch_id: &str) -> Result<Option<EpochRecord>> {
        Ok(self.inner.read().epochs.get(epoch_id).cloned())
    }

    fn retire_epoch(&self, epoch_id: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.epochs.get_mut(epoch_id) {
            Some(record) => {
                record.retired = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn epochs(&self) -> Result<Vec<EpochRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .epoch_order
            .iter()
            .filter_map(|id| inner.epochs.get(id).cloned())
            .collect())
    }
}
