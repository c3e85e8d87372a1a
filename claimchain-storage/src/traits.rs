//! Storage traits.

use claimchain_core::{
    Checkpoint, CheckpointId, EntryId, EpochRecord, LogEntry, NewCheckpoint, NewEntry, Result,
};

/// Store for log entries.
pub trait EntryStore {
    /// Atomically assign the next id and insert an entry.
    ///
    /// `expect_last_id` is the tail the caller computed the chain hash
    /// against (`None` for an empty log). If the stored tail has moved, the
    /// insert MUST fail with `Error::ChainRaced` and write nothing.
    fn insert_entry(&self, expect_last_id: Option<EntryId>, entry: NewEntry) -> Result<LogEntry>;

    /// Get an entry by id.
    fn entry(&self, id: EntryId) -> Result<Option<LogEntry>>;

    /// Get entries with ids in `lo..=hi`, ascending.
    fn entries_in(&self, lo: EntryId, hi: EntryId) -> Result<Vec<LogEntry>>;

    /// Get the entry with the highest id.
    fn last_entry(&self) -> Result<Option<LogEntry>>;

    /// Get all entries for one claim, in id order.
    fn entries_for_claim(&self, claim_id: &str) -> Result<Vec<LogEntry>>;
}

/// Store for checkpoints.
pub trait CheckpointStore {
    /// Assign the next checkpoint id and insert.
    fn insert_checkpoint(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint>;

    /// Get a checkpoint by id.
    fn checkpoint(&self, id: CheckpointId) -> Result<Option<Checkpoint>>;

    /// Get the checkpoint with the highest id.
    fn last_checkpoint(&self) -> Result<Option<Checkpoint>>;

    /// Get all checkpoints in id order.
    fn checkpoints(&self) -> Result<Vec<Checkpoint>>;

    /// Get the checkpoint whose range contains the given entry id.
    fn checkpoint_containing(&self, entry_id: EntryId) -> Result<Option<Checkpoint>>;
}

/// Store for epoch public-key records.
pub trait EpochStore {
    /// Insert a record. Fails if the epoch label already has one.
    fn insert_epoch(&self, record: EpochRecord) -> Result<()>;

    /// Get a record by epoch label.
    fn epoch(&self, epoch_id: &str) -> Result<Option<EpochRecord>>;

    /// Set `retired = true`. Idempotent. Returns whether a record existed.
    fn retire_epoch(&self, epoch_id: &str) -> Result<bool>;

    /// Get all records in creation order.
    fn epochs(&self) -> Result<Vec<EpochRecord>>;
}

/// Combined store the log, checkpoint engine, and verifier share.
pub trait Store: EntryStore + CheckpointStore + EpochStore + Send + Sync {}

impl<T: EntryStore + CheckpointStore + EpochStore + Send + Sync> Store for T {}
