//! The checkpoint engine.
//!
//! Commits contiguous entry ranges into signed Merkle checkpoints. The
//! engine holds no lock on appends: it freezes the tail id it observed and
//! checkpoints that range while writers keep going. Two concurrent
//! generation attempts are mutually excluded so ranges never overlap.
//! Signing happens under the generation lock but never under any append
//! lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use claimchain_core::entry::now_micros;
use claimchain_core::{
    merkle, Checkpoint, EntryId, Error, Hash, InclusionProof, NewCheckpoint, Result,
};
use claimchain_keys::KeyManager;
use claimchain_storage::Store;

/// Builds signed, chained Merkle checkpoints over the log.
pub struct CheckpointEngine<S> {
    store: Arc<S>,
    keys: Arc<KeyManager<S>>,
    generate_lock: Mutex<()>,
}

impl<S: Store> CheckpointEngine<S> {
    pub fn new(store: Arc<S>, keys: Arc<KeyManager<S>>) -> Self {
        Self {
            store,
            keys,
            generate_lock: Mutex::new(()),
        }
    }

    /// Checkpoint everything appended since the last checkpoint, up to the
    /// current tail. Fails with `EmptyRange` when there is nothing new.
    pub fn generate(&self) -> Result<Checkpoint> {
        self.generate_inner(None)
    }

    /// Checkpoint up to a forced upper bound instead of the current tail.
    pub fn generate_to(&self, range_hi: EntryId) -> Result<Checkpoint> {
        self.generate_inner(Some(range_hi))
    }

    fn generate_inner(&self, force_hi: Option<EntryId>) -> Result<Checkpoint> {
        let _guard = self.generate_lock.lock();

        let previous = self.store.last_checkpoint()?;
        let range_lo = previous.as_ref().map(|c| c.range_hi + 1).unwrap_or(1);

        let tail = self.store.last_entry()?.map(|e| e.id).unwrap_or(0);
        let range_hi = force_hi.unwrap_or(tail);
        if range_hi > tail {
            return Err(Error::invalid_input(format!(
                "forced range end {range_hi} is beyond the log tail {tail}"
            )));
        }
        if range_lo > range_hi {
            return Err(Error::EmptyRange);
        }

        let entries = self.store.entries_in(range_lo, range_hi)?;
        let leaves: Vec<Hash> = entries.iter().map(|e| e.prev_hash).collect();
        let merkle_root = merkle::compute_root(&leaves)?;

        let prev_checkpoint_hash = previous.as_ref().map(Checkpoint::chain_hash);

        let signer_epoch_id = self.keys.current_epoch_id();
        let signature = self
            .keys
            .sign_with_epoch(&signer_epoch_id, merkle_root.as_bytes())?;

        let checkpoint = self.store.insert_checkpoint(NewCheckpoint {
            merkle_root,
            range_lo,
            range_hi,
            prev_checkpoint_hash,
            signer_epoch_id,
            signature,
            created_at: now_micros(),
        })?;

        info!(
            checkpoint = checkpoint.id,
            range_lo,
            range_hi,
            epoch = %checkpoint.signer_epoch_id,
            root = %checkpoint.merkle_root,
            "generated checkpoint"
        );
        Ok(checkpoint)
    }

    /// Every Merkle level over an entry range: `levels[0]` is the leaves,
    /// the last level is `[root]`. For visualization and external proof
    /// construction; applies the same odd-node duplication rule as
    /// generation.
    pub fn list_levels(&self, range_lo: EntryId, range_hi: EntryId) -> Result<Vec<Vec<Hash>>> {
        let entries = self.store.entries_in(range_lo, range_hi)?;
        let leaves: Vec<Hash> = entries.iter().map(|e| e.prev_hash).collect();
        merkle::levels(&leaves)
    }

    /// Build the inclusion proof for an entry against the checkpoint that
    /// covers it.
    pub fn inclusion_proof(&self, entry_id: EntryId) -> Result<InclusionProof> {
        let checkpoint = self
            .store
            .checkpoint_containing(entry_id)?
            .ok_or_else(|| {
                Error::invalid_input(format!("no checkpoint covers entry {entry_id}"))
            })?;

        let entries = self
            .store
            .entries_in(checkpoint.range_lo, checkpoint.range_hi)?;
        let leaves: Vec<Hash> = entries.iter().map(|e| e.prev_hash).collect();
        let index = (entry_id - checkpoint.range_lo) as usize;
        let path = merkle::proof_path(&leaves, index)?;

        Ok(InclusionProof {
            entry_id,
            checkpoint_id: checkpoint.id,
            leaf: leaves[index],
            path,
            merkle_root: checkpoint.merkle_root,
        })
    }
}
