//! Chain and checkpoint verification.

use std::sync::Arc;

use tracing::{debug, warn};

use claimchain_core::{
    chain_hash, merkle, CancelToken, Checkpoint, Error, Hash, InclusionProof, Result,
};
use claimchain_storage::Store;

use crate::report::{
    AuditReport, ChainStatus, CheckpointFault, CheckpointFaultKind, CheckpointStatus, TamperReport,
};

/// Reconstructs chains, Merkle roots, and signatures from stored state.
pub struct Verifier<S> {
    store: Arc<S>,
}

impl<S: Store> Verifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Recompute the hash chain over `lo..=hi`.
    ///
    /// When `lo == 1` the first entry is checked against the genesis anchor;
    /// otherwise its stored chain hash is the trusted anchor and checking
    /// starts at the next entry. Returns the first discrepancy found.
    pub fn verify_chain(
        &self,
        lo: u64,
        hi: u64,
        cancel: &CancelToken,
    ) -> Result<ChainStatus> {
        if lo == 0 || lo > hi {
            return Err(Error::invalid_input(format!("invalid range {lo}..={hi}")));
        }

        let entries = self.store.entries_in(lo, hi)?;
        if entries.is_empty() {
            return Err(Error::EmptyRange);
        }

        let mut prev = if lo == 1 {
            Hash::genesis()
        } else {
            // Trusted anchor: the first entry's own stored link.
            entries[0].prev_hash
        };

        for (i, entry) in entries.iter().enumerate() {
            cancel.check()?;

            let anchored_first = lo > 1 && i == 0;
            if !anchored_first {
                let expected = chain_hash(&prev, &entry.payload_hash, entry.timestamp);
                if expected != entry.prev_hash {
                    warn!(
                        entry = entry.id,
                        expected = %expected,
                        found = %entry.prev_hash,
                        "chain hash mismatch"
                    );
                    return Ok(ChainStatus::Tampered(TamperReport {
                        first_bad_id: entry.id,
                        expected,
                        found: entry.prev_hash,
                    }));
                }
            }
            prev = entry.prev_hash;
        }

        debug!(lo, hi, count = entries.len(), "chain verified");
        Ok(ChainStatus::Intact)
    }

    /// Verify one checkpoint: Merkle root, epoch signature, back-link.
    /// Reports the first failing guarantee.
    pub fn verify_checkpoint(&self, checkpoint: &Checkpoint) -> Result<CheckpointStatus> {
        let fault = |kind| {
            warn!(checkpoint = checkpoint.id, ?kind, "checkpoint fault");
            Ok(CheckpointStatus::Faulty(CheckpointFault {
                checkpoint_id: checkpoint.id,
                kind,
            }))
        };

        // (a) Rebuild the Merkle root over the covered range. Missing
        // entries count as a mismatch: deletion is tampering too.
        let entries = self
            .store
            .entries_in(checkpoint.range_lo, checkpoint.range_hi)?;
        if entries.len() as u64 != checkpoint.len() {
            return fault(CheckpointFaultKind::MerkleMismatch);
        }
        let leaves: Vec<Hash> = entries.iter().map(|e| e.prev_hash).collect();
        if merkle::compute_root(&leaves)? != checkpoint.merkle_root {
            return fault(CheckpointFaultKind::MerkleMismatch);
        }

        // (b) Verify the epoch signature over the stored root.
        let record = self
            .store
            .epoch(&checkpoint.signer_epoch_id)?
            .ok_or_else(|| Error::UnknownEpoch {
                epoch_id: checkpoint.signer_epoch_id.clone(),
            })?;
        if !record
            .public_key
            .verify(checkpoint.merkle_root.as_bytes(), &checkpoint.signature)
        {
            return fault(CheckpointFaultKind::BadSignature);
        }

        // (c) Recompute the back-link. The first checkpoint must carry none;
        // every later one must hash its predecessor's canonical bytes.
        if checkpoint.id == 1 {
            if checkpoint.prev_checkpoint_hash.is_some() {
                return fault(CheckpointFaultKind::BrokenCheckpointChain);
            }
        } else {
            let Some(previous) = self.store.checkpoint(checkpoint.id - 1)? else {
                return fault(CheckpointFaultKind::BrokenCheckpointChain);
            };
            if checkpoint.prev_checkpoint_hash != Some(previous.chain_hash()) {
                return fault(CheckpointFaultKind::BrokenCheckpointChain);
            }
        }

        Ok(CheckpointStatus::Valid {
            checkpoint_id: checkpoint.id,
        })
    }

    /// Replay an inclusion proof against an expected root. Pure.
    pub fn verify_inclusion_proof(proof: &InclusionProof, expected_root: &Hash) -> bool {
        proof.replays_to(expected_root)
    }

    /// Verify the whole log: the full hash chain plus every checkpoint in
    /// order.
    pub fn full_verification(&self, cancel: &CancelToken) -> Result<AuditReport> {
        let last = self.store.last_entry()?;

        let (chain, entries_checked) = match last {
            Some(entry) => (self.verify_chain(1, entry.id, cancel)?, entry.id),
            None => (ChainStatus::Intact, 0),
        };

        let mut checkpoints = Vec::new();
        for checkpoint in self.store.checkpoints()? {
            cancel.check()?;
            checkpoints.push(self.verify_checkpoint(&checkpoint)?);
        }

        let report = AuditReport {
            chain,
            checkpoints,
            entries_checked,
        };
        if report.is_clean() {
            debug!(entries = entries_checked, "full verification clean");
        } else {
            warn!(faults = report.faults().len(), "full verification found faults");
        }
        Ok(report)
    }
}
