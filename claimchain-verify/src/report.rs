//! Verification verdicts.

use serde::{Deserialize, Serialize};

use claimchain_core::{CheckpointId, EntryId, Hash};

/// Chain integrity broken at a known point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperReport {
    /// First entry whose stored chain hash disagrees with the recomputed one.
    pub first_bad_id: EntryId,
    /// The hash the chain says this entry should carry.
    pub expected: Hash,
    /// The hash actually stored.
    pub found: Hash,
}

/// Outcome of verifying an entry range's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChainStatus {
    /// Every link recomputed correctly.
    Intact,
    /// A link failed; everything from `first_bad_id` forward is suspect.
    Tampered(TamperReport),
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        matches!(self, ChainStatus::Intact)
    }
}

/// Which of a checkpoint's three guarantees failed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointFaultKind {
    /// Rebuilt Merkle root differs from the stored one.
    MerkleMismatch,
    /// The epoch signature over the root does not verify.
    BadSignature,
    /// The back-link to the previous checkpoint does not recompute.
    BrokenCheckpointChain,
}

/// Checkpoint integrity broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointFault {
    pub checkpoint_id: CheckpointId,
    pub kind: CheckpointFaultKind,
}

/// Outcome of verifying one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CheckpointStatus {
    Valid { checkpoint_id: CheckpointId },
    Faulty(CheckpointFault),
}

impl CheckpointStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckpointStatus::Valid { .. })
    }

    pub fn checkpoint_id(&self) -> CheckpointId {
        match self {
            CheckpointStatus::Valid { checkpoint_id } => *checkpoint_id,
            CheckpointStatus::Faulty(fault) => fault.checkpoint_id,
        }
    }
}

/// Aggregate result of a full or ranged audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Hash-chain verdict over the audited range.
    pub chain: ChainStatus,
    /// Per-checkpoint verdicts, in checkpoint order.
    pub checkpoints: Vec<CheckpointStatus>,
    /// Number of entries whose links were recomputed.
    pub entries_checked: u64,
}

impl AuditReport {
    /// True when the chain is intact and every checkpoint verified.
    pub fn is_clean(&self) -> bool {
        self.chain.is_intact() && self.checkpoints.iter().all(CheckpointStatus::is_valid)
    }

    /// The faults found, if any.
    pub fn faults(&self) -> Vec<CheckpointFault> {
        self.checkpoints
            .iter()
            .filter_map(|s| match s {
                CheckpointStatus::Faulty(fault) => Some(*fault),
                CheckpointStatus::Valid { .. } => None,
            })
            .collect()
    }
}
