//! Inclusion proof types.
//!
//! An inclusion proof lets a third party confirm that one log entry is
//! committed by a checkpoint's Merkle root without seeing the other covered
//! entries: just the sibling hash at each tree level and which side it
//! sits on.

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointId;
use crate::crypto::{hash_pair, Hash};
use crate::entry::EntryId;

/// Which side of the path a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// A single step in a Merkle path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Hash of the sibling node.
    pub sibling: Hash,
    /// Side the sibling sits on relative to the path.
    pub side: Side,
}

impl ProofNode {
    pub fn new(sibling: Hash, side: Side) -> Self {
        Self { sibling, side }
    }

    /// Combine the running path hash with this sibling.
    pub fn apply(&self, current: Hash) -> Hash {
        match self.side {
            Side::Left => hash_pair(self.sibling, current),
            Side::Right => hash_pair(current, self.sibling),
        }
    }
}

/// Proof that an entry is covered by a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// The entry being proved.
    pub entry_id: EntryId,
    /// Checkpoint whose range contains the entry.
    pub checkpoint_id: CheckpointId,
    /// The entry's leaf value (its chain hash).
    pub leaf: Hash,
    /// Sibling hashes from leaf level to just below the root.
    pub path: Vec<ProofNode>,
    /// The root the path should reproduce.
    pub merkle_root: Hash,
}

impl InclusionProof {
    /// Replay the hashing steps from the leaf and compare against a root.
    ///
    /// Pure function; no storage access.
    pub fn replays_to(&self, expected_root: &Hash) -> bool {
        let mut current = self.leaf;
        for node in &self.path {
            current = node.apply(current);
        }
        current == *expected_root
    }

    /// Replay against the root embedded in the proof itself.
    pub fn verify(&self) -> bool {
        self.replays_to(&self.merkle_root)
    }
}
