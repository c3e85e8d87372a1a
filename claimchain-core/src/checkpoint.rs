//! Checkpoint types.
//!
//! A checkpoint is a signed commitment to a contiguous range of log entries:
//! the Merkle root over the covered entries' chain hashes, signed under the
//! epoch key current at generation time, and chained to the previous
//! checkpoint by hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{hash, Hash, Sig};
use crate::entry::EntryId;

/// Identifier of a checkpoint. Assigned by the store, ascending from 1.
pub type CheckpointId = u64;

/// A signed Merkle commitment over an entry range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    /// Root of the Merkle tree whose leaves are the covered entries'
    /// `prev_hash` values, in id order.
    pub merkle_root: Hash,
    /// First covered entry id (inclusive).
    pub range_lo: EntryId,
    /// Last covered entry id (inclusive).
    pub range_hi: EntryId,
    /// Hash of the previous checkpoint's canonical bytes; `None` for the
    /// first checkpoint.
    pub prev_checkpoint_hash: Option<Hash>,
    /// Epoch whose private key produced the signature.
    pub signer_epoch_id: String,
    /// ML-DSA-65 signature over `merkle_root`.
    pub signature: Sig,
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// The bytes a successor checkpoint hashes into `prev_checkpoint_hash`:
    ///
    /// ```text
    /// id_be8 || merkle_root || range_lo_be8 || range_hi_be8 || signer_epoch_id
    /// ```
    ///
    /// A fixed-layout concatenation rather than a serializer output, so any
    /// implementation can reproduce it byte-for-byte.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 32 + 8 + 8 + self.signer_epoch_id.len());
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(self.merkle_root.as_bytes());
        out.extend_from_slice(&self.range_lo.to_be_bytes());
        out.extend_from_slice(&self.range_hi.to_be_bytes());
        out.extend_from_slice(self.signer_epoch_id.as_bytes());
        out
    }

    /// The digest a successor stores as its `prev_checkpoint_hash`.
    pub fn chain_hash(&self) -> Hash {
        hash(&self.canonical_bytes())
    }

    /// Whether this checkpoint's range covers the given entry.
    pub fn contains(&self, entry_id: EntryId) -> bool {
        self.range_lo <= entry_id && entry_id <= self.range_hi
    }

    /// Number of entries covered.
    pub fn len(&self) -> u64 {
        self.range_hi - self.range_lo + 1
    }

    /// Checkpoints always cover at least one entry.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A checkpoint awaiting insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub merkle_root: Hash,
    pub range_lo: EntryId,
    pub range_hi: EntryId,
    pub prev_checkpoint_hash: Option<Hash>,
    pub signer_epoch_id: String,
    pub signature: Sig,
    pub created_at: DateTime<Utc>,
}

impl NewCheckpoint {
    /// Attach the store-assigned id, producing the persisted form.
    pub fn into_checkpoint(self, id: CheckpointId) -> Checkpoint {
        Checkpoint {
            id,
            merkle_root: self.merkle_root,
            range_lo: self.range_lo,
            range_hi: self.range_hi,
            prev_checkpoint_hash: self.prev_checkpoint_hash,
            signer_epoch_id: self.signer_epoch_id,
            signature: self.signature,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_keypair, hash};

    fn sample_checkpoint() -> Checkpoint {
        let (_, sk) = derive_keypair(&[1u8; 32]).unwrap();
        let root = hash(b"root");
        Checkpoint {
            id: 2,
            merkle_root: root,
            range_lo: 6,
            range_hi: 9,
            prev_checkpoint_hash: Some(hash(b"prev")),
            signer_epoch_id: "2025-10-28".into(),
            signature: sk.sign(root.as_bytes()).unwrap(),
            created_at: DateTime::from_timestamp_micros(1_700_000_000_000_000).unwrap(),
        }
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let cp = sample_checkpoint();
        let bytes = cp.canonical_bytes();

        assert_eq!(&bytes[..8], &2u64.to_be_bytes());
        assert_eq!(&bytes[8..40], cp.merkle_root.as_bytes());
        assert_eq!(&bytes[40..48], &6u64.to_be_bytes());
        assert_eq!(&bytes[48..56], &9u64.to_be_bytes());
        assert_eq!(&bytes[56..], b"2025-10-28");
    }

    #[test]
    fn test_chain_hash_excludes_signature() {
        // Re-signing (hedged signatures differ) must not move the chain hash.
        let cp = sample_checkpoint();
        let (_, sk) = derive_keypair(&[1u8; 32]).unwrap();
        let mut resigned = cp.clone();
        resigned.signature = sk.sign(cp.merkle_root.as_bytes()).unwrap();

        assert_eq!(cp.chain_hash(), resigned.chain_hash());
    }

    #[test]
    fn test_contains() {
        let cp = sample_checkpoint();
        assert!(!cp.contains(5));
        assert!(cp.contains(6));
        assert!(cp.contains(9));
        assert!(!cp.contains(10));
        assert_eq!(cp.len(), 4);
    }
}
