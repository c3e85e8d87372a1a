//! Claimchain Core - Fundamental types for the claimchain tamper-evident log.
//!
//! This crate provides the data structures and cryptographic primitives
//! used throughout the claimchain system:
//!
//! - [`crypto`] - Hashing (SHA3-256) and signatures (ML-DSA-65)
//! - [`kdf`] - Forward-secure epoch seed derivation (HKDF-SHA256)
//! - [`canonical`] - Deterministic JSON serialization for payload hashing
//! - [`entry`] - Log entries (the atomic unit of the chain)
//! - [`checkpoint`] - Signed Merkle commitments over entry ranges
//! - [`merkle`] - Merkle tree construction with inclusion proofs
//! - [`proof`] - Inclusion proof types and replay
//!
//! # Example
//!
//! ```rust
//! use claimchain_core::{canonical, crypto, entry};
//! use serde_json::json;
//!
//! // Hash a claim event payload the way the append log does
//! let payload = json!({"amount": 100, "loc": "X"});
//! let payload_hash = canonical::payload_hash(&payload);
//!
//! // Chain it to the genesis anchor
//! let ts = entry::now_micros();
//! let link = entry::chain_hash(&crypto::Hash::genesis(), &payload_hash, ts);
//! assert_ne!(link, payload_hash);
//! ```

pub mod cancel;
pub mod canonical;
pub mod checkpoint;
pub mod crypto;
pub mod entry;
pub mod epoch;
pub mod error;
pub mod kdf;
pub mod merkle;
pub mod proof;

#[cfg(test)]
mod proptest;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use checkpoint::{Checkpoint, CheckpointId, NewCheckpoint};
pub use crypto::{hash, hash_pair, Hash, PublicKey, SecretKey, Sig};
pub use entry::{chain_hash, EntryId, LogEntry, NewEntry};
pub use epoch::EpochRecord;
pub use error::{Error, Result};
pub use proof::{InclusionProof, ProofNode, Side};
