//! Integrity verification for the claimchain log.
//!
//! The verifier answers "has the log been tampered with, and at which
//! entry?" using only the stored log, the checkpoint chain, and the retained
//! epoch public keys:
//!
//! - [`Verifier::verify_chain`] - recompute every chain hash in a range
//! - [`Verifier::verify_checkpoint`] - rebuild the Merkle root, check the
//!   epoch signature, and check the checkpoint back-link
//! - [`Verifier::full_verification`] - both, over the whole log, aggregated
//!   into an [`AuditReport`]
//!
//! Detected faults are result values ([`ChainStatus`], [`CheckpointStatus`]),
//! not errors: finding tampering is the verifier succeeding. The log never
//! repairs itself; every inconsistency is reported, not patched.

mod report;
mod verifier;

pub use report::{
    AuditReport, ChainStatus, CheckpointFault, CheckpointFaultKind, CheckpointStatus, TamperReport,
};
pub use verifier::Verifier;
