//! Forward-secure epoch seed derivation.
//!
//! Each epoch's signing keypair is derived from the process-wide master seed
//! and the epoch label:
//!
//! ```text
//! epoch_seed = HKDF-SHA256(ikm = master_seed, salt = empty,
//!                          info = "pq-log/epoch/" || epoch_id, L = 32)
//! (pk, sk)   = derive_keypair(epoch_seed)
//! ```
//!
//! The derivation is memoryless: identical inputs always produce identical
//! outputs, so a restarted process re-derives the same keys from the same
//! master seed. Derived seeds are zeroized as soon as they leave scope.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::{derive_keypair, PublicKey, SecretKey};
use crate::error::Result;

/// Domain-separation prefix for epoch seed derivation.
const EPOCH_INFO_PREFIX: &[u8] = b"pq-log/epoch/";

/// Derive the 32-byte signing seed for an epoch.
pub fn derive_epoch_seed(master_seed: &[u8; 32], epoch_id: &str) -> Zeroizing<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, master_seed);

    let mut info = Vec::with_capacity(EPOCH_INFO_PREFIX.len() + epoch_id.len());
    info.extend_from_slice(EPOCH_INFO_PREFIX);
    info.extend_from_slice(epoch_id.as_bytes());

    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(&info, okm.as_mut())
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// Derive the full epoch keypair from the master seed and epoch label.
pub fn derive_epoch_keypair(
    master_seed: &[u8; 32],
    epoch_id: &str,
) -> Result<(PublicKey, SecretKey)> {
    let seed = derive_epoch_seed(master_seed, epoch_id);
    derive_keypair(&seed)
}
