//! Cryptographic primitives for claimchain.
//!
//! - SHA3-256 for content hashing and chain linkage
//! - ML-DSA-65 (FIPS 204, NIST level 3) for signatures
//! - Deterministic keypair derivation from a 32-byte seed
//!
//! Keypair derivation is the load-bearing piece of the forward-security
//! story: equal seeds must yield equal keys across invocations and hosts, so
//! key generation runs against a ChaCha20 RNG seeded from the caller's seed
//! rather than the operating system RNG.

use std::fmt;

use fips204::ml_dsa_65;
use fips204::traits::{KeyGen, SerDes, Signer, Verifier};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// ML-DSA-65 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = ml_dsa_65::PK_LEN;

/// ML-DSA-65 signature length in bytes.
pub const SIGNATURE_LEN: usize = ml_dsa_65::SIG_LEN;

/// A 32-byte hash value.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The zero hash (used as a sentinel).
    pub const ZERO: Self = Self([0u8; 32]);

    /// The genesis anchor: the chain hash "before" the first log entry.
    pub fn genesis() -> Self {
        hash(b"GENESIS")
    }

    /// Create a hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::invalid_input(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash arbitrary data using SHA3-256.
pub fn hash(data: &[u8]) -> Hash {
    let digest = Sha3_256::digest(data);
    Hash(digest.into())
}

/// Hash two child hashes to produce a parent hash.
/// Used in merkle tree construction.
pub fn hash_pair(left: Hash, right: Hash) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash(hasher.finalize().into())
}

/// A public key for verifying ML-DSA-65 signatures.
///
/// Stored as encoded bytes; the key is decoded on every verification so the
/// type stays cheap to persist and serialize.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(Error::invalid_input(format!(
                "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Verify a signature over a message.
    ///
    /// Returns `false` for any malformed key or signature rather than
    /// erroring: a corrupted stored key is indistinguishable from a forgery
    /// to a verifier.
    pub fn verify(&self, message: &[u8], signature: &Sig) -> bool {
        let Ok(pk_arr) = <[u8; PUBLIC_KEY_LEN]>::try_from(self.0.as_slice()) else {
            return false;
        };
        let Ok(pk) = ml_dsa_65::PublicKey::try_from_bytes(pk_arr) else {
            return false;
        };
        let Ok(sig_arr) = <[u8; SIGNATURE_LEN]>::try_from(signature.as_bytes()) else {
            return false;
        };
        pk.verify(message, &sig_arr, &[])
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..8.min(self.0.len())]))
    }
}

/// A secret key for signing.
///
/// Holds the decoded ML-DSA private key; fips204 zeroizes the key material
/// when the value drops, which is what the epoch manager relies on to keep
/// private keys transient.
pub struct SecretKey(ml_dsa_65::PrivateKey);

impl SecretKey {
    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Result<Sig> {
        let sig = self
            .0
            .try_sign(message, &[])
            .map_err(|e| Error::crypto(format!("ml-dsa signing failed: {e}")))?;
        Ok(Sig(sig.to_vec()))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([redacted])")
    }
}

/// A digital signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig(Vec<u8>);

impl Sig {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(Error::invalid_input(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({})", hex::encode(&self.0[..8.min(self.0.len())]))
    }
}

/// Deterministically derive an ML-DSA-65 keypair from a 32-byte seed.
///
/// Equal seeds yield equal keys across invocations and hosts: the seed feeds
/// a ChaCha20 deterministic RNG, which stands in for the system RNG during
/// key generation.
pub fn derive_keypair(seed: &[u8; 32]) -> Result<(PublicKey, SecretKey)> {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    let (pk, sk) = ml_dsa_65::KG::try_keygen_with_rng(&mut rng)
        .map_err(|e| Error::crypto(format!("ml-dsa keygen failed: {e}")))?;
    Ok((PublicKey(pk.into_bytes().to_vec()), SecretKey(sk)))
}
