//! Master seed loading.
//!
//! The master seed is the root of the forward-security story. It enters the
//! process exactly once, from an out-of-band source, and lives only in
//! memory. In production a missing seed is a startup failure; development
//! tooling may generate one with a conspicuous warning.

use std::env;
use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroizing;

use claimchain_core::{Error, Result};

/// Environment variable holding the master seed as 64 hex characters.
pub const MASTER_SEED_ENV: &str = "MASTER_SEED";

/// The process-wide 32-byte root secret.
///
/// Immutable after construction; zeroized on drop.
pub struct MasterSeed(Zeroizing<[u8; 32]>);

impl MasterSeed {
    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a 64-hex-character seed.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(Error::invalid_input(format!(
                "master seed must be 64 hex characters, got {}",
                s.len()
            )));
        }
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .expect("64 hex characters decode to 32 bytes");
        Ok(Self::from_bytes(arr))
    }

    /// Load the seed from `MASTER_SEED`. Production mode: a missing or
    /// malformed value refuses startup.
    pub fn from_env() -> Result<Self> {
        match env::var(MASTER_SEED_ENV) {
            Ok(value) => Self::from_hex(&value),
            Err(_) => Err(Error::invalid_input(format!(
                "{MASTER_SEED_ENV} is not set; refusing to start without a master seed"
            ))),
        }
    }

    /// Load the seed from `MASTER_SEED`, generating a random one if absent
    /// or malformed. Development mode only.
    pub fn from_env_or_generate() -> Self {
        match Self::from_env() {
            Ok(seed) => seed,
            Err(e) => {
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                warn!(
                    reason = %e,
                    "generated a RANDOM development master seed; epoch keys will NOT \
                     survive a restart and this process must not serve production traffic"
                );
                Self::from_bytes(bytes)
            }
        }
    }

    /// Get the raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterSeed([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_roundtrip() {
        let hex_seed = "00".repeat(31) + "2a";
        let seed = MasterSeed::from_hex(&hex_seed).unwrap();
        assert_eq!(seed.as_bytes()[31], 0x2a);
    }

    #[test]
    fn test_from_hex_trims_whitespace() {
        let hex_seed = format!("  {}\n", "ab".repeat(32));
        assert!(MasterSeed::from_hex(&hex_seed).is_ok());
    }

    #[test]
    fn test_bad_lengths_rejected() {
        assert!(MasterSeed::from_hex("abcd").is_err());
        assert!(MasterSeed::from_hex(&"ab".repeat(33)).is_err());
        assert!(MasterSeed::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let seed = MasterSeed::from_bytes([7u8; 32]);
        assert_eq!(format!("{seed:?}"), "MasterSeed([redacted])");
    }
}
