//! Epoch key lifecycle.
//!
//! The manager owns the epoch-key table. Public keys are created on first
//! use and stored forever; private keys are re-derived from the master seed
//! inside each signing call and zeroized when it returns. Retirement is a
//! one-way door enforced before any derivation happens.

use std::sync::Arc;

use tracing::{debug, info};

use claimchain_core::entry::now_micros;
use claimchain_core::kdf::derive_epoch_keypair;
use claimchain_core::{EpochRecord, Error, PublicKey, Result, Sig};
use claimchain_storage::EpochStore;

use crate::clock::{EpochClock, UtcDateClock};
use crate::seed::MasterSeed;

/// Manages forward-secure signing keys on an epoch basis.
pub struct KeyManager<S> {
    store: Arc<S>,
    seed: MasterSeed,
    clock: Box<dyn EpochClock>,
}

impl<S: EpochStore> KeyManager<S> {
    /// Create a manager with the default UTC-date epoch policy.
    pub fn new(store: Arc<S>, seed: MasterSeed) -> Self {
        Self::with_clock(store, seed, UtcDateClock)
    }

    /// Create a manager with a custom epoch policy.
    pub fn with_clock(store: Arc<S>, seed: MasterSeed, clock: impl EpochClock + 'static) -> Self {
        Self {
            store,
            seed,
            clock: Box::new(clock),
        }
    }

    /// Label of the epoch the current instant belongs to.
    pub fn current_epoch_id(&self) -> String {
        self.clock.current_epoch_id()
    }

    /// Return the stored public key for an epoch, deriving and storing it on
    /// first use. Never materializes a private key for longer than the call.
    pub fn get_or_create_public_key(&self, epoch_id: &str) -> Result<PublicKey> {
        if let Some(record) = self.store.epoch(epoch_id)? {
            return Ok(record.public_key);
        }

        let (pk, sk) = derive_epoch_keypair(self.seed.as_bytes(), epoch_id)?;
        drop(sk);

        self.store
            .insert_epoch(EpochRecord::new(epoch_id, pk.clone(), now_micros()))?;
        info!(epoch = %epoch_id, "created epoch signing key");
        Ok(pk)
    }

    /// Sign a message under an epoch key.
    ///
    /// Fails with `EpochRetired` for retired epochs and `KeyMismatch` when
    /// the re-derived public key disagrees with the stored one (master seed
    /// or derivation corruption). The private key exists only on this call's
    /// stack and is zeroized before return.
    pub fn sign_with_epoch(&self, epoch_id: &str, message: &[u8]) -> Result<Sig> {
        let stored = match self.store.epoch(epoch_id)? {
            Some(record) if record.retired => {
                return Err(Error::EpochRetired {
                    epoch_id: epoch_id.to_string(),
                });
            }
            Some(record) => Some(record.public_key),
            None => None,
        };

        let (pk, sk) = derive_epoch_keypair(self.seed.as_bytes(), epoch_id)?;

        match stored {
            Some(stored_pk) => {
                if pk != stored_pk {
                    return Err(Error::KeyMismatch {
                        epoch_id: epoch_id.to_string(),
                    });
                }
            }
            None => {
                self.store
                    .insert_epoch(EpochRecord::new(epoch_id, pk, now_micros()))?;
                info!(epoch = %epoch_id, "created epoch signing key");
            }
        }

        let sig = sk.sign(message)?;
        debug!(epoch = %epoch_id, "signed under epoch key");
        Ok(sig)
    }

    /// Verify a signature under an epoch's stored public key. Works for
    /// retired epochs indefinitely; fails with `UnknownEpoch` when no key
    /// was ever stored.
    pub fn verify_with_epoch(&self, epoch_id: &str, message: &[u8], sig: &Sig) -> Result<bool> {
        let record = self.store.epoch(epoch_id)?.ok_or_else(|| Error::UnknownEpoch {
            epoch_id: epoch_id.to_string(),
        })?;
        Ok(record.public_key.verify(message, sig))
    }

    /// Retire an epoch. Idempotent; once retired, `sign_with_epoch` fails
    /// permanently. Retiring an epoch with no stored record derives and
    /// stores its public key first, so the retirement survives as more than
    /// an absence.
    pub fn retire(&self, epoch_id: &str) -> Result<()> {
        if !self.store.retire_epoch(epoch_id)? {
            let (pk, sk) = derive_epoch_keypair(self.seed.as_bytes(), epoch_id)?;
            drop(sk);
            let mut record = EpochRecord::new(epoch_id, pk, now_micros());
            record.retired = true;
            self.store.insert_epoch(record)?;
        }
        info!(epoch = %epoch_id, "retired epoch");
        Ok(())
    }

    /// List stored epoch records in creation order.
    pub fn list_epochs(&self, include_retired: bool) -> Result<Vec<EpochRecord>> {
        let mut records = self.store.epochs()?;
        if !include_retired {
            records.retain(|r| !r.retired);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use claimchain_storage::MemoryStore;

    fn manager() -> KeyManager<MemoryStore> {
        KeyManager::with_clock(
            Arc::new(MemoryStore::new()),
            MasterSeed::from_bytes([9u8; 32]),
            FixedClock::new("E1"),
        )
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let mgr = manager();
        let pk1 = mgr.get_or_create_public_key("E1").unwrap();
        let pk2 = mgr.get_or_create_public_key("E1").unwrap();
        assert_eq!(pk1, pk2);
    }

    #[test]
    fn test_restart_rederives_same_key() {
        let store = Arc::new(MemoryStore::new());
        let mgr = KeyManager::new(Arc::clone(&store), MasterSeed::from_bytes([9u8; 32]));
        let pk1 = mgr.get_or_create_public_key("E1").unwrap();

        // Same seed, fresh manager, same shared key table: a process restart.
        let mgr2 = KeyManager::new(store, MasterSeed::from_bytes([9u8; 32]));
        let pk2 = mgr2.get_or_create_public_key("E1").unwrap();
        assert_eq!(pk1, pk2);
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let mgr = manager();
        let sig = mgr.sign_with_epoch("E1", b"merkle root").unwrap();
        assert!(mgr.verify_with_epoch("E1", b"merkle root", &sig).unwrap());
        assert!(!mgr.verify_with_epoch("E1", b"other message", &sig).unwrap());
    }

    #[test]
    fn test_retirement_forbids_signing_keeps_verifying() {
        let mgr = manager();
        let sig = mgr.sign_with_epoch("E1", b"msg").unwrap();

        mgr.retire("E1").unwrap();
        mgr.retire("E1").unwrap(); // idempotent

        let err = mgr.sign_with_epoch("E1", b"msg").unwrap_err();
        assert!(matches!(err, Error::EpochRetired { .. }));

        // Prior signatures still verify under the stored public key.
        assert!(mgr.verify_with_epoch("E1", b"msg", &sig).unwrap());
    }

    #[test]
    fn test_retire_unknown_epoch_pins_its_key() {
        let mgr = manager();
        mgr.retire("E9").unwrap();

        let err = mgr.sign_with_epoch("E9", b"msg").unwrap_err();
        assert!(matches!(err, Error::EpochRetired { .. }));
        // The public key was stored anyway.
        assert!(mgr.get_or_create_public_key("E9").is_ok());
    }

    #[test]
    fn test_verify_unknown_epoch() {
        let mgr = manager();
        let sig = mgr.sign_with_epoch("E1", b"msg").unwrap();
        let err = mgr.verify_with_epoch("E2", b"msg", &sig).unwrap_err();
        assert!(matches!(err, Error::UnknownEpoch { .. }));
    }

    #[test]
    fn test_key_mismatch_detected() {
        let store = Arc::new(MemoryStore::new());
        let mgr = KeyManager::new(Arc::clone(&store), MasterSeed::from_bytes([1u8; 32]));
        mgr.get_or_create_public_key("E1").unwrap();

        // A manager with a different seed sees a stored key it cannot re-derive.
        let impostor = KeyManager::new(store, MasterSeed::from_bytes([2u8; 32]));
        let err = impostor.sign_with_epoch("E1", b"msg").unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { .. }));
    }

    #[test]
    fn test_list_epochs_filters_retired() {
        let mgr = manager();
        mgr.get_or_create_public_key("E1").unwrap();
        mgr.get_or_create_public_key("E2").unwrap();
        mgr.retire("E1").unwrap();

        let active = mgr.list_epochs(false).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].epoch_id, "E2");

        assert_eq!(mgr.list_epochs(true).unwrap().len(), 2);
    }

    #[test]
    fn test_distinct_epochs_distinct_keys() {
        let mgr = manager();
        let pk1 = mgr.get_or_create_public_key("E1").unwrap();
        let pk2 = mgr.get_or_create_public_key("E2").unwrap();
        assert_ne!(pk1, pk2);
    }
}
