//! Epoch key records.
//!
//! One record per epoch label, holding only the public key. Private keys are
//! never persisted: they exist inside a signing call and are zeroized when it
//! returns. A retired epoch's public key stays available for verification
//! indefinitely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;

/// Persisted public-key record for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Opaque epoch label. The default clock uses UTC dates (`YYYY-MM-DD`),
    /// but nothing in the core depends on the format.
    pub epoch_id: String,
    /// ML-DSA-65 verification key.
    pub public_key: PublicKey,
    /// Instant of first use.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
    /// Once true, never reverts; the epoch can no longer sign.
    pub retired: bool,
}

impl EpochRecord {
    /// Create a fresh, active record.
    pub fn new(epoch_id: impl Into<String>, public_key: PublicKey, created_at: DateTime<Utc>) -> Self {
        Self {
            epoch_id: epoch_id.into(),
            public_key,
            created_at,
            retired: false,
        }
    }
}
