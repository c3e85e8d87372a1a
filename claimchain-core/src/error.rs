//! Error types for claimchain.
//!
//! One enum covers the whole workspace. Integrity findings discovered by the
//! verifier (tamper reports, checkpoint faults) are not errors: they are
//! ordinary result values defined in `claimchain-verify`, because a detected
//! fault is the verifier doing its job, not the verifier failing.

use thiserror::Error;

use crate::entry::EntryId;

/// Result type for claimchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in claimchain.
#[derive(Debug, Error)]
pub enum Error {
    /// Two appenders raced on the chain tail; the caller may retry.
    #[error("concurrent append detected, chain tail moved; retry")]
    ChainRaced,

    /// A checkpoint or verification was requested over a range with no entries.
    #[error("no entries in the requested range")]
    EmptyRange,

    /// Signing was requested with a retired epoch.
    #[error("epoch {epoch_id} is retired and can no longer sign")]
    EpochRetired { epoch_id: String },

    /// Verification was requested for an epoch with no stored public key.
    #[error("no public key stored for epoch {epoch_id}")]
    UnknownEpoch { epoch_id: String },

    /// The derived public key does not match the stored one. Indicates master
    /// seed or derivation corruption.
    #[error("derived public key does not match stored key for epoch {epoch_id}")]
    KeyMismatch { epoch_id: String },

    /// Malformed payload, inverted range, oversized field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Entry lookup failed.
    #[error("log entry {0} not found")]
    EntryNotFound(EntryId),

    /// Checkpoint lookup failed.
    #[error("checkpoint {0} not found")]
    CheckpointNotFound(u64),

    /// Backend failure; the caller may retry.
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Signature library failure (keygen or signing rejected its input).
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// A caller-supplied cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Create a Storage error without a source.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Storage error wrapping a backend error.
    pub fn storage_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Crypto error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Error::Crypto(message.into())
    }

    /// Check if the operation may be retried verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ChainRaced | Error::Storage { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidInput(format!("invalid hex: {e}"))
    }
}
