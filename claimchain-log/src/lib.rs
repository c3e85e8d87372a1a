//! Append-only hash-chained log and checkpoint engine.
//!
//! The writing half of claimchain:
//!
//! - [`AppendLog`] - records claim events linked by chain hashes; the
//!   single-writer discipline lives here
//! - [`CheckpointEngine`] - periodically commits a contiguous entry range
//!   into a signed, chained Merkle checkpoint
//! - [`LogService`] - the thin facade the (out-of-scope) HTTP layer calls
//!
//! ```rust
//! use std::sync::Arc;
//! use claimchain_keys::{FixedClock, KeyManager, MasterSeed};
//! use claimchain_log::{AppendLog, CheckpointEngine};
//! use claimchain_storage::MemoryStore;
//! use serde_json::json;
//!
//! let store = Arc::new(MemoryStore::new());
//! let log = AppendLog::new(Arc::clone(&store));
//! let keys = Arc::new(KeyManager::with_clock(
//!     Arc::clone(&store),
//!     MasterSeed::from_bytes([7u8; 32]),
//!     FixedClock::new("2025-10-28"),
//! ));
//! let engine = CheckpointEngine::new(Arc::clone(&store), keys);
//!
//! log.append("CLM-1", "submit", &json!({"amount": 100})).unwrap();
//! let checkpoint = engine.generate().unwrap();
//! assert_eq!((checkpoint.range_lo, checkpoint.range_hi), (1, 1));
//! ```

mod append;
mod checkpoint;
mod service;

pub use append::AppendLog;
pub use checkpoint::CheckpointEngine;
pub use service::{CheckpointSummary, EventReceipt, LogService, ScorePayload};
