//! Storage layer for claimchain.
//!
//! Persistent storage for log entries, checkpoints, and epoch public-key
//! records, behind backend-neutral traits. Two backends ship here:
//!
//! - [`MemoryStore`] - process-local, for tests and ephemeral tooling
//! - [`SqliteStore`] - embedded SQL file, the default durable backend
//!
//! The append path is the one place the adapter must provide transactional
//! semantics: [`EntryStore::insert_entry`] atomically checks the chain tail
//! and assigns the next id, so racing writers either linearize or fail with
//! `ChainRaced` - never fork the chain.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CheckpointStore, EntryStore, EpochStore, Store};
