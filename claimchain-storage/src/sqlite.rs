//! SQLite storage backend.
//!
//! The durable default. The persisted layout mirrors the logical schema:
//! `log_entries`, `checkpoints`, `epoch_keys`. The append path runs inside a
//! transaction so the tail check and the insert are one atomic step.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use claimchain_core::{
    Checkpoint, CheckpointId, EntryId, EpochRecord, Error, Hash, LogEntry, NewCheckpoint,
    NewEntry, PublicKey, Result, Sig,
};

use crate::traits::{CheckpointStore, EntryStore, EpochStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log_entries (
    id                INTEGER PRIMARY KEY,
    claim_id          TEXT    NOT NULL,
    event_type        TEXT    NOT NULL,
    timestamp_micros  INTEGER NOT NULL,
    payload_hash      BLOB    NOT NULL,
    prev_hash         BLOB    NOT NULL,
    actor_sig         BLOB,
    epoch_id          TEXT
);
CREATE INDEX IF NOT EXISTS idx_log_entries_claim ON log_entries (claim_id, id);
CREATE INDEX IF NOT EXISTS idx_log_entries_type  ON log_entries (event_type);

CREATE TABLE IF NOT EXISTS checkpoints (
    id                    INTEGER PRIMARY KEY,
    merkle_root           BLOB    NOT NULL,
    range_lo              INTEGER NOT NULL,
    range_hi              INTEGER NOT NULL,
    prev_checkpoint_hash  BLOB,
    signer_epoch_id       TEXT    NOT NULL,
    signature             BLOB    NOT NULL,
    created_at_micros     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_signer ON checkpoints (signer_epoch_id);

CREATE TABLE IF NOT EXISTS epoch_keys (
    epoch_id          TEXT PRIMARY KEY,
    public_key        BLOB    NOT NULL,
    created_at_micros INTEGER NOT NULL,
    retired           INTEGER NOT NULL DEFAULT 0
);
";

/// SQLite-backed store.
///
/// The connection sits behind a mutex: SQLite serializes writers anyway, and
/// a single connection keeps the transactional append simple.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening sqlite store");
        let conn = Connection::open(path).map_err(open_err)?;
        Self::init(conn)
    }

    /// Open an in-memory database (tests, scratch tooling).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(open_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::storage_source("schema init failed", e))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn open_err(e: rusqlite::Error) -> Error {
    Error::storage_source("failed to open sqlite database", e)
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::storage_source("sqlite query failed", e)
}

fn hash_from_blob(blob: Vec<u8>) -> Result<Hash> {
    let arr: [u8; 32] = blob
        .as_slice()
        .try_into()
        .map_err(|_| Error::storage("stored hash is not 32 bytes"))?;
    Ok(Hash::from_bytes(arr))
}

fn datetime_from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| Error::storage("stored timestamp out of range"))
}

/// Row image with primitive column types; converted outside the rusqlite
/// mapping closure so conversion failures surface as storage errors.
struct EntryRow {
    id: i64,
    claim_id: String,
    event_type: String,
    timestamp_micros: i64,
    payload_hash: Vec<u8>,
    prev_hash: Vec<u8>,
    actor_sig: Option<Vec<u8>>,
    epoch_id: Option<String>,
}

impl EntryRow {
    const COLUMNS: &'static str =
        "id, claim_id, event_type, timestamp_micros, payload_hash, prev_hash, actor_sig, epoch_id";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            claim_id: row.get(1)?,
            event_type: row.get(2)?,
            timestamp_micros: row.get(3)?,
            payload_hash: row.get(4)?,
            prev_hash: row.get(5)?,
            actor_sig: row.get(6)?,
            epoch_id: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<LogEntry> {
        Ok(LogEntry {
            id: self.id as EntryId,
            claim_id: self.claim_id,
            event_type: self.event_type,
            timestamp: datetime_from_micros(self.timestamp_micros)?,
            payload_hash: hash_from_blob(self.payload_hash)?,
            prev_hash: hash_from_blob(self.prev_hash)?,
            actor_sig: self.actor_sig,
            epoch_id: self.epoch_id,
        })
    }
}

struct CheckpointRow {
    id: i64,
    merkle_root: Vec<u8>,
    range_lo: i64,
    range_hi: i64,
    prev_checkpoint_hash: Option<Vec<u8>>,
    signer_epoch_id: String,
    signature: Vec<u8>,
    created_at_micros: i64,
}

impl CheckpointRow {
    const COLUMNS: &'static str = "id, merkle_root, range_lo, range_hi, prev_checkpoint_hash, \
                                   signer_epoch_id, signature, created_at_micros";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            merkle_root: row.get(1)?,
            range_lo: row.get(2)?,
            range_hi: row.get(3)?,
            prev_checkpoint_hash: row.get(4)?,
            signer_epoch_id: row.get(5)?,
            signature: row.get(6)?,
            created_at_micros: row.get(7)?,
        })
    }

    fn into_checkpoint(self) -> Result<Checkpoint> {
        Ok(Checkpoint {
            id: self.id as CheckpointId,
            merkle_root: hash_from_blob(self.merkle_root)?,
            range_lo: self.range_lo as EntryId,
            range_hi: self.range_hi as EntryId,
            prev_checkpoint_hash: self.prev_checkpoint_hash.map(hash_from_blob).transpose()?,
            signer_epoch_id: self.signer_epoch_id,
            signature: Sig::from_bytes(&self.signature)
                .map_err(|_| Error::storage("stored signature has invalid length"))?,
            created_at: datetime_from_micros(self.created_at_micros)?,
        })
    }
}

impl EntryStore for SqliteStore {
    fn insert_entry(&self, expect_last_id: Option<EntryId>, entry: NewEntry) -> Result<LogEntry> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let last: Option<i64> = tx
            .query_row("SELECT MAX(id) FROM log_entries", [], |r| r.get(0))
            .map_err(db_err)?;
        let last = last.map(|v| v as EntryId);
        if last != expect_last_id {
            // Dropping the transaction rolls it back.
            return Err(Error::ChainRaced);
        }

        let id = last.unwrap_or(0) + 1;
        tx.execute(
            "INSERT INTO log_entries \
             (id, claim_id, event_type, timestamp_micros, payload_hash, prev_hash, actor_sig, epoch_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id as i64,
                entry.claim_id,
                entry.event_type,
                entry.timestamp.timestamp_micros(),
                entry.payload_hash.as_bytes().as_slice(),
                entry.prev_hash.as_bytes().as_slice(),
                entry.actor_sig,
                entry.epoch_id,
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        Ok(entry.into_entry(id))
    }

    fn entry(&self, id: EntryId) -> Result<Option<LogEntry>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM log_entries WHERE id = ?1",
                    EntryRow::COLUMNS
                ),
                params![id as i64],
                EntryRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(EntryRow::into_entry).transpose()
    }

    fn entries_in(&self, lo: EntryId, hi: EntryId) -> Result<Vec<LogEntry>> {
        if lo == 0 || lo > hi {
            return Err(Error::invalid_input(format!("invalid range {lo}..={hi}")));
        }
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM log_entries WHERE id BETWEEN ?1 AND ?2 ORDER BY id ASC",
                EntryRow::COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![lo as i64, hi as i64], EntryRow::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?.into_entry()?);
        }
        Ok(entries)
    }

    fn last_entry(&self) -> Result<Option<LogEntry>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM log_entries ORDER BY id DESC LIMIT 1",
                    EntryRow::COLUMNS
                ),
                [],
                EntryRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(EntryRow::into_entry).transpose()
    }

    fn entries_for_claim(&self, claim_id: &str) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM log_entries WHERE claim_id = ?1 ORDER BY id ASC",
                EntryRow::COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![claim_id], EntryRow::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?.into_entry()?);
        }
        Ok(entries)
    }
}

impl CheckpointStore for SqliteStore {
    fn insert_checkpoint(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let last: Option<i64> = tx
            .query_row("SELECT MAX(id) FROM checkpoints", [], |r| r.get(0))
            .map_err(db_err)?;
        let id = last.unwrap_or(0) as CheckpointId + 1;

        tx.execute(
            "INSERT INTO checkpoints \
             (id, merkle_root, range_lo, range_hi, prev_checkpoint_hash, signer_epoch_id, signature, created_at_micros) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id as i64,
                checkpoint.merkle_root.as_bytes().as_slice(),
                checkpoint.range_lo as i64,
                checkpoint.range_hi as i64,
                checkpoint
                    .prev_checkpoint_hash
                    .as_ref()
                    .map(|h| h.as_bytes().to_vec()),
                checkpoint.signer_epoch_id,
                checkpoint.signature.as_bytes(),
                checkpoint.created_at.timestamp_micros(),
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        Ok(checkpoint.into_checkpoint(id))
    }

    fn checkpoint(&self, id: CheckpointId) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM checkpoints WHERE id = ?1",
                    CheckpointRow::COLUMNS
                ),
                params![id as i64],
                CheckpointRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    fn last_checkpoint(&self) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM checkpoints ORDER BY id DESC LIMIT 1",
                    CheckpointRow::COLUMNS
                ),
                [],
                CheckpointRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    fn checkpoints(&self) -> Result<Vec<Checkpoint>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM checkpoints ORDER BY id ASC",
                CheckpointRow::COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt.query_map([], CheckpointRow::from_row).map_err(db_err)?;

        let mut checkpoints = Vec::new();
        for row in rows {
            checkpoints.push(row.map_err(db_err)?.into_checkpoint()?);
        }
        Ok(checkpoints)
    }

    fn checkpoint_containing(&self, entry_id: EntryId) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM checkpoints WHERE range_lo <= ?1 AND ?1 <= range_hi LIMIT 1",
                    CheckpointRow::COLUMNS
                ),
                params![entry_id as i64],
                CheckpointRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(CheckpointRow::into_checkpoint).transpose()
    }
}

impl EpochStore for SqliteStore {
    fn insert_epoch(&self, record: EpochRecord) -> Result<()> {
        let conn = self.conn.lock();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO epoch_keys (epoch_id, public_key, created_at_micros, retired) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.epoch_id,
                    record.public_key.as_bytes(),
                    record.created_at.timestamp_micros(),
                    record.retired as i64,
                ],
            )
            .map_err(db_err)?;
        if inserted == 0 {
            return Err(Error::invalid_input(format!(
                "epoch {} already has a stored key",
                record.epoch_id
            )));
        }
        Ok(())
    }

    fn epoch(&self, epoch_id: &str) -> Result<Option<EpochRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT epoch_id, public_key, created_at_micros, retired \
                 FROM epoch_keys WHERE epoch_id = ?1",
                params![epoch_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, Vec<u8>>(1)?,
                        r.get::<_, i64>(2)?,
                        r.get::<_, bool>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(epoch_id, pk, micros, retired)| {
            Ok(EpochRecord {
                epoch_id,
                public_key: PublicKey::from_bytes(&pk)
                    .map_err(|_| Error::storage("stored public key has invalid length"))?,
                created_at: datetime_from_micros(micros)?,
                retired,
            })
        })
        .transpose()
    }

    fn retire_epoch(&self, epoch_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE epoch_keys SET retired = 1 WHERE epoch_id = ?1",
                params![epoch_id],
            )
            .map_err(db_err)?;
        Ok(updated > 0)
    }

    fn epochs(&self) -> Result<Vec<EpochRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT epoch_id, public_key, created_at_micros, retired \
                 FROM epoch_keys ORDER BY created_at_micros ASC, epoch_id ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Vec<u8>>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, bool>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (epoch_id, pk, micros, retired) = row.map_err(db_err)?;
            records.push(EpochRecord {
                epoch_id,
                public_key: PublicKey::from_bytes(&pk)
                    .map_err(|_| Error::storage("stored public key has invalid length"))?,
                created_at: datetime_from_micros(micros)?,
                retired,
            });
        }
        Ok(records)
    }
}
