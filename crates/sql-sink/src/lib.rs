#![deny(unsafe_code)]
//! # Overview
//!
//! A [`cdb_store::Sink`] backed by a relational database ([`rusqlite`]):
//! chunks live in a `chunks` table keyed by their content hash, an
//! `objindex` table records, per backup, the ordered rowids a label's chunks
//! occupy, and an `objinfo` table names each backup and the hash of its full
//! (unsplit) input stream.
//!
//! # Design
//!
//! Every write performed while a [`SqlSink`] is open belongs to a single
//! transaction opened at construction time; [`Sink::finalize`] commits it,
//! and dropping the sink without finalizing rolls it back, so a crash or an
//! early return never leaves a half-written backup visible to a reader.
//!
//! Unlike [`cdb_kv_sink`](https://docs.rs/cdb-kv-sink), this backend has no
//! tag namespace or version chain: a label may appear in `objinfo` more than
//! once, one row per backup, ordered by `fid`.
//!
//! A single-row `params` table records the [`cdb_store::RollingParams`] the
//! database was first opened with; [`check_params`] rejects a reopen under
//! different parameters the same way `cdb_kv_sink::check_params` does.

mod error;
mod params;

pub use error::SqlSinkError;
pub use params::{check_params, persist_params};

use std::path::Path;

use cdb_store::{ChunkResolver, ContentHash, IndexId, Sink};
use digest::Digest;
use rusqlite::{params as sql_params, Connection, OptionalExtension};
use sha1::Sha1;

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS objinfo (fid INTEGER, label TEXT, hash TEXT, modtime INTEGER);",
    "CREATE TABLE IF NOT EXISTS chunks (rowid INTEGER PRIMARY KEY, hash TEXT, data BLOB);",
    "CREATE TABLE IF NOT EXISTS objindex (fid INTEGER, chunkrow INTEGER);",
    "CREATE INDEX IF NOT EXISTS chunks_hash_idx ON chunks (hash);",
    "CREATE TABLE IF NOT EXISTS params (id INTEGER PRIMARY KEY CHECK (id = 1), json TEXT NOT NULL);",
];

fn hash_text(id: &ContentHash) -> String {
    format!("sha1-{id}")
}

fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn max_fid(conn: &Connection) -> Result<i64, SqlSinkError> {
    let max: Option<i64> = conn.query_row("SELECT MAX(fid) FROM objinfo;", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0))
}

fn max_chunk_rowid(conn: &Connection) -> Result<i64, SqlSinkError> {
    let max: Option<i64> = conn.query_row("SELECT MAX(rowid) FROM chunks;", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0))
}

fn chunk_rowid_by_hash(conn: &Connection, hash: &str) -> Result<Option<i64>, SqlSinkError> {
    Ok(conn
        .query_row("SELECT rowid FROM chunks WHERE hash = ?1;", sql_params![hash], |row| {
            row.get(0)
        })
        .optional()?)
}

/// Opens (creating if needed) the three-table schema this sink expects.
///
/// # Errors
///
/// Returns [`SqlSinkError::Sqlite`] if the database cannot be opened or the
/// tables cannot be created.
pub fn open(path: impl AsRef<Path>) -> Result<Connection, SqlSinkError> {
    let conn = Connection::open(path)?;
    for stmt in CREATE_TABLES {
        conn.execute_batch(stmt)?;
    }
    Ok(conn)
}

/// A [`rusqlite`]-backed [`Sink`] writing chunks and an ordered index for one
/// backup under `label`.
///
/// Holds a single open transaction for its entire lifetime; construct one
/// `SqlSink` per backup, never reuse it across objects.
pub struct SqlSink {
    conn: Connection,
    fid: i64,
    label: String,
    chunk_rows: Vec<i64>,
    full_hasher: Sha1,
    committed: bool,
}

impl SqlSink {
    /// Begins a new transaction against an already-[`open`]ed connection,
    /// writing chunks for a backup of `label`.
    ///
    /// # Errors
    ///
    /// Returns [`SqlSinkError::Sqlite`] if the transaction cannot be
    /// started or the next `fid` cannot be determined.
    pub fn create(conn: Connection, label: impl Into<String>) -> Result<Self, SqlSinkError> {
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        let fid = max_fid(&conn)? + 1;
        Ok(Self {
            conn,
            fid,
            label: label.into(),
            chunk_rows: Vec::new(),
            full_hasher: Sha1::new(),
            committed: false,
        })
    }
}

impl Sink for SqlSink {
    type Error = SqlSinkError;

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        self.full_hasher.update(chunk);
        let id = ContentHash::digest(chunk);
        let text = hash_text(&id);

        let rowid = match chunk_rowid_by_hash(&self.conn, &text)? {
            Some(existing) => existing,
            None => {
                let rowid = max_chunk_rowid(&self.conn)? + 1;
                self.conn.execute(
                    "INSERT INTO chunks (rowid, hash, data) VALUES (?1, ?2, ?3);",
                    sql_params![rowid, text, chunk],
                )?;
                rowid
            }
        };
        self.chunk_rows.push(rowid);
        Ok(())
    }

    fn finalize(mut self) -> Result<IndexId, Self::Error> {
        for rowid in &self.chunk_rows {
            self.conn.execute(
                "INSERT INTO objindex (fid, chunkrow) VALUES (?1, ?2);",
                sql_params![self.fid, rowid],
            )?;
        }

        let digest = self.full_hasher.clone().finalize();
        let mut buf = [0u8; cdb_store::DIGEST_LEN];
        buf.copy_from_slice(&digest);
        let full_hash = ContentHash::from_bytes(buf);

        self.conn.execute(
            "INSERT INTO objinfo (fid, label, hash, modtime) VALUES (?1, ?2, ?3, ?4);",
            sql_params![self.fid, self.label, hash_text(&full_hash), now_unix()],
        )?;

        self.conn.execute_batch("COMMIT;")?;
        self.committed = true;
        tracing::debug!(label = %self.label, fid = self.fid, "backup committed");
        Ok(full_hash)
    }
}

impl Drop for SqlSink {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}

/// Resolves chunk identifiers to bytes by looking them up in the `chunks`
/// table, re-hashing each one to catch corruption.
pub struct SqlResolver<'a> {
    conn: &'a Connection,
}

impl<'a> SqlResolver<'a> {
    /// Creates a resolver reading chunks out of `conn`.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ChunkResolver for SqlResolver<'_> {
    type Error = SqlSinkError;

    fn resolve(&self, id: &ContentHash) -> Result<Vec<u8>, Self::Error> {
        let text = hash_text(id);
        let data: Vec<u8> = self
            .conn
            .query_row("SELECT data FROM chunks WHERE hash = ?1;", sql_params![text], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| SqlSinkError::NotFound(text.clone()))?;
        let actual = ContentHash::digest(&data);
        if actual != *id {
            return Err(SqlSinkError::Store(cdb_store::StoreError::Corruption {
                expected: *id,
                actual,
            }));
        }
        Ok(data)
    }
}

/// The ordered chunk identifiers recorded for one backup, together with the
/// `fid` they were written under.
pub struct LoadedBackup {
    /// The backup's own identifier within this database.
    pub fid: i64,
    /// Chunk identifiers in split order.
    pub chunk_ids: Vec<ContentHash>,
}

/// Loads the most recent backup recorded under `label` (the one with the
/// greatest `fid`).
///
/// # Errors
///
/// Returns [`SqlSinkError::NotFound`] if `label` has never been backed up,
/// or a malformed-hash error if a stored hash is not `sha1-<hex>`.
pub fn load_latest(conn: &Connection, label: &str) -> Result<LoadedBackup, SqlSinkError> {
    let fid: Option<i64> = conn
        .query_row(
            "SELECT fid FROM objinfo WHERE label = ?1 ORDER BY fid DESC LIMIT 1;",
            sql_params![label],
            |row| row.get(0),
        )
        .optional()?;
    let Some(fid) = fid else {
        return Err(SqlSinkError::NotFound(label.to_string()));
    };
    load_by_fid(conn, fid)
}

/// Loads the backup identified directly by `fid`.
///
/// # Errors
///
/// Returns [`SqlSinkError::NotFound`] if no such `fid` is recorded.
pub fn load_by_fid(conn: &Connection, fid: i64) -> Result<LoadedBackup, SqlSinkError> {
    let mut stmt = conn.prepare(
        "SELECT chunks.hash FROM objindex \
         JOIN chunks ON chunks.rowid = objindex.chunkrow \
         WHERE objindex.fid = ?1 ORDER BY objindex.rowid ASC;",
    )?;
    let mut chunk_ids = Vec::new();
    let rows = stmt.query_map(sql_params![fid], |row| row.get::<_, String>(0))?;
    for row in rows {
        let text = row?;
        let hex = text
            .strip_prefix("sha1-")
            .ok_or_else(|| SqlSinkError::NotFound(text.clone()))?;
        let id: ContentHash = hex
            .parse()
            .map_err(|_| SqlSinkError::NotFound(text.clone()))?;
        chunk_ids.push(id);
    }
    if chunk_ids.is_empty() {
        // Distinguish "backup of nothing" from "no such fid" by checking
        // objinfo directly.
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM objinfo WHERE fid = ?1);",
            sql_params![fid],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(SqlSinkError::NotFound(format!("fid {fid}")));
        }
    }
    Ok(LoadedBackup { fid, chunk_ids })
}

/// Looks up the `fid` of a backup whose full-stream hash matches `hash`,
/// used to detect that an entire object has already been backed up without
/// re-splitting it.
///
/// # Errors
///
/// Returns [`SqlSinkError::Sqlite`] if the lookup query fails.
pub fn find_by_full_hash(conn: &Connection, hash: &ContentHash) -> Result<Option<i64>, SqlSinkError> {
    Ok(conn
        .query_row(
            "SELECT fid FROM objinfo WHERE hash = ?1 LIMIT 1;",
            sql_params![hash_text(hash)],
            |row| row.get(0),
        )
        .optional()?)
}

/// Lists every distinct label recorded in `conn`, sorted lexicographically,
/// restricted to those starting with `prefix`.
///
/// # Errors
///
/// Returns [`SqlSinkError::Sqlite`] if the scan fails.
pub fn list_labels(conn: &Connection, prefix: &str) -> Result<Vec<String>, SqlSinkError> {
    let mut stmt = conn.prepare("SELECT DISTINCT label FROM objinfo ORDER BY label ASC;")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut labels = Vec::new();
    for row in rows {
        let label = row?;
        if label.starts_with(prefix) {
            labels.push(label);
        }
    }
    Ok(labels)
}
