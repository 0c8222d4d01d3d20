#![deny(unsafe_code)]
//! # Overview
//!
//! A [`cdb_store::Sink`] backed by [`sled`], an ordered embedded key-value
//! store. Chunks, indexes and tag bindings all live in the same database
//! under disjoint key namespaces; large values are transparently split
//! across continuation keys (see [`large`]).
//!
//! # Design
//!
//! `tags/<label>` maps to the identifier of the label's current index. When
//! a sink for an existing tag finalizes, the new index's
//! `prev_version_id` is set to whatever the tag pointed at before the tag is
//! rebound, so a reader can walk the chain backwards from the tag to recover
//! every prior version.

mod error;
mod large;
mod params;

pub use error::KvSinkError;
pub use params::{check_params, persist_params};

use std::time::{SystemTime, UNIX_EPOCH};

use cdb_store::{ChunkResolver, ContentHash, Index, IndexId, Sink};
use sled::Db;

const TAGS_PREFIX: &str = "tags/";

fn tag_key(tag: &str) -> Vec<u8> {
    format!("{TAGS_PREFIX}{tag}").into_bytes()
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A [`sled`]-backed [`Sink`] writing chunks for one backup under `tag`.
pub struct KvSink {
    db: Db,
    tag: String,
    chunk_ids: Vec<ContentHash>,
}

impl KvSink {
    /// Creates a sink that will write chunks into `db` and bind the
    /// resulting index to `tag` on [`finalize`](Sink::finalize).
    #[must_use]
    pub fn new(db: Db, tag: impl Into<String>) -> Self {
        Self {
            db,
            tag: tag.into(),
            chunk_ids: Vec::new(),
        }
    }
}

impl Sink for KvSink {
    type Error = KvSinkError;

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        let id = ContentHash::digest(chunk);
        large::write_large(&self.db, id.as_bytes(), chunk)?;
        self.chunk_ids.push(id);
        Ok(())
    }

    fn finalize(self) -> Result<IndexId, Self::Error> {
        let key = tag_key(&self.tag);
        let prev = self
            .db
            .get(&key)?
            .map(|bytes| {
                let mut buf = [0u8; cdb_store::DIGEST_LEN];
                buf.copy_from_slice(&bytes);
                ContentHash::from_bytes(buf)
            });

        let mut index = Index::new(self.tag.clone(), now_unix());
        index.prev_version_id = prev;
        index.chunk_ids = self.chunk_ids;

        let bytes = index.to_bytes()?;
        let id = ContentHash::digest(&bytes);
        large::write_large(&self.db, id.as_bytes(), &bytes)?;
        self.db.insert(key, id.as_bytes().to_vec())?;
        self.db.flush()?;
        tracing::debug!(tag = %self.tag, index = %id, "tag rebound to new index");
        Ok(id)
    }
}

/// Resolves chunk identifiers against a [`sled`] database.
pub struct KvResolver {
    db: Db,
}

impl KvResolver {
    /// Creates a resolver reading chunks out of `db`.
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl ChunkResolver for KvResolver {
    type Error = KvSinkError;

    fn resolve(&self, id: &ContentHash) -> Result<Vec<u8>, Self::Error> {
        let bytes = large::read_large(&self.db, id.as_bytes())?
            .ok_or_else(|| KvSinkError::NotFound(id.to_string()))?;
        let actual = ContentHash::digest(&bytes);
        if actual != *id {
            return Err(KvSinkError::Store(cdb_store::StoreError::Corruption {
                expected: *id,
                actual,
            }));
        }
        Ok(bytes)
    }
}

/// Loads the index bound to `tag`, if any.
///
/// # Errors
///
/// Returns [`KvSinkError::NotFound`] if the tag has never been written, or a
/// decoding error if the stored record is malformed.
pub fn load_tag(db: &Db, tag: &str) -> Result<Index, KvSinkError> {
    let key = tag_key(tag);
    let id_bytes = db
        .get(&key)?
        .ok_or_else(|| KvSinkError::NotFound(format!("{TAGS_PREFIX}{tag}")))?;
    let mut buf = [0u8; cdb_store::DIGEST_LEN];
    buf.copy_from_slice(&id_bytes);
    let id = ContentHash::from_bytes(buf);
    let bytes = large::read_large(db, id.as_bytes())?
        .ok_or_else(|| KvSinkError::NotFound(id.to_string()))?;
    Ok(Index::from_bytes(&bytes)?)
}

/// Loads the index identified directly by `id`, bypassing the tag namespace.
/// Used to walk a version chain one `prev_version_id` at a time.
///
/// # Errors
///
/// Returns [`KvSinkError::NotFound`] if no index is stored under `id`.
pub fn load_index(db: &Db, id: &IndexId) -> Result<Index, KvSinkError> {
    let bytes =
        large::read_large(db, id.as_bytes())?.ok_or_else(|| KvSinkError::NotFound(id.to_string()))?;
    Ok(Index::from_bytes(&bytes)?)
}

/// Lists every tag currently bound in `db`, sorted lexicographically by tag
/// name, restricted to those starting with `prefix`.
///
/// # Errors
///
/// Returns [`KvSinkError::Sled`] if the underlying scan fails.
pub fn list_tags(db: &Db, prefix: &str) -> Result<Vec<String>, KvSinkError> {
    let scan_prefix = format!("{TAGS_PREFIX}{prefix}");
    let mut tags = Vec::new();
    for entry in db.scan_prefix(scan_prefix.as_bytes()) {
        let (key, _) = entry?;
        if let Ok(key_str) = std::str::from_utf8(&key) {
            if let Some(tag) = key_str.strip_prefix(TAGS_PREFIX) {
                tags.push(tag.to_string());
            }
        }
    }
    tags.sort();
    Ok(tags)
}
