#![deny(unsafe_code)]
//! # Overview
//!
//! A [`cdb_store::Sink`] backed by a plain directory: one file per chunk,
//! named after its content hash, plus one small JSON index document per
//! backup.
//!
//! # Design
//!
//! Chunk existence is checked with a single `stat`-equivalent call before
//! writing; a chunk that is already on disk is assumed correct and is not
//! rewritten or re-verified (see the "existence implies correctness" note in
//! the top-level design notes). The index document is a flat
//! `{"Name": ..., "Objects": [...]}` array of chunk file names in split
//! order, matching the layout a restore tool needs to walk without any
//! backend-specific bookkeeping.
//!
//! Because chunk files are named after their own content hash, a directory
//! reused with different [`cdb_store::RollingParams`] would silently mix two
//! incompatible chunkings together instead of failing; [`check_params`]
//! guards against that the same way `cdb_kv_sink::check_params` does.

mod error;
mod params;

pub use error::FileSinkError;
pub use params::{check_params, persist_params};

use std::fs;
use std::path::{Path, PathBuf};

use cdb_store::{ChunkResolver, ContentHash, IndexId, Sink};
use serde::{Deserialize, Serialize};

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct IndexDoc {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Objects")]
    objects: Vec<String>,
}

/// A directory-backed [`Sink`].
///
/// Created with [`FileSink::create`], which ensures the destination
/// directory exists.
pub struct FileSink {
    dst: PathBuf,
    name: String,
    objects: Vec<String>,
}

impl FileSink {
    /// Opens (creating if needed) a directory-backed sink writing chunks and
    /// an index named `name` under `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`FileSinkError::Io`] if the directory cannot be created.
    pub fn create(dst: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self, FileSinkError> {
        let dst = dst.into();
        fs::create_dir_all(&dst)?;
        set_mode(&dst, 0o760)?;
        Ok(Self {
            dst,
            name: name.into(),
            objects: Vec::new(),
        })
    }
}

impl Sink for FileSink {
    type Error = FileSinkError;

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        let id = ContentHash::digest(chunk);
        let fname = id.to_file_name();
        let path = self.dst.join(&fname);
        if !path.exists() {
            fs::write(&path, chunk)?;
            set_mode(&path, 0o660)?;
        } else {
            tracing::debug!(chunk = %fname, "chunk already present, skipping write");
        }
        self.objects.push(fname);
        Ok(())
    }

    fn finalize(self) -> Result<IndexId, Self::Error> {
        let doc = IndexDoc {
            name: self.name.clone(),
            objects: self.objects,
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;
        let idx_path = self.dst.join(format!("{}.idx", self.name));
        fs::write(&idx_path, &bytes)?;
        set_mode(&idx_path, 0o660)?;
        Ok(ContentHash::digest(&bytes))
    }
}

fn chunk_name_to_hash(entry: &str) -> Result<ContentHash, FileSinkError> {
    entry
        .strip_prefix("sha1-")
        .and_then(|s| s.strip_suffix(".dat"))
        .ok_or_else(|| FileSinkError::MalformedEntry(entry.to_string()))?
        .parse()
        .map_err(|_| FileSinkError::MalformedEntry(entry.to_string()))
}

/// The ordered chunk identifiers recorded in a `<name>.idx` document,
/// together with its file names for resolution against the same directory.
pub struct LoadedIndex {
    /// Chunk identifiers in split order.
    pub chunk_ids: Vec<ContentHash>,
}

/// Loads the index previously written by [`FileSink::finalize`] for `name`
/// under `dst`.
///
/// # Errors
///
/// Returns [`FileSinkError::Io`] if the index file cannot be read,
/// [`FileSinkError::Json`] if it is not valid JSON, or
/// [`FileSinkError::MalformedEntry`] if an entry is not a `sha1-<hex>.dat`
/// file name.
pub fn load_index(dst: impl AsRef<Path>, name: &str) -> Result<LoadedIndex, FileSinkError> {
    let path = dst.as_ref().join(format!("{name}.idx"));
    let bytes = fs::read(path)?;
    let doc: IndexDoc = serde_json::from_slice(&bytes)?;
    let chunk_ids = doc
        .objects
        .iter()
        .map(|s| chunk_name_to_hash(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LoadedIndex { chunk_ids })
}

/// Lists the names of all backups recorded under `dst` (every `*.idx` file,
/// without its extension), sorted lexicographically.
///
/// # Errors
///
/// Returns [`FileSinkError::Io`] if the directory cannot be read.
pub fn list_names(dst: impl AsRef<Path>) -> Result<Vec<String>, FileSinkError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dst)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "idx") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Resolves chunk identifiers to bytes by reading `sha1-<hex>.dat` files out
/// of a directory, re-hashing each one to catch corruption.
pub struct FileResolver {
    dst: PathBuf,
}

impl FileResolver {
    /// Creates a resolver reading chunks out of `dst`.
    #[must_use]
    pub fn new(dst: impl Into<PathBuf>) -> Self {
        Self { dst: dst.into() }
    }
}

impl ChunkResolver for FileResolver {
    type Error = FileSinkError;

    fn resolve(&self, id: &ContentHash) -> Result<Vec<u8>, Self::Error> {
        let path = self.dst.join(id.to_file_name());
        let bytes = fs::read(&path)?;
        let actual = ContentHash::digest(&bytes);
        if actual != *id {
            return Err(FileSinkError::Store(cdb_store::StoreError::Corruption {
                expected: *id,
                actual,
            }));
        }
        Ok(bytes)
    }
}
