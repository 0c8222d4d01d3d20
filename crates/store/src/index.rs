use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, IndexId};

/// An ordered list of chunk identifiers naming one backup, plus the metadata
/// needed to reconstruct and version it.
///
/// Reconstruction concatenates the bytes behind `chunk_ids` in order; two
/// indexes with identical `(label, mod_time, prev_version_id, chunk_ids)`
/// serialize to the same bytes and therefore collapse to the same
/// [`IndexId`], mirroring the at-most-once property chunks already have.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Caller-chosen label identifying what was backed up (usually a path).
    pub label: String,
    /// Seconds since the Unix epoch at the time this index was finalized.
    pub mod_time: i64,
    /// Identifier of the index this one supersedes under the same tag, if
    /// any. Forms a singly-linked version history when followed backwards.
    pub prev_version_id: Option<IndexId>,
    /// Chunk identifiers in split order.
    pub chunk_ids: Vec<ContentHash>,
}

impl Index {
    /// Creates a new, empty index for `label` with no prior version.
    #[must_use]
    pub fn new(label: impl Into<String>, mod_time: i64) -> Self {
        Self {
            label: label.into(),
            mod_time,
            prev_version_id: None,
            chunk_ids: Vec::new(),
        }
    }

    /// Appends a chunk identifier to the index.
    pub fn push(&mut self, id: ContentHash) {
        self.chunk_ids.push(id);
    }

    /// Serializes this index's metadata to bytes for hashing and storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be represented as JSON, which
    /// does not happen for this type's fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserializes an index previously produced by [`Index::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid serialized index.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Computes this index's own identifier: the content hash of its
    /// serialized metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be serialized.
    pub fn id(&self) -> Result<IndexId, serde_json::Error> {
        Ok(ContentHash::digest(&self.to_bytes()?))
    }
}
