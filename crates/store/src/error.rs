use thiserror::Error;

use crate::hash::ContentHash;
use crate::params::RollingParams;

/// Errors shared by every concrete [`Sink`](crate::Sink) and reader
/// implementation.
///
/// Each backend crate wraps this taxonomy with whatever backend-specific
/// failures it additionally needs (a sled error, a rusqlite error, and so
/// on), following the pattern laid out in `rsync_batch`'s `BatchError`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the input stream failed.
    #[error("reading input failed: {0}")]
    InputRead(#[source] std::io::Error),

    /// Writing a chunk or index to the backing store failed.
    #[error("writing to store failed: {0}")]
    SinkWrite(String),

    /// Finalizing the index or tag binding failed.
    #[error("finalizing store failed: {0}")]
    SinkFinalize(String),

    /// Looking up a chunk or index in the store failed.
    #[error("store lookup failed: {0}")]
    StoreLookup(String),

    /// The requested tag or identifier does not exist in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A chunk fetched from the store does not hash to the identifier that
    /// named it.
    #[error("corrupt chunk: expected {expected}, got {actual}")]
    Corruption {
        /// The identifier the chunk was fetched under.
        expected: ContentHash,
        /// The identifier actually produced by re-hashing the fetched bytes.
        actual: ContentHash,
    },

    /// The store was opened with parameters that disagree with the ones it
    /// was first created with.
    #[error("store parameters {requested:?} disagree with persisted parameters {persisted:?}")]
    ParamMismatch {
        /// Parameters requested at open time.
        requested: RollingParams,
        /// Parameters the store was originally created with.
        persisted: RollingParams,
    },
}
