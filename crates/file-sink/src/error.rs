use thiserror::Error;

/// Errors produced by the directory-backed sink and reader.
#[derive(Debug, Error)]
pub enum FileSinkError {
    /// A filesystem operation failed.
    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// The index document could not be encoded or decoded as JSON.
    #[error("index document error: {0}")]
    Json(#[from] serde_json::Error),

    /// A chunk file name in an index did not look like `sha1-<hex>.dat`.
    #[error("malformed chunk entry: {0}")]
    MalformedEntry(String),

    /// A chunk read back from disk did not hash to the identifier its file
    /// name claimed.
    #[error(transparent)]
    Store(#[from] cdb_store::StoreError),
}
