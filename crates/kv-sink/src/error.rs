use thiserror::Error;

/// Errors produced by the key-value-backed sink and reader.
#[derive(Debug, Error)]
pub enum KvSinkError {
    /// The embedded database returned an error.
    #[error("kv store operation failed: {0}")]
    Sled(#[from] sled::Error),

    /// An index or parameter record could not be encoded or decoded.
    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested tag or identifier is absent from the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A chunk or fragment read back did not hash to its claimed identifier.
    #[error(transparent)]
    Store(#[from] cdb_store::StoreError),
}
