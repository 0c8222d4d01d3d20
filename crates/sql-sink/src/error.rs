use thiserror::Error;

/// Errors produced by the relational (SQLite) sink and reader.
#[derive(Debug, Error)]
pub enum SqlSinkError {
    /// The underlying database returned an error.
    #[error("sql operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The requested label, fid or chunk hash is absent from the database.
    #[error("not found: {0}")]
    NotFound(String),

    /// A chunk read back from the `chunks` table did not hash to the
    /// identifier its row claimed.
    #[error(transparent)]
    Store(#[from] cdb_store::StoreError),
}
