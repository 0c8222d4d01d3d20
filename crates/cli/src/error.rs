use thiserror::Error;

/// Errors surfaced by the CLI's subcommands.
///
/// Every variant wraps a lower-layer error from whichever backend crate was
/// selected; [`run`](crate::run) renders the `Display` of whichever variant
/// it receives and returns a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input path could not be resolved or opened.
    #[error("{path}: {source}")]
    Input {
        /// The path that could not be read.
        path: std::path::PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The output path for a restore could not be created or written.
    #[error("{path}: {source}")]
    Output {
        /// The path that could not be written.
        path: std::path::PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The directory-backed sink or reader reported an error.
    #[error(transparent)]
    FileSink(#[from] cdb_file_sink::FileSinkError),

    /// Opening the key-value database failed.
    #[error("opening kv store failed: {0}")]
    SledOpen(#[from] sled::Error),

    /// The key-value-backed sink or reader reported an error.
    #[error(transparent)]
    KvSink(#[from] cdb_kv_sink::KvSinkError),

    /// The relational sink or reader reported an error.
    #[error(transparent)]
    SqlSink(#[from] cdb_sql_sink::SqlSinkError),

    /// Splitting the input stream failed.
    #[error("{0}")]
    Split(String),
}
