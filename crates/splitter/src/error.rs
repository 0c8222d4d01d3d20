use thiserror::Error;

/// Errors produced while splitting an input stream into chunks.
///
/// The variant ordering in [`split`](crate::split) matters: an
/// [`InputRead`](SplitError::InputRead) or
/// [`SinkWrite`](SplitError::SinkWrite) failure aborts the split but the
/// sink is still finalized; if finalize also fails, the earlier error is
/// reported and the finalize failure is discarded, per the cancellation
/// semantics of a content-addressed backup.
#[derive(Debug, Error)]
pub enum SplitError<E: std::error::Error + 'static> {
    /// The input parameters could not construct a valid rolling checksum.
    #[error("invalid splitter parameters: {0}")]
    InvalidParams(#[from] cdb_rolling::RollingError),

    /// Reading the input stream failed.
    #[error("reading input failed: {0}")]
    InputRead(#[source] std::io::Error),

    /// The sink rejected a chunk write.
    #[error("sink write failed: {0}")]
    SinkWrite(#[source] E),

    /// The sink failed to finalize its index.
    #[error("sink finalize failed: {0}")]
    SinkFinalize(#[source] E),
}
