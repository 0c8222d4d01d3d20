use crate::hash::IndexId;

/// A destination that accepts chunks in split order and produces a
/// persisted, content-addressed index.
///
/// A sink owns its backing store handle for the lifetime of one backup.
/// `write` is called once per chunk, in order; `finalize` is called exactly
/// once, whether or not an earlier `write` failed, and consumes the sink so
/// it cannot be reused afterwards.
pub trait Sink {
    /// The error type this sink's backing store can produce.
    type Error: std::error::Error;

    /// Accepts one chunk, computing its content hash, appending the hash to
    /// the in-progress index, and ensuring the store holds the chunk's bytes
    /// (inserting them only if they are not already present).
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the store write fails.
    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error>;

    /// Persists the in-progress index and, if this sink has a tag, binds the
    /// tag to the new index's identifier, recording any prior binding as the
    /// new index's previous version.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the index or tag write fails.
    fn finalize(self) -> Result<IndexId, Self::Error>;
}
