use std::io::{self, Read};

use crate::hash::ContentHash;
use crate::index::Index;

/// Resolves a chunk identifier to its bytes against a particular backing
/// store.
///
/// Implemented once per backend (directory lookup, `sled` get, `rusqlite`
/// query); the [`IndexReader`] that drives restoration is written once here
/// and shared by every backend.
pub trait ChunkResolver {
    /// The error type this resolver's backing store can produce.
    type Error: std::error::Error;

    /// Fetches the bytes stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the identifier is absent or the fetch fails.
    fn resolve(&self, id: &ContentHash) -> Result<Vec<u8>, Self::Error>;
}

/// A forward-only byte source that reconstructs the original input from an
/// [`Index`] by reading its chunks, in order, through a [`ChunkResolver`].
pub struct IndexReader<'a, R: ChunkResolver> {
    chunk_ids: &'a [ContentHash],
    resolver: &'a R,
    next: usize,
    buf: Vec<u8>,
    buf_pos: usize,
}

impl<'a, R: ChunkResolver> IndexReader<'a, R> {
    /// Creates a reader that reconstructs `index` using `resolver`.
    #[must_use]
    pub fn new(index: &'a Index, resolver: &'a R) -> Self {
        Self {
            chunk_ids: &index.chunk_ids,
            resolver,
            next: 0,
            buf: Vec::new(),
            buf_pos: 0,
        }
    }
}

impl<R: ChunkResolver> Read for IndexReader<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buf_pos >= self.buf.len() {
            if self.next >= self.chunk_ids.len() {
                return Ok(0);
            }
            self.buf = self
                .resolver
                .resolve(&self.chunk_ids[self.next])
                .map_err(|e| io::Error::other(e.to_string()))?;
            self.buf_pos = 0;
            self.next += 1;
        }
        let n = std::cmp::min(out.len(), self.buf.len() - self.buf_pos);
        out[..n].copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + n]);
        self.buf_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<ContentHash, Vec<u8>>);

    #[derive(Debug)]
    struct MapError(String);

    impl std::fmt::Display for MapError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for MapError {}

    impl ChunkResolver for MapResolver {
        type Error = MapError;

        fn resolve(&self, id: &ContentHash) -> Result<Vec<u8>, Self::Error> {
            self.0
                .get(id)
                .cloned()
                .ok_or_else(|| MapError(format!("missing {id}")))
        }
    }

    #[test]
    fn reads_chunks_in_order() {
        let a = ContentHash::digest(b"hello, ");
        let b = ContentHash::digest(b"world");
        let mut map = HashMap::new();
        map.insert(a, b"hello, ".to_vec());
        map.insert(b, b"world".to_vec());
        let resolver = MapResolver(map);

        let mut index = Index::new("greeting", 0);
        index.push(a);
        index.push(b);

        let mut reader = IndexReader::new(&index, &resolver);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello, world");
    }

    #[test]
    fn empty_index_yields_empty_stream() {
        let map = HashMap::new();
        let resolver = MapResolver(map);
        let index = Index::new("empty", 0);
        let mut reader = IndexReader::new(&index, &resolver);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_chunk_surfaces_as_read_error() {
        let map = HashMap::new();
        let resolver = MapResolver(map);
        let mut index = Index::new("broken", 0);
        index.push(ContentHash::digest(b"missing"));
        let mut reader = IndexReader::new(&index, &resolver);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }
}
