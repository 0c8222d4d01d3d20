#![deny(unsafe_code)]
//! # Overview
//!
//! Backend-independent pieces of a content-addressed backup store: the
//! content identifier type, the ordered index of a single backup, the
//! construction parameters that govern chunking, the `Sink`/`ChunkResolver`
//! traits a backend implements, and the generic restore reader built on top
//! of them.
//!
//! # Design
//!
//! Nothing in this crate touches a filesystem, a key-value store, or a SQL
//! database. Those concerns live in `cdb-file-sink`, `cdb-kv-sink` and
//! `cdb-sql-sink`, each of which implements [`Sink`] and [`ChunkResolver`]
//! against its own backing store but shares the identifier, index and error
//! types defined here so a caller can work with any backend through the same
//! abstractions.
//!
//! # Invariants
//!
//! For every identifier present in an [`Index`], the store the index was
//! written against contains bytes whose content hash equals that identifier.
//! Writing a chunk whose identifier already exists never overwrites the
//! existing bytes.

mod error;
mod hash;
mod index;
mod params;
mod reader;
mod sink;

pub use error::StoreError;
pub use hash::{ContentHash, IndexId, ParseHashError, DIGEST_LEN};
pub use index::Index;
pub use params::RollingParams;
pub use reader::{ChunkResolver, IndexReader};
pub use sink::Sink;
