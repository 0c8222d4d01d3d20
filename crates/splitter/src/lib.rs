#![deny(unsafe_code)]
//! # Overview
//!
//! Drives the content-defined split loop: read bytes from an input stream,
//! feed each one to a rolling checksum, and hand a chunk to a [`Sink`]
//! whenever the checksum crosses a target threshold and the chunk has
//! reached a minimum length.
//!
//! # Design
//!
//! The boundary predicate is `rolling.sum() < TARGET`, where
//! `TARGET = u32::MAX / avg_chunk` produces a geometric chunk-length
//! distribution with the requested mean. A boundary is honored only once the
//! accumulated chunk has reached `min_chunk` bytes, so the window is always
//! fully saturated by real input before a split decision is trusted; without
//! that floor the checksum's warm-up state produces spurious tiny chunks
//! near the start of every stream.
//!
//! The sink is finalized exactly once regardless of outcome: if reading the
//! input or writing a chunk fails, the loop stops early but still finalizes
//! the sink so it can release its resources, and the read/write error takes
//! precedence over whatever finalize itself returns.

mod error;

pub use error::SplitError;

use std::io::Read;

use cdb_rolling::RollingHash;
use cdb_store::{IndexId, RollingParams, Sink};

const READ_BUF_LEN: usize = 64 * 1024;

/// Computes the boundary threshold for a target average chunk length.
#[must_use]
pub fn target_for(avg_chunk: u32) -> u32 {
    u32::MAX / avg_chunk
}

/// Splits `input` into content-defined chunks according to `params`,
/// handing each chunk to `sink` in order and returning the identifier of the
/// finalized index.
///
/// # Errors
///
/// Returns [`SplitError::InvalidParams`] if `params.window_size` is zero,
/// [`SplitError::InputRead`] if reading `input` fails,
/// [`SplitError::SinkWrite`] if `sink.write` fails, or
/// [`SplitError::SinkFinalize`] if `sink.finalize` fails and no earlier
/// error occurred.
pub fn split<R: Read, S: Sink>(
    mut input: R,
    params: &RollingParams,
    mut sink: S,
) -> Result<IndexId, SplitError<S::Error>> {
    let target = target_for(params.avg_chunk);
    let mut rolling = RollingHash::new(params.window_size)?;
    let mut acc: Vec<u8> = Vec::with_capacity((params.avg_chunk as usize).saturating_mul(4));
    let mut read_buf = [0u8; READ_BUF_LEN];
    let mut first_err: Option<SplitError<S::Error>> = None;

    'outer: loop {
        let n = match input.read(&mut read_buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                first_err = Some(SplitError::InputRead(e));
                break;
            }
        };
        for &c in &read_buf[..n] {
            acc.push(c);
            rolling.write_byte(c);
            if rolling.sum() < target && acc.len() >= params.min_chunk {
                if let Err(e) = sink.write(&acc) {
                    first_err = Some(SplitError::SinkWrite(e));
                    break 'outer;
                }
                tracing::debug!(len = acc.len(), "chunk emitted");
                acc.clear();
            }
        }
    }

    if first_err.is_none() && !acc.is_empty() {
        if let Err(e) = sink.write(&acc) {
            first_err = Some(SplitError::SinkWrite(e));
        } else {
            tracing::debug!(len = acc.len(), "final chunk emitted");
        }
    }

    match (sink.finalize(), first_err) {
        (_, Some(earlier)) => Err(earlier),
        (Ok(id), None) => Ok(id),
        (Err(e), None) => Err(SplitError::SinkFinalize(e)),
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use cdb_store::ContentHash;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct NeverError;
    impl std::fmt::Display for NeverError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "never")
        }
    }
    impl std::error::Error for NeverError {}

    struct RecordingSink {
        log: Rc<RefCell<Vec<Vec<u8>>>>,
    }
    impl Sink for RecordingSink {
        type Error = NeverError;
        fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(chunk.to_vec());
            Ok(())
        }
        fn finalize(self) -> Result<IndexId, Self::Error> {
            Ok(ContentHash::digest(b""))
        }
    }

    fn lengths_for(input: &[u8], params: &RollingParams) -> Vec<usize> {
        let log = Rc::new(RefCell::new(Vec::new()));
        split(input, params, RecordingSink { log: log.clone() }).unwrap();
        log.borrow().iter().map(Vec::len).collect()
    }

    proptest! {
        #[test]
        fn splitting_is_idempotent(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let params = RollingParams { window_size: 16, avg_chunk: 256, min_chunk: 16 };
            let a = lengths_for(&data, &params);
            let b = lengths_for(&data, &params);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn reconstructed_length_matches_input(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let params = RollingParams { window_size: 16, avg_chunk: 256, min_chunk: 16 };
            let lens = lengths_for(&data, &params);
            prop_assert_eq!(lens.iter().sum::<usize>(), data.len());
        }

        #[test]
        fn every_non_final_chunk_meets_min_chunk(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let params = RollingParams { window_size: 16, avg_chunk: 256, min_chunk: 16 };
            let lens = lengths_for(&data, &params);
            for (i, len) in lens.iter().enumerate() {
                if i + 1 < lens.len() {
                    prop_assert!(*len >= params.min_chunk);
                }
            }
        }
    }
}
