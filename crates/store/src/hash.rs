use std::fmt;
use std::str::FromStr;

use digest::Digest;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

/// Number of bytes in a [`ContentHash`].
pub const DIGEST_LEN: usize = 20;

/// Error returned when a [`ContentHash`] cannot be parsed from text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseHashError {
    reason: ParseHashReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ParseHashReason {
    WrongLength(usize),
    InvalidHex,
}

impl fmt::Display for ParseHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ParseHashReason::WrongLength(len) => write!(
                f,
                "content hash requires {} hex characters, received {len}",
                DIGEST_LEN * 2
            ),
            ParseHashReason::InvalidHex => write!(f, "content hash contains non-hex characters"),
        }
    }
}

impl std::error::Error for ParseHashError {}

/// A content identifier: the SHA-1 digest of a chunk's bytes, or of an
/// index's serialized metadata.
///
/// `ContentHash` doubles as the `IndexId` type named in the specification;
/// an index is addressed by the hash of its own metadata the same way a
/// chunk is addressed by the hash of its bytes.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; DIGEST_LEN]);

/// Identifies a persisted [`Index`](crate::Index) by the hash of its
/// serialized metadata.
pub type IndexId = ContentHash;

impl ContentHash {
    /// Computes the content hash of `bytes`.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let out = hasher.finalize();
        let mut buf = [0u8; DIGEST_LEN];
        buf.copy_from_slice(&out);
        Self(buf)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Wraps a raw digest that was already computed elsewhere (for example,
    /// read back from a store).
    #[must_use]
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Renders the digest as a lowercase hex string prefixed with `sha1-`,
    /// matching the on-disk chunk filename convention.
    #[must_use]
    pub fn to_file_name(&self) -> String {
        format!("sha1-{self}.dat")
    }

    fn to_hex(self) -> String {
        let mut out = String::with_capacity(DIGEST_LEN * 2);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(ParseHashError {
                reason: ParseHashReason::WrongLength(s.len()),
            });
        }
        let mut buf = [0u8; DIGEST_LEN];
        for (i, chunk) in buf.iter_mut().enumerate() {
            let byte_str = &s[i * 2..i * 2 + 2];
            *chunk = u8::from_str_radix(byte_str, 16).map_err(|_| ParseHashError {
                reason: ParseHashReason::InvalidHex,
            })?;
        }
        Ok(Self(buf))
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_empty_string_matches_known_vector() {
        let h = ContentHash::digest(b"");
        assert_eq!(h.to_string(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn sha1_of_abc_matches_known_vector() {
        let h = ContentHash::digest(b"abc");
        assert_eq!(h.to_string(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        let h = ContentHash::digest(b"hello");
        let parsed: ContentHash = h.to_string().parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("abcd".parse::<ContentHash>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bogus = "g".repeat(DIGEST_LEN * 2);
        assert!(bogus.parse::<ContentHash>().is_err());
    }

    #[test]
    fn file_name_uses_sha1_prefix() {
        let h = ContentHash::digest(b"hello");
        assert_eq!(h.to_file_name(), format!("sha1-{h}.dat"));
    }
}
