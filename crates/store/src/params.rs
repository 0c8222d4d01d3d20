use serde::{Deserialize, Serialize};

/// Construction parameters for the rolling checksum and splitter.
///
/// These are explicit constructor arguments rather than process-level
/// constants. A store persists the triple it was first opened with; opening
/// the same store again with different parameters produces chunks that
/// cannot be deduplicated against the existing ones, so backends reject a
/// mismatch at open time (see [`crate::StoreError::ParamMismatch`]) instead
/// of silently fragmenting the store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RollingParams {
    /// Number of trailing bytes the rolling checksum considers.
    pub window_size: usize,
    /// Target mean chunk length in bytes.
    pub avg_chunk: u32,
    /// Minimum chunk length enforced before a boundary is honored.
    pub min_chunk: usize,
}

impl RollingParams {
    /// The reference parameter set: 64-byte window, 8 KiB average chunk,
    /// minimum chunk length equal to the window.
    #[must_use]
    pub const fn reference() -> Self {
        Self {
            window_size: 64,
            avg_chunk: 8192,
            min_chunk: 64,
        }
    }
}

impl Default for RollingParams {
    fn default() -> Self {
        Self::reference()
    }
}
