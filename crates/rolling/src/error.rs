use core::fmt;

/// Errors that can occur while constructing a rolling checksum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RollingError {
    /// A window size of zero was requested; the checksum would never be able
    /// to observe any bytes.
    ZeroWindow,
}

impl fmt::Display for RollingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWindow => write!(f, "rolling checksum requires a non-zero window size"),
        }
    }
}

impl std::error::Error for RollingError {}
