use std::fs;
use std::path::Path;

use cdb_store::{RollingParams, StoreError};

use crate::error::FileSinkError;

const PARAMS_FILE: &str = ".params.json";

/// Reads the persisted [`RollingParams`] from `dst`, if a store was already
/// created there.
///
/// # Errors
///
/// Returns [`FileSinkError::Json`] if the stored record is malformed, or
/// [`FileSinkError::Io`] for any other read failure.
pub fn persisted_params(dst: impl AsRef<Path>) -> Result<Option<RollingParams>, FileSinkError> {
    match fs::read(dst.as_ref().join(PARAMS_FILE)) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persists `params` the first time a store directory is used, or verifies
/// that a previously persisted set of parameters matches `params` on every
/// subsequent open.
///
/// Chunk files are named after their own content hash regardless of the
/// parameters that produced them, so without this check a directory reused
/// with a different `avg_chunk`/`window_size` would silently mix chunkings
/// instead of failing loudly.
///
/// # Errors
///
/// Returns [`FileSinkError::Store`] wrapping [`StoreError::ParamMismatch`] if
/// `params` disagrees with what the directory was first created with.
pub fn check_params(dst: impl AsRef<Path>, params: &RollingParams) -> Result<(), FileSinkError> {
    let dst = dst.as_ref();
    match persisted_params(dst)? {
        Some(persisted) if persisted == *params => Ok(()),
        Some(persisted) => Err(FileSinkError::Store(StoreError::ParamMismatch {
            requested: *params,
            persisted,
        })),
        None => persist_params(dst, params),
    }
}

/// Unconditionally overwrites the persisted parameters. Callers should
/// normally use [`check_params`] instead; this is exposed for store
/// initialization tooling.
///
/// # Errors
///
/// Returns [`FileSinkError::Io`] if the directory cannot be created or the
/// record cannot be written.
pub fn persist_params(dst: impl AsRef<Path>, params: &RollingParams) -> Result<(), FileSinkError> {
    let dst = dst.as_ref();
    fs::create_dir_all(dst)?;
    let bytes = serde_json::to_vec(params)?;
    fs::write(dst.join(PARAMS_FILE), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_open_persists_params() {
        let dir = tempfile::tempdir().unwrap();
        let params = RollingParams::reference();
        check_params(dir.path(), &params).unwrap();
        assert_eq!(persisted_params(dir.path()).unwrap(), Some(params));
    }

    #[test]
    fn matching_reopen_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let params = RollingParams::reference();
        check_params(dir.path(), &params).unwrap();
        check_params(dir.path(), &params).unwrap();
    }

    #[test]
    fn mismatched_reopen_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        check_params(dir.path(), &RollingParams::reference()).unwrap();
        let different = RollingParams {
            window_size: 128,
            ..RollingParams::reference()
        };
        let err = check_params(dir.path(), &different).unwrap_err();
        assert!(matches!(
            err,
            FileSinkError::Store(StoreError::ParamMismatch { .. })
        ));
    }

    #[test]
    fn absent_directory_reports_no_persisted_params() {
        let dir = tempfile::tempdir().unwrap();
        let unused = dir.path().join("not-yet-created");
        assert_eq!(persisted_params(&unused).unwrap(), None);
    }
}
