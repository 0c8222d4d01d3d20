use cdb_store::{RollingParams, StoreError};
use sled::Db;

use crate::error::KvSinkError;

const PARAMS_KEY: &str = "params";

/// Reads the persisted [`RollingParams`] from `db`, if a store was already
/// created there.
///
/// # Errors
///
/// Returns a decoding error if the stored record is malformed.
pub fn persisted_params(db: &Db) -> Result<Option<RollingParams>, KvSinkError> {
    match db.get(PARAMS_KEY)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Persists `params` the first time a store is opened, or verifies that a
/// previously persisted set of parameters matches `params` on every
/// subsequent open.
///
/// # Errors
///
/// Returns [`KvSinkError::Store`] wrapping [`StoreError::ParamMismatch`] if
/// `params` disagrees with what the store was created with.
pub fn check_params(db: &Db, params: &RollingParams) -> Result<(), KvSinkError> {
    match persisted_params(db)? {
        Some(persisted) if persisted == *params => Ok(()),
        Some(persisted) => Err(KvSinkError::Store(StoreError::ParamMismatch {
            requested: *params,
            persisted,
        })),
        None => persist_params(db, params),
    }
}

/// Unconditionally overwrites the persisted parameters. Callers should
/// normally use [`check_params`] instead; this is exposed for store
/// initialization tooling.
///
/// # Errors
///
/// Returns a encoding or database error.
pub fn persist_params(db: &Db, params: &RollingParams) -> Result<(), KvSinkError> {
    let bytes = serde_json::to_vec(params)?;
    db.insert(PARAMS_KEY, bytes)?;
    Ok(())
}
