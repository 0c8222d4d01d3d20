use cdb_store::{RollingParams, StoreError};
use rusqlite::{Connection, OptionalExtension};

use crate::error::SqlSinkError;

/// Reads the persisted [`RollingParams`] from `conn`, if a store was already
/// created there.
///
/// # Errors
///
/// Returns a decoding error if the stored record is malformed.
pub fn persisted_params(conn: &Connection) -> Result<Option<RollingParams>, SqlSinkError> {
    let json: Option<String> = conn
        .query_row("SELECT json FROM params WHERE id = 1;", [], |row| row.get(0))
        .optional()?;
    match json {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Persists `params` the first time a store is opened, or verifies that a
/// previously persisted set of parameters matches `params` on every
/// subsequent open.
///
/// # Errors
///
/// Returns [`SqlSinkError::Store`] wrapping [`StoreError::ParamMismatch`] if
/// `params` disagrees with what the store was created with.
pub fn check_params(conn: &Connection, params: &RollingParams) -> Result<(), SqlSinkError> {
    match persisted_params(conn)? {
        Some(persisted) if persisted == *params => Ok(()),
        Some(persisted) => Err(SqlSinkError::Store(StoreError::ParamMismatch {
            requested: *params,
            persisted,
        })),
        None => persist_params(conn, params),
    }
}

/// Unconditionally overwrites the persisted parameters. Callers should
/// normally use [`check_params`] instead; this is exposed for store
/// initialization tooling.
///
/// # Errors
///
/// Returns an encoding or database error.
pub fn persist_params(conn: &Connection, params: &RollingParams) -> Result<(), SqlSinkError> {
    let json = serde_json::to_string(params)?;
    conn.execute(
        "INSERT INTO params (id, json) VALUES (1, ?1) \
         ON CONFLICT (id) DO UPDATE SET json = excluded.json;",
        rusqlite::params![json],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::open(dir.path().join("store.db")).unwrap();
        (dir, conn)
    }

    #[test]
    fn first_open_persists_params() {
        let (_dir, conn) = open_temp();
        let params = RollingParams::reference();
        check_params(&conn, &params).unwrap();
        assert_eq!(persisted_params(&conn).unwrap(), Some(params));
    }

    #[test]
    fn matching_reopen_succeeds() {
        let (_dir, conn) = open_temp();
        let params = RollingParams::reference();
        check_params(&conn, &params).unwrap();
        check_params(&conn, &params).unwrap();
    }

    #[test]
    fn mismatched_reopen_is_rejected() {
        let (_dir, conn) = open_temp();
        check_params(&conn, &RollingParams::reference()).unwrap();
        let different = RollingParams {
            window_size: 128,
            ..RollingParams::reference()
        };
        let err = check_params(&conn, &different).unwrap_err();
        assert!(matches!(
            err,
            SqlSinkError::Store(StoreError::ParamMismatch { .. })
        ));
    }
}
