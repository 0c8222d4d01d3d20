//! Large-value splitting, isolated from the rest of the sink so the
//! underlying key-value engine can be swapped for one that accepts large
//! values natively without touching callers.
//!
//! A value larger than [`MAX_VALUE_LEN`] is split across `key`, then
//! continuation keys formed by *appending* a trailing byte `0x01` to `key`
//! and incrementing that trailing byte up to `0xFF`, at which point a
//! further `0x01` byte is appended on top. The original `key` itself is
//! never mutated, only ever extended, so a continuation key can never
//! collide with another chunk's own (unsuffixed) identifier. The terminal
//! fragment is recognized either by being shorter than `MAX_VALUE_LEN` or by
//! the next continuation key being absent entirely.

use sled::Db;

use crate::error::KvSinkError;

/// Maximum number of bytes stored directly under one key before a value is
/// split across continuation keys.
pub const MAX_VALUE_LEN: usize = 65_786;

/// Forms the first continuation key after `key`, mirroring the reference
/// implementation's `currkey := append(key, 1)`: a brand new trailing byte
/// is appended, `key`'s own bytes are left untouched.
fn first_continuation_key(key: &[u8]) -> Vec<u8> {
    let mut next = key.to_vec();
    next.push(0x01);
    next
}

/// Advances a continuation key produced by [`first_continuation_key`] to
/// the next one in sequence: increments the trailing suffix byte, or
/// appends a fresh `0x01` byte once the suffix byte overflows past `0xFF`.
/// Only ever touches bytes beyond the original key, never the key itself.
fn next_key(key: &mut Vec<u8>) {
    match key.last_mut() {
        Some(last) if *last < 0xFF => *last += 1,
        _ => key.push(0x01),
    }
}

/// Writes `val` under `key`, splitting across continuation keys if it
/// exceeds [`MAX_VALUE_LEN`]. Conditional: if `key` already holds a value,
/// no write occurs (at-most-once insertion).
pub fn write_large(db: &Db, key: &[u8], val: &[u8]) -> Result<(), KvSinkError> {
    if val.len() <= MAX_VALUE_LEN {
        let _ = db.compare_and_swap(key, None::<&[u8]>, Some(val))?;
        return Ok(());
    }

    let first_written = db
        .compare_and_swap(key, None::<&[u8]>, Some(&val[..MAX_VALUE_LEN]))?
        .is_ok();
    if !first_written {
        return Ok(());
    }

    let mut currkey = first_continuation_key(key);
    let mut i = MAX_VALUE_LEN;
    while i < val.len() - MAX_VALUE_LEN {
        db.insert(currkey.as_slice(), &val[i..i + MAX_VALUE_LEN])?;
        next_key(&mut currkey);
        i += MAX_VALUE_LEN;
    }
    db.insert(currkey.as_slice(), &val[i..])?;
    Ok(())
}

/// Reads the value previously written under `key` by [`write_large`],
/// reassembling continuation fragments in order. Returns `Ok(None)` if `key`
/// is absent.
pub fn read_large(db: &Db, key: &[u8]) -> Result<Option<Vec<u8>>, KvSinkError> {
    let Some(first) = db.get(key)? else {
        return Ok(None);
    };
    if first.len() < MAX_VALUE_LEN {
        return Ok(Some(first.to_vec()));
    }

    let mut out = first.to_vec();
    let mut currkey = first_continuation_key(key);
    loop {
        match db.get(currkey.as_slice())? {
            Some(frag) => {
                out.extend_from_slice(&frag);
                if frag.len() < MAX_VALUE_LEN {
                    break;
                }
                next_key(&mut currkey);
            }
            None => break,
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn small_value_round_trips() {
        let (_dir, db) = open_temp_db();
        write_large(&db, b"key", b"hello").unwrap();
        assert_eq!(read_large(&db, b"key").unwrap().unwrap(), b"hello");
    }

    #[test]
    fn missing_key_reads_as_none() {
        let (_dir, db) = open_temp_db();
        assert!(read_large(&db, b"nope").unwrap().is_none());
    }

    #[test]
    fn value_spanning_multiple_fragments_round_trips() {
        let (_dir, db) = open_temp_db();
        let val: Vec<u8> = (0..(MAX_VALUE_LEN * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        write_large(&db, b"big", &val).unwrap();
        assert_eq!(read_large(&db, b"big").unwrap().unwrap(), val);
    }

    #[test]
    fn value_exactly_one_boundary_round_trips() {
        let (_dir, db) = open_temp_db();
        let val = vec![7u8; MAX_VALUE_LEN * 2];
        write_large(&db, b"edge", &val).unwrap();
        assert_eq!(read_large(&db, b"edge").unwrap().unwrap(), val);
    }

    #[test]
    fn second_write_under_the_same_key_does_not_overwrite() {
        let (_dir, db) = open_temp_db();
        write_large(&db, b"key", b"first").unwrap();
        write_large(&db, b"key", b"second").unwrap();
        assert_eq!(read_large(&db, b"key").unwrap().unwrap(), b"first");
    }

    #[test]
    fn first_continuation_key_appends_rather_than_mutates() {
        let key = vec![0xFFu8, 0x7A];
        let next = first_continuation_key(&key);
        assert_eq!(next, vec![0xFF, 0x7A, 0x01]);
    }

    #[test]
    fn continuation_key_byte_increments_past_single_byte_on_overflow() {
        let mut key = vec![0xFFu8];
        next_key(&mut key);
        assert_eq!(key, vec![0xFF, 0x01]);

        let mut key2 = vec![0x01u8];
        next_key(&mut key2);
        assert_eq!(key2, vec![0x02]);
    }

    #[test]
    fn large_value_does_not_corrupt_a_key_equal_to_its_own_incremented_base() {
        // Regression test: continuation keys must be formed by *appending* a
        // suffix byte, never by incrementing the base key's own trailing
        // byte in place. A base key `[..., 0x05]` has an unrelated chunk
        // whose own identifier is `[..., 0x06]`; writing a large value under
        // the first key must not disturb the second key's value.
        let (_dir, db) = open_temp_db();
        let base = vec![1u8, 2, 3, 0x05];
        let collider = vec![1u8, 2, 3, 0x06];
        db.insert(collider.as_slice(), b"untouched".as_slice()).unwrap();

        let val: Vec<u8> = (0..(MAX_VALUE_LEN * 2 + 11)).map(|i| (i % 251) as u8).collect();
        write_large(&db, &base, &val).unwrap();

        assert_eq!(read_large(&db, &base).unwrap().unwrap(), val);
        assert_eq!(
            db.get(collider.as_slice()).unwrap().unwrap().to_vec(),
            b"untouched".to_vec()
        );
    }

    #[test]
    fn continuation_keys_are_longer_than_the_base_key() {
        let (_dir, db) = open_temp_db();
        let key = vec![0xAAu8; 20];
        let val: Vec<u8> = (0..(MAX_VALUE_LEN * 2 + 11)).map(|i| (i % 251) as u8).collect();
        write_large(&db, &key, &val).unwrap();

        let second_fragment_key = first_continuation_key(&key);
        assert_eq!(second_fragment_key.len(), key.len() + 1);
        assert!(db.get(second_fragment_key.as_slice()).unwrap().is_some());
    }
}
