use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use cdb_store::{ContentHash, Index};

use crate::args::Backend;
use crate::error::CliError;

/// Reconstructs a backup from `dest` and writes it to `out`, or to stdout
/// when `out` is `None`.
///
/// `tag_or_index` is tried as an [`IndexId`](cdb_store::IndexId) first (a
/// 40-character hex string); any other shape is treated as a tag name bound
/// to the store's current index for that tag. The file backend has no
/// id-addressed index namespace of its own (an `.idx` document is only ever
/// named after its tag), so a hex-looking argument there is still resolved
/// as a tag name.
pub fn restore<Out: Write>(
    backend: Option<Backend>,
    dest: &Path,
    tag_or_index: &str,
    out: Option<&Path>,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let backend = backend.unwrap_or_else(|| Backend::infer(dest));
    let explicit_id: Option<ContentHash> = tag_or_index.parse().ok();
    let mut sink: Box<dyn Write + '_> = match out {
        Some(path) => Box::new(File::create(path).map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })?),
        None => Box::new(&mut *stdout),
    };

    let copied = match backend {
        Backend::File => {
            let loaded = cdb_file_sink::load_index(dest, tag_or_index)?;
            let mut index = Index::new(tag_or_index, 0);
            index.chunk_ids = loaded.chunk_ids;
            let resolver = cdb_file_sink::FileResolver::new(dest);
            let mut reader = cdb_store::IndexReader::new(&index, &resolver);
            io::copy(&mut reader, &mut sink)
        }
        Backend::Kv => {
            let db = sled::open(dest)?;
            let index = match explicit_id {
                Some(id) => cdb_kv_sink::load_index(&db, &id)?,
                None => cdb_kv_sink::load_tag(&db, tag_or_index)?,
            };
            let resolver = cdb_kv_sink::KvResolver::new(db);
            let mut reader = cdb_store::IndexReader::new(&index, &resolver);
            io::copy(&mut reader, &mut sink)
        }
        Backend::Sql => {
            let conn = cdb_sql_sink::open(dest)?;
            let loaded = match explicit_id {
                Some(id) => {
                    let fid = cdb_sql_sink::find_by_full_hash(&conn, &id)?
                        .ok_or_else(|| cdb_sql_sink::SqlSinkError::NotFound(id.to_string()))?;
                    cdb_sql_sink::load_by_fid(&conn, fid)?
                }
                None => cdb_sql_sink::load_latest(&conn, tag_or_index)?,
            };
            let mut index = Index::new(tag_or_index, 0);
            index.chunk_ids = loaded.chunk_ids;
            let resolver = cdb_sql_sink::SqlResolver::new(&conn);
            let mut reader = cdb_store::IndexReader::new(&index, &resolver);
            io::copy(&mut reader, &mut sink)
        }
    }
    .map_err(|source| CliError::Output {
        path: out.map_or_else(|| Path::new("<stdout>").to_path_buf(), Path::to_path_buf),
        source,
    })?;

    tracing::info!(tag_or_index, bytes = copied, "restored");
    Ok(())
}
