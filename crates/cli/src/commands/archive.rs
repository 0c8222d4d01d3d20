use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use cdb_store::RollingParams;

use crate::args::Backend;
use crate::error::CliError;

/// Backs up every path in `inputs` under `dest`, using `backend` (or, when
/// `None`, [`Backend::infer`]) to decide how `dest` is interpreted.
///
/// Each input is tagged with its absolute path, except for the directory
/// backend, whose index file name is the input's file name instead (an
/// absolute path cannot name a single file on disk without reintroducing
/// the directory structure the backend intentionally flattens away).
pub fn archive<Out: Write>(
    backend: Option<Backend>,
    dest: &Path,
    inputs: &[PathBuf],
    params: &RollingParams,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let backend = backend.unwrap_or_else(|| Backend::infer(dest));

    // Each backend opens its destination once and keeps it open across
    // every input: the directory backend re-opens per input anyway (a
    // `FileSink` is just a path plus a file name), but `sled` and sqlite
    // connections are expensive enough to open that they are shared here.
    match backend {
        Backend::File => {
            cdb_file_sink::check_params(dest, params)?;
            for input in inputs {
                let (abs, file) = open_input(input)?;
                let name = abs
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| abs.to_string_lossy().into_owned());
                let sink = cdb_file_sink::FileSink::create(dest, name)?;
                let id = cdb_splitter::split(file, params, sink)
                    .map_err(|e| CliError::Split(e.to_string()))?;
                report(stdout, &id, &abs)?;
            }
        }
        Backend::Kv => {
            let db = sled::open(dest)?;
            cdb_kv_sink::check_params(&db, params)?;
            for input in inputs {
                let (abs, file) = open_input(input)?;
                let tag = abs.to_string_lossy().into_owned();
                let sink = cdb_kv_sink::KvSink::new(db.clone(), tag);
                let id = cdb_splitter::split(file, params, sink)
                    .map_err(|e| CliError::Split(e.to_string()))?;
                report(stdout, &id, &abs)?;
            }
        }
        Backend::Sql => {
            cdb_sql_sink::check_params(&cdb_sql_sink::open(dest)?, params)?;
            for input in inputs {
                let (abs, file) = open_input(input)?;
                let conn = cdb_sql_sink::open(dest)?;
                let label = abs.to_string_lossy().into_owned();
                let sink = cdb_sql_sink::SqlSink::create(conn, label)?;
                let id = cdb_splitter::split(file, params, sink)
                    .map_err(|e| CliError::Split(e.to_string()))?;
                report(stdout, &id, &abs)?;
            }
        }
    }
    Ok(())
}

fn open_input(input: &Path) -> Result<(PathBuf, File), CliError> {
    let abs = input.canonicalize().map_err(|source| CliError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let file = File::open(&abs).map_err(|source| CliError::Input {
        path: abs.clone(),
        source,
    })?;
    Ok((abs, file))
}

fn report<Out: Write>(stdout: &mut Out, id: &cdb_store::IndexId, abs: &Path) -> Result<(), CliError> {
    writeln!(stdout, "{id} {}", abs.display()).map_err(|source| CliError::Output {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    tracing::info!(path = %abs.display(), index = %id, "archived");
    Ok(())
}
