use std::io::Write;
use std::path::{Path, PathBuf};

use crate::args::Backend;
use crate::error::CliError;

/// Prints every tag recorded in `dest` whose name starts with `prefix`,
/// one per line, in sorted order.
pub fn list<Out: Write>(
    backend: Option<Backend>,
    dest: &Path,
    prefix: &str,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let backend = backend.unwrap_or_else(|| Backend::infer(dest));
    let tags = match backend {
        Backend::File => cdb_file_sink::list_names(dest)?
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect(),
        Backend::Kv => {
            let db = sled::open(dest)?;
            cdb_kv_sink::list_tags(&db, prefix)?
        }
        Backend::Sql => {
            let conn = cdb_sql_sink::open(dest)?;
            cdb_sql_sink::list_labels(&conn, prefix)?
        }
    };

    for tag in tags {
        writeln!(stdout, "{tag}").map_err(|source| CliError::Output {
            path: PathBuf::from("<stdout>"),
            source,
        })?;
    }
    Ok(())
}
