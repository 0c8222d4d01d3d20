use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Content-defined deduplicating backup.
#[derive(Parser, Debug)]
#[command(name = "cdb", version, about, long_about = None)]
pub struct Cli {
    /// Repeat for more detail: `-v` for info, `-vv` for debug, `-vvv` for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress all logging except fatal errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Which backend a `--dest` path refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    /// A plain directory: one file per chunk, one `.idx` file per backup.
    File,
    /// A `sled` embedded key-value database.
    Kv,
    /// A SQLite database.
    Sql,
}

impl Backend {
    /// Infers a backend from the shape of `dest` when `--backend` was not
    /// given explicitly: a `.db`/`.sqlite`/`.sqlite3` extension selects the
    /// relational backend, and everything else is treated as a directory.
    ///
    /// Both the directory and `sled` backends store their state under an
    /// ordinary directory, so inference cannot tell them apart by shape
    /// alone; when in doubt this resolves to the directory backend, and a
    /// `sled` destination must be named with `--backend kv` explicitly.
    #[must_use]
    pub fn infer(dest: &std::path::Path) -> Self {
        match dest.extension().and_then(|ext| ext.to_str()) {
            Some("db" | "sqlite" | "sqlite3") => Self::Sql,
            _ => Self::File,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split one or more files into content-defined chunks and store them.
    ///
    /// Each input is backed up under a tag equal to its absolute path (the
    /// directory backend instead names the backup after the input's file
    /// name, since its index file name cannot contain path separators).
    Archive {
        /// Which kind of store `--dest` points at; inferred from `--dest`'s
        /// extension when omitted (see [`Backend::infer`]).
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Destination store (a directory, a `sled` database path, or a
        /// SQLite database file, depending on `--backend`).
        #[arg(long)]
        dest: PathBuf,

        /// Files to back up.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Reconstruct a previously archived file from a store.
    Restore {
        /// Which kind of store `--dest` points at; inferred when omitted.
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Store to read from.
        #[arg(long)]
        dest: PathBuf,

        /// Tag (absolute path, or file name for the directory backend) the
        /// backup was written under, or an explicit 40-character hex index
        /// identifier (kv and sql backends only).
        tag: String,

        /// Where to write the reconstructed bytes. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the tags recorded in a store whose name starts with `prefix`.
    List {
        /// Which kind of store `--dest` points at; inferred when omitted.
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Store to scan.
        #[arg(long)]
        dest: PathBuf,

        /// Only tags starting with this string are printed. An empty
        /// string lists every tag.
        #[arg(long, default_value = "")]
        prefix: String,
    },
}
