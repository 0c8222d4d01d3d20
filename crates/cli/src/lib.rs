#![deny(unsafe_code)]
#![deny(missing_docs)]
//! # Overview
//!
//! `cdb_cli` is the command-line front-end over the content-defined
//! deduplicating backup store: it recognises three subcommands (`archive`,
//! `restore`, `list`), each available against any of the three backends
//! (`file`, `kv`, `sql`), and delegates the actual splitting, storing and
//! reconstructing work to `cdb-splitter` and the three backend crates.
//!
//! # Design
//!
//! The crate exposes [`run`] as its primary entry point, mirroring the
//! split between argument parsing and execution used throughout this
//! workspace: [`run`] never panics on malformed input, and every I/O or
//! backend failure is rendered as a one-line diagnostic on the caller's
//! error handle before a non-zero exit code is returned.
//!
//! # Invariants
//!
//! - `run` returns `0` only when every requested operation succeeded.
//! - A malformed command line never reaches the backend crates; `clap`
//!   rejects it first and `run` returns `clap`'s own suggested exit code.
//!
//! # Errors
//!
//! Backend failures are reported through [`error::CliError`], whose
//! `Display` implementation is written to the caller's stderr handle
//! verbatim.
//!
//! # Examples
//!
//! ```
//! use cdb_cli::run;
//!
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = run(["cdb", "--help"], &mut stdout, &mut stderr);
//! assert_eq!(status, 0);
//! assert!(!stdout.is_empty());
//! ```
//!
//! # See also
//!
//! - `bin/cdb` for the thin binary crate that wires [`run`] into `main`.

mod args;
mod commands;
mod error;

pub use error::CliError;

use std::ffi::OsString;
use std::io::Write;

use clap::Parser;

use args::{Cli, Command};
use cdb_store::RollingParams;

/// Maximum value representable by [`std::process::ExitCode`].
const MAX_EXIT_CODE: i32 = 255;

/// Parses `arguments` and executes the requested subcommand, writing normal
/// output to `stdout` and diagnostics to `stderr`.
///
/// Returns `0` on success and a positive value otherwise: a `clap`-supplied
/// code for a malformed command line, or `1` if parsing succeeded but the
/// operation itself failed.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let cli = match Cli::try_parse_from(arguments) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = write!(stdout, "{e}");
            } else {
                let _ = write!(stderr, "{e}");
            }
            return e.exit_code();
        }
    };

    init_logging(cli.verbose, cli.quiet);

    let params = RollingParams::reference();
    let result = match cli.command {
        Command::Archive { backend, dest, inputs } => {
            commands::archive(backend, &dest, &inputs, &params, stdout)
        }
        Command::Restore { backend, dest, tag, out } => {
            commands::restore(backend, &dest, &tag, out.as_deref(), stdout)
        }
        Command::List { backend, dest, prefix } => commands::list(backend, &dest, &prefix, stdout),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(stderr, "cdb: {e}");
            1
        }
    }
}

/// Converts a numeric exit status into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_flag_reports_success() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["cdb", "--help"], &mut stdout, &mut stderr);
        assert_eq!(status, 0);
        assert!(!stdout.is_empty());
    }

    #[test]
    fn missing_subcommand_is_a_usage_error() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["cdb"], &mut stdout, &mut stderr);
        assert_ne!(status, 0);
        assert!(!stderr.is_empty());
    }

    #[test]
    fn round_trips_a_file_through_the_inferred_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("store");
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"hello, world").unwrap();
        let output = dir.path().join("output.txt");

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "archive".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                input.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "restore".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                "input.txt".to_string(),
                "--out".to_string(),
                output.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));

        assert_eq!(std::fs::read(&output).unwrap(), b"hello, world");
    }

    #[test]
    fn restore_without_out_writes_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("store");
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"hello").unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        run(
            [
                "cdb".to_string(),
                "archive".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                input.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "restore".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                "input.txt".to_string(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        assert_eq!(stdout, b"hello");
    }

    #[test]
    fn list_reports_archived_tags() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("store");
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"hello").unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        run(
            [
                "cdb".to_string(),
                "archive".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                input.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "list".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        assert_eq!(String::from_utf8(stdout).unwrap().trim(), "input.txt");
    }

    #[test]
    fn explicit_backend_overrides_inference() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("store.db");
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"hello").unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "archive".to_string(),
                "--backend".to_string(),
                "file".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                input.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        assert!(dest.join("input.txt.idx").exists());
    }

    #[test]
    fn restore_accepts_an_explicit_index_id_against_the_kv_backend() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("store");
        let input = dir.path().join("input.txt");
        std::fs::write(&input, b"hello, world").unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "archive".to_string(),
                "--backend".to_string(),
                "kv".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                input.to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        let index_id = String::from_utf8(stdout)
            .unwrap()
            .split_whitespace()
            .next()
            .unwrap()
            .to_string();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "cdb".to_string(),
                "restore".to_string(),
                "--backend".to_string(),
                "kv".to_string(),
                "--dest".to_string(),
                dest.to_string_lossy().into_owned(),
                index_id,
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        assert_eq!(stdout, b"hello, world");
    }
}
