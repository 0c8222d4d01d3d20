//! One module per subcommand, each a thin wrapper over the backend crates.

mod archive;
mod list;
mod restore;

pub use archive::archive;
pub use list::list;
pub use restore::restore;
