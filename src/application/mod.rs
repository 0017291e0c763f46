//! Application layer - Use cases that coordinate git, the package manager and the filesystem.
//!
//! This layer contains the reconciliation rules and orchestrates the flow of
//! data between the CLI layer and the lower-level services.

mod clear;
mod link;
mod lock_file;
mod report;

pub use clear::{ClearAction, ClearOutcome};
pub use link::{CloneState, LinkAction, LinkOutcome};
pub use lock_file::LockFileGuard;
pub use report::VersionReport;

use std::path::Path;

use crate::runtime::{Runtime, is_path_under};

/// Whether `link` resolves to a path inside `dir`.
///
/// Both sides are canonicalized, so intermediate symlinks (such as a
/// symlinked home directory) do not matter. Unresolvable paths never match.
pub(crate) fn links_into<R: Runtime>(runtime: &R, link: &Path, dir: &Path) -> bool {
    match (runtime.canonicalize(link), runtime.canonicalize(dir)) {
        (Ok(resolved), Ok(dir)) => is_path_under(&resolved, &dir),
        _ => false,
    }
}
