//! `package.json` access and upstream repository resolution.

mod manifest;
mod repository;

pub use manifest::{Manifest, resolve_installed_manifest};
pub use repository::{GitHubRepo, locate};
