use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use log::debug;

use super::manifest::{Manifest, resolve_installed_manifest};
use crate::error::DepdevError;
use crate::runtime::Runtime;

const REPOSITORY_PREFIXES: [&str; 2] = ["https://github.com/", "github:"];

/// Upstream GitHub repository of a dependency.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for GitHubRepo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            Err(anyhow!("Invalid repository format. Expected 'owner/repo'."))
        } else {
            Ok(GitHubRepo {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

impl GitHubRepo {
    /// Parse a `package.json#repository` value of `package`.
    ///
    /// Accepts `https://github.com/<owner>/<repo>` and `github:<owner>/<repo>`.
    pub fn from_repository_field(repository: &str, package: &str) -> Result<Self> {
        let unsupported = || DepdevError::UnsupportedRepositoryFormat {
            package: package.to_string(),
            repository: repository.to_string(),
        };

        let repo_path = REPOSITORY_PREFIXES
            .iter()
            .find_map(|prefix| repository.strip_prefix(prefix))
            .ok_or_else(unsupported)?;

        repo_path
            .parse::<GitHubRepo>()
            .map_err(|_| unsupported().into())
    }
}

/// Determine the upstream repository of an installed dependency from its manifest.
#[tracing::instrument(skip(runtime))]
pub fn locate<R: Runtime>(runtime: &R, project_dir: &Path, package: &str) -> Result<GitHubRepo> {
    let manifest_path = resolve_installed_manifest(runtime, project_dir, package)?;
    let manifest = Manifest::load(runtime, &manifest_path)?;
    let repository = manifest
        .repository_str()
        .ok_or_else(|| DepdevError::ManifestFieldMissing {
            package: package.to_string(),
            field: "repository",
        })?;
    let repo = GitHubRepo::from_repository_field(repository, package)?;
    debug!("{} is hosted at {}", package, repo);
    Ok(repo)
}
