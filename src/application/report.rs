//! Version reporter: declared range versus the clone's version.

use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::error::DepdevError;
use crate::package::Manifest;
use crate::runtime::Runtime;

/// Descriptive only: a mismatch is shown, never judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    pub package: String,
    /// Range declared in the project's `package.json`, e.g. `^1.2.0`.
    pub declared: String,
    /// `version` of the clone's `package.json`.
    pub latest: String,
}

impl VersionReport {
    #[tracing::instrument(skip(runtime, project_manifest))]
    pub fn collect<R: Runtime>(
        runtime: &R,
        project_manifest: &Manifest,
        package: &str,
        clone_dir: &Path,
        manifest_path: &Path,
    ) -> Result<Self> {
        let declared = project_manifest.declared_range(package).ok_or_else(|| {
            DepdevError::DependencyNotDeclared {
                package: package.to_string(),
                manifest: manifest_path.to_path_buf(),
            }
        })?;

        let clone_manifest = Manifest::load(runtime, &clone_dir.join("package.json"))?;
        let latest = clone_manifest
            .version_str()
            .ok_or_else(|| DepdevError::CloneVersionMissing {
                clone_dir: clone_dir.to_path_buf(),
            })?;

        Ok(Self {
            package: package.to_string(),
            declared: declared.to_string(),
            latest: latest.to_string(),
        })
    }
}

impl fmt::Display for VersionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current semver: {}@{}", self.package, self.declared)?;
        write!(f, "Latest version: {}@{}", self.package, self.latest)
    }
}
