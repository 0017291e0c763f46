use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DepdevError;
use crate::runtime::Runtime;

/// The subset of `package.json` this tool reads.
///
/// `repository` and `version` stay raw so that a present-but-wrong value is
/// reported as a missing field rather than a parse failure.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub repository: Option<Value>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            DepdevError::ManifestParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Declared semver range of `package`, runtime dependencies first.
    pub fn declared_range(&self, package: &str) -> Option<&str> {
        self.dependencies
            .get(package)
            .or_else(|| self.dev_dependencies.get(package))
            .map(String::as_str)
    }

    pub fn repository_str(&self) -> Option<&str> {
        self.repository.as_ref().and_then(Value::as_str)
    }

    pub fn version_str(&self) -> Option<&str> {
        self.version.as_ref().and_then(Value::as_str)
    }
}

/// Locate the `package.json` of an installed package.
///
/// Walks from `start` toward the filesystem root and returns the first
/// `<dir>/node_modules/<package>/package.json` that exists. Entry points and
/// `exports` maps are never consulted.
#[tracing::instrument(skip(runtime))]
pub fn resolve_installed_manifest<R: Runtime>(
    runtime: &R,
    start: &Path,
    package: &str,
) -> Result<PathBuf> {
    for dir in start.ancestors() {
        let candidate = package
            .split('/')
            .fold(dir.join("node_modules"), |path, part| path.join(part))
            .join("package.json");
        if runtime.exists(&candidate) {
            debug!("Resolved manifest of {} at {:?}", package, candidate);
            return Ok(candidate);
        }
    }
    Err(DepdevError::PackageNotInstalled {
        package: package.to_string(),
        start: start.to_path_buf(),
    }
    .into())
}
