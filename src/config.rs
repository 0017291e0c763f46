//! Runtime configuration.
//!
//! A [`Config`] value is built once in `main` from CLI flags and environment
//! variables and handed to every operation. The optional `depdev.config.json`
//! file is read only by `postinstall`, via [`InlinedDependencies::find_and_load`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use log::debug;
use serde::Deserialize;

use crate::error::DepdevError;
use crate::runtime::Runtime;

pub const CONFIG_FILE_NAME: &str = "depdev.config.json";
pub const DEFAULT_CLONE_BASE: &str = "git@github.com:";
pub const DEFAULT_PACKAGE_MANAGER: &str = "pnpm";

/// Time budget of each subprocess kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// `git status` and `git checkout`
    pub quick: Duration,
    pub clone: Duration,
    pub fetch: Duration,
    pub merge: Duration,
    /// `<pm> link` and `<pm> install`, which may install the clone's own dependencies
    pub install: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            quick: Duration::from_secs(5),
            clone: Duration::from_secs(15),
            fetch: Duration::from_secs(15),
            merge: Duration::from_secs(5),
            install: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix joined with `<owner>/<repo>` to form the clone URL.
    pub clone_base: String,
    /// Dependency manager executable (`pnpm`).
    pub package_manager: String,
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clone_base: DEFAULT_CLONE_BASE.to_string(),
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    pub fn new(clone_base: Option<String>, package_manager: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            clone_base: clone_base
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.clone_base),
            package_manager: package_manager
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.package_manager),
            timeouts: defaults.timeouts,
        }
    }

    /// Clone URL for `owner/repo`.
    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        format!("{}{}/{}", self.clone_base, owner, repo)
    }
}

/// Contents of `depdev.config.json`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InlinedDependencies {
    #[serde(default)]
    pub inlined_dependencies: Option<Vec<String>>,
}

impl InlinedDependencies {
    /// Find `depdev.config.json` from `start` upward and parse it.
    #[tracing::instrument(skip(runtime))]
    pub fn find_and_load<R: Runtime>(runtime: &R, start: &Path) -> Result<(PathBuf, Self)> {
        let path = find_config_file(runtime, start).ok_or_else(|| DepdevError::ConfigNotFound {
            file_name: CONFIG_FILE_NAME,
            start: start.to_path_buf(),
        })?;
        debug!("Loading config from {:?}", path);
        let content = runtime.read_to_string(&path)?;
        let parsed = Self::parse(&path, &content)?;
        Ok((path, parsed))
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            DepdevError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!(
                    "should be an object whose `inlinedDependencies` is a list of strings ({})",
                    e
                ),
            }
            .into()
        })
    }

    pub fn entries(&self) -> &[String] {
        self.inlined_dependencies.as_deref().unwrap_or_default()
    }
}

fn find_config_file<R: Runtime>(runtime: &R, start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| runtime.exists(candidate))
}
