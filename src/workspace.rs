//! Workspace layout: project directory, workspace root and lock file.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;

use crate::runtime::Runtime;

pub const WORKSPACE_MARKER: &str = "pnpm-workspace.yaml";
pub const LOCK_FILE_NAME: &str = "pnpm-lock.yaml";
pub const DEPS_DIR_NAME: &str = "deps";

/// Paths derived once per invocation and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory of the package whose `package.json` declares the dependency.
    pub project_dir: PathBuf,
    /// Directory holding the shared lock file.
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(project_dir: PathBuf, root: PathBuf) -> Self {
        Self { project_dir, root }
    }

    /// Discover the workspace from the process environment.
    ///
    /// The project directory is `INIT_CWD` (set by npm, Yarn and pnpm when running
    /// scripts) or the current directory.
    #[tracing::instrument(skip(runtime))]
    pub fn discover<R: Runtime>(runtime: &R) -> Result<Self> {
        let project_dir = match runtime.env_var("INIT_CWD") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => runtime.current_dir()?,
        };
        Ok(Self::from_project_dir(runtime, project_dir))
    }

    /// The workspace root is the nearest ancestor holding `pnpm-workspace.yaml`,
    /// or the project directory itself when there is none.
    pub fn from_project_dir<R: Runtime>(runtime: &R, project_dir: PathBuf) -> Self {
        let root = project_dir
            .ancestors()
            .find(|dir| runtime.exists(&dir.join(WORKSPACE_MARKER)))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dir.clone());
        debug!("Project dir {:?}, workspace root {:?}", project_dir, root);
        Self { project_dir, root }
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir.join("package.json")
    }

    pub fn deps_dir(&self) -> PathBuf {
        self.root.join(DEPS_DIR_NAME)
    }

    pub fn clone_dir(&self, repo: &str) -> PathBuf {
        self.deps_dir().join(repo)
    }

    pub fn node_modules(&self) -> PathBuf {
        self.project_dir.join("node_modules")
    }

    /// `node_modules/<package>`; scoped names become nested directories.
    pub fn managed_entry(&self, package: &str) -> PathBuf {
        package
            .split('/')
            .fold(self.node_modules(), |path, part| path.join(part))
    }
}
