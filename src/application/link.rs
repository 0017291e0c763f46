//! Link action - the reconciliation from a package name to a linked clone.
//!
//! Given a dependency of the current project, this module:
//! - checks the dependency is declared and the lock file is committed
//! - clones its upstream repository into `deps/<repo>`, or updates an existing clean clone
//! - has the dependency manager link `node_modules/<package>` to the clone
//! - restores the lock file the dependency manager rewrote
//!
//! Every step can be re-run; a second invocation converges on the same state.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use log::{debug, info, warn};

use super::links_into;
use super::lock_file::LockFileGuard;
use super::report::VersionReport;
use crate::config::Config;
use crate::error::DepdevError;
use crate::package::{GitHubRepo, Manifest, locate};
use crate::process::{CommandError, CommandRunner, CommandSpec};
use crate::runtime::{Runtime, relative_display};
use crate::vcs::Git;
use crate::workspace::Workspace;

/// What happened to the clone during a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneState {
    /// The clone did not exist and was created.
    Cloned,
    /// The clone was clean and upstream changes were fetched and merged.
    Updated,
    /// The clone has uncommitted changes and was left alone.
    SkippedDirty,
}

/// Result of a link operation
#[derive(Debug)]
pub struct LinkOutcome {
    /// `node_modules/<package>` of the project
    pub entry: PathBuf,
    /// The raw symlink target as stored on disk
    pub link_target: PathBuf,
    /// The symlink target as an absolute path
    pub resolved_target: PathBuf,
    pub clone_dir: PathBuf,
    pub clone_state: CloneState,
    /// Whether the dependency manager's link command ran
    pub relinked: bool,
    pub report: VersionReport,
}

impl LinkOutcome {
    /// Human readable summary, with the entry shown relative to `project_dir`.
    pub fn display<'a>(&'a self, project_dir: &'a Path) -> impl fmt::Display + 'a {
        OutcomeDisplay {
            outcome: self,
            project_dir,
        }
    }
}

struct OutcomeDisplay<'a> {
    outcome: &'a LinkOutcome,
    project_dir: &'a Path,
}

impl fmt::Display for OutcomeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.outcome;
        writeln!(
            f,
            "Symlink: {} -> {} ({} -> {})",
            relative_display(self.project_dir, &o.entry).display(),
            o.link_target.display(),
            o.entry.display(),
            o.resolved_target.display()
        )?;
        write!(f, "{}", o.report)
    }
}

/// Link action - replaces an installed dependency with a symlink to its clone
pub struct LinkAction<'a, R: Runtime, C: CommandRunner> {
    runtime: &'a R,
    runner: &'a C,
    config: &'a Config,
    workspace: &'a Workspace,
}

impl<'a, R: Runtime, C: CommandRunner> LinkAction<'a, R, C> {
    pub fn new(runtime: &'a R, runner: &'a C, config: &'a Config, workspace: &'a Workspace) -> Self {
        Self {
            runtime,
            runner,
            config,
            workspace,
        }
    }

    /// Link `package` to a clone of its upstream repository.
    ///
    /// Preconditions are checked before anything is touched, in this order:
    /// the package is declared in `package.json`, the lock file exists, the
    /// lock file has no uncommitted changes.
    #[tracing::instrument(skip(self))]
    pub async fn link(&self, package: &str) -> Result<LinkOutcome> {
        let manifest_path = self.workspace.manifest_path();
        let manifest = Manifest::load(self.runtime, &manifest_path)?;
        if manifest.declared_range(package).is_none() {
            return Err(DepdevError::DependencyNotDeclared {
                package: package.to_string(),
                manifest: manifest_path,
            }
            .into());
        }

        let git = Git::new(self.runner, &self.config.timeouts);
        let lock_file = LockFileGuard::new(self.runtime, &git, self.workspace);
        lock_file.ensure_present_and_clean().await?;

        let deps_dir = self.workspace.deps_dir();
        self.runtime.create_dir_all(&deps_dir)?;

        let repo = locate(self.runtime, &self.workspace.project_dir, package)?;
        let clone_dir = self.workspace.clone_dir(&repo.repo);

        let fresh_clone = !self.runtime.exists(&clone_dir);
        let clone_state = if fresh_clone {
            self.clone_repo(&git, &repo, &deps_dir, &clone_dir).await?;
            CloneState::Cloned
        } else {
            self.update_clone(&git, &clone_dir).await?
        };

        ensure!(
            self.runtime.is_dir(&clone_dir),
            "Clone directory {:?} does not exist after cloning {}",
            clone_dir,
            repo
        );
        // Cloning and merging never touch the workspace install state
        lock_file.ensure_clean().await?;

        let entry = self.workspace.managed_entry(package);
        // A fresh clone has no dependencies installed; the link command installs them.
        let relinked = fresh_clone || !self.is_linked(&entry, &clone_dir);
        if relinked {
            self.run_link(&lock_file, &clone_dir).await?;
            if !self.runtime.is_symlink(&entry) {
                return Err(DepdevError::LinkingFailed { entry }.into());
            }
            if !links_into(self.runtime, &entry, &clone_dir) {
                warn!("{:?} is a symlink but does not resolve into {:?}", entry, clone_dir);
            }
        } else {
            debug!("{:?} already links to {:?}", entry, clone_dir);
        }

        let link_target = self.runtime.read_link(&entry)?;
        let resolved_target = self.runtime.resolve_link(&entry)?;
        let report =
            VersionReport::collect(self.runtime, &manifest, package, &clone_dir, &manifest_path)?;

        Ok(LinkOutcome {
            entry,
            link_target,
            resolved_target,
            clone_dir,
            clone_state,
            relinked,
            report,
        })
    }

    async fn clone_repo(
        &self,
        git: &Git<'_, C>,
        repo: &GitHubRepo,
        deps_dir: &Path,
        clone_dir: &Path,
    ) -> Result<()> {
        let url = self.config.clone_url(&repo.owner, &repo.repo);
        info!("Cloning {} into {:?}", url, clone_dir);
        let Err(e) = git.clone_repo(&url, deps_dir, &repo.repo).await else {
            return Ok(());
        };
        Err(match e.downcast::<CommandError>() {
            Ok(source) if source.is_timeout() => DepdevError::CloneTimeout {
                url,
                dir: clone_dir.to_path_buf(),
                timeout: self.config.timeouts.clone,
                source,
            }
            .into(),
            Ok(source) => source.into(),
            Err(e) => e,
        })
    }

    /// Fetch and merge upstream changes unless the clone has local edits.
    async fn update_clone(&self, git: &Git<'_, C>, clone_dir: &Path) -> Result<CloneState> {
        if git.is_dirty(clone_dir, None).await? {
            eprintln!(
                "Warning: Uncommitted changes at {}, skipping update",
                clone_dir.display()
            );
            return Ok(CloneState::SkippedDirty);
        }

        info!("Updating {:?}", clone_dir);
        git.fetch(clone_dir).await?;
        if let Err(e) = git.merge(clone_dir).await {
            return Err(match e.downcast::<CommandError>() {
                Ok(source) if source.output().is_some() => DepdevError::MergeConflict {
                    dir: clone_dir.to_path_buf(),
                    source,
                }
                .into(),
                Ok(source) => source.into(),
                Err(e) => e,
            });
        }
        Ok(CloneState::Updated)
    }

    /// The entry is a symlink that resolves into the clone.
    ///
    /// pnpm keeps every installed package as a symlink into `node_modules/.pnpm`,
    /// so a plain `pnpm install` after a link leaves a symlink that no longer
    /// reaches the clone. Relinking then runs `pnpm link` against the clone even
    /// when the clone has uncommitted changes, and pnpm installs the clone's own
    /// dependencies into its `node_modules`. Tracked files of the clone are not
    /// touched.
    fn is_linked(&self, entry: &Path, clone_dir: &Path) -> bool {
        self.runtime.is_symlink(entry) && links_into(self.runtime, entry, clone_dir)
    }

    /// `<pm> link <clone>`, followed by restoring the lock file it rewrites.
    async fn run_link(&self, lock_file: &LockFileGuard<'_, R, C>, clone_dir: &Path) -> Result<()> {
        let spec = CommandSpec::new(
            &self.config.package_manager,
            vec!["link".to_string(), clone_dir.to_string_lossy().into_owned()],
            &self.workspace.project_dir,
            self.config.timeouts.install,
        );
        info!("Running `{}`", spec);
        lock_file
            .restore_after(async { self.runner.run(&spec).await.map(drop) })
            .await
    }
}
