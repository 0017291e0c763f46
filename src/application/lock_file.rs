//! Guard around the workspace lock file.
//!
//! The dependency manager rewrites `pnpm-lock.yaml` whenever it links or
//! reinstalls a package. Every mutating action checks the file is committed
//! before it starts and restores it right after the dependency manager ran.

use anyhow::Result;
use log::debug;

use crate::error::DepdevError;
use crate::process::CommandRunner;
use crate::runtime::Runtime;
use crate::vcs::Git;
use crate::workspace::Workspace;

pub struct LockFileGuard<'a, R: Runtime, C: CommandRunner> {
    runtime: &'a R,
    git: &'a Git<'a, C>,
    workspace: &'a Workspace,
}

impl<'a, R: Runtime, C: CommandRunner> LockFileGuard<'a, R, C> {
    pub fn new(runtime: &'a R, git: &'a Git<'a, C>, workspace: &'a Workspace) -> Self {
        Self {
            runtime,
            git,
            workspace,
        }
    }

    /// The lock file exists and has no uncommitted changes.
    pub async fn ensure_present_and_clean(&self) -> Result<()> {
        if !self.runtime.exists(&self.workspace.lock_file()) {
            return Err(DepdevError::LockFileMissing {
                root: self.workspace.root.clone(),
            }
            .into());
        }
        self.ensure_clean().await
    }

    pub async fn ensure_clean(&self) -> Result<()> {
        let lock_file = self.workspace.lock_file();
        if self
            .git
            .is_dirty(&self.workspace.root, Some(&lock_file))
            .await?
        {
            return Err(DepdevError::LockFileDirty { lock_file }.into());
        }
        Ok(())
    }

    /// Check out the committed lock file, then verify it is clean.
    pub async fn restore(&self) -> Result<()> {
        let lock_file = self.workspace.lock_file();
        debug!("Restoring {:?}", lock_file);
        self.git.checkout(&self.workspace.root, &lock_file).await?;
        self.ensure_clean().await
    }

    /// Run `action`, then restore the lock file whether or not it succeeded.
    ///
    /// An error from `action` takes precedence over an error from restoring.
    pub async fn restore_after<T, F>(&self, action: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let result = action.await;
        let restored = self.restore().await;
        let value = result?;
        restored?;
        Ok(value)
    }
}
