//! Git operations used by the link and clear actions.

use std::path::Path;

use anyhow::Result;
use log::debug;

use crate::config::Timeouts;
use crate::process::{CommandRunner, CommandSpec};

const GIT: &str = "git";

pub struct Git<'a, C: CommandRunner> {
    runner: &'a C,
    timeouts: &'a Timeouts,
}

impl<'a, C: CommandRunner> Git<'a, C> {
    pub fn new(runner: &'a C, timeouts: &'a Timeouts) -> Self {
        Self { runner, timeouts }
    }

    /// Whether `path` (or the whole working copy when `None`) has uncommitted changes.
    pub async fn is_dirty(&self, cwd: &Path, path: Option<&Path>) -> Result<bool> {
        let mut args = vec!["status".to_string(), "--porcelain".to_string()];
        if let Some(path) = path {
            args.push(path.to_string_lossy().into_owned());
        }
        let stdout = self
            .runner
            .run(&CommandSpec::new(GIT, args, cwd, self.timeouts.quick))
            .await?;
        let dirty = !stdout.trim().is_empty();
        debug!("git status in {:?} ({:?}): dirty={}", cwd, path, dirty);
        Ok(dirty)
    }

    /// `git clone <url> <dir_name>` inside `parent`.
    pub async fn clone_repo(&self, url: &str, parent: &Path, dir_name: &str) -> Result<String> {
        self.runner
            .run(&CommandSpec::new(
                GIT,
                ["clone", url, dir_name],
                parent,
                self.timeouts.clone,
            ))
            .await
    }

    pub async fn fetch(&self, cwd: &Path) -> Result<String> {
        self.runner
            .run(&CommandSpec::new(GIT, ["fetch"], cwd, self.timeouts.fetch))
            .await
    }

    pub async fn merge(&self, cwd: &Path) -> Result<String> {
        self.runner
            .run(&CommandSpec::new(GIT, ["merge"], cwd, self.timeouts.merge))
            .await
    }

    /// Restore `path` to its committed content.
    pub async fn checkout(&self, cwd: &Path, path: &Path) -> Result<String> {
        let path = path.to_string_lossy().into_owned();
        self.runner
            .run(&CommandSpec::new(
                GIT,
                vec!["checkout".to_string(), "--".to_string(), path],
                cwd,
                self.timeouts.quick,
            ))
            .await
    }
}
