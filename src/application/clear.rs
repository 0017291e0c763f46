//! Clear action - undo links made by the link action.
//!
//! Symlinks from `node_modules` into `deps/` are removed and the package
//! manager reinstalls the published copies. Clones are left on disk.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info};

use super::links_into;
use super::lock_file::LockFileGuard;
use crate::config::Config;
use crate::error::DepdevError;
use crate::process::{CommandRunner, CommandSpec};
use crate::runtime::Runtime;
use crate::vcs::Git;
use crate::workspace::Workspace;

/// Result of a clear operation
#[derive(Debug, Default)]
pub struct ClearOutcome {
    /// Managed entries whose symlinks were removed
    pub removed: Vec<PathBuf>,
}

pub struct ClearAction<'a, R: Runtime, C: CommandRunner> {
    runtime: &'a R,
    runner: &'a C,
    config: &'a Config,
    workspace: &'a Workspace,
}

impl<'a, R: Runtime, C: CommandRunner> ClearAction<'a, R, C> {
    pub fn new(runtime: &'a R, runner: &'a C, config: &'a Config, workspace: &'a Workspace) -> Self {
        Self {
            runtime,
            runner,
            config,
            workspace,
        }
    }

    /// Remove the link of `package`, or of every linked dependency when `None`.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, package: Option<&str>) -> Result<ClearOutcome> {
        let git = Git::new(self.runner, &self.config.timeouts);
        let lock_file = LockFileGuard::new(self.runtime, &git, self.workspace);
        lock_file.ensure_present_and_clean().await?;

        let deps_dir = self.workspace.deps_dir();
        let entries = match package {
            Some(package) => {
                let entry = self.workspace.managed_entry(package);
                if !self.is_linked(&entry) {
                    return Err(DepdevError::NotLinked { entry, deps_dir }.into());
                }
                vec![entry]
            }
            None => self.find_linked_entries()?,
        };

        if entries.is_empty() {
            debug!("No symlinks into {:?}", deps_dir);
            return Ok(ClearOutcome::default());
        }

        for entry in &entries {
            info!("Removing symlink {:?}", entry);
            self.runtime.remove_symlink(entry)?;
        }

        let spec = CommandSpec::new(
            &self.config.package_manager,
            ["install"],
            &self.workspace.project_dir,
            self.config.timeouts.install,
        );
        info!("Running `{}`", spec);
        lock_file
            .restore_after(async { self.runner.run(&spec).await.map(drop) })
            .await?;

        Ok(ClearOutcome { removed: entries })
    }

    fn is_linked(&self, entry: &Path) -> bool {
        self.runtime.is_symlink(entry) && links_into(self.runtime, entry, &self.workspace.deps_dir())
    }

    /// `node_modules/*` and `node_modules/@scope/*` entries that link into `deps/`.
    fn find_linked_entries(&self) -> Result<Vec<PathBuf>> {
        let node_modules = self.workspace.node_modules();
        if !self.runtime.is_dir(&node_modules) {
            return Ok(Vec::new());
        }

        let mut linked = Vec::new();
        for entry in self.runtime.read_dir(&node_modules)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // .pnpm, .bin, .modules.yaml
            if name.starts_with('.') {
                continue;
            }
            if name.starts_with('@') && !self.runtime.is_symlink(&entry) {
                if self.runtime.is_dir(&entry) {
                    for scoped in self.runtime.read_dir(&entry)? {
                        if self.is_linked(&scoped) {
                            linked.push(scoped);
                        }
                    }
                }
                continue;
            }
            if self.is_linked(&entry) {
                linked.push(entry);
            }
        }
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockCommandRunner;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_workspace;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// node_modules layout: entry path -> canonical target (None for plain directories)
    fn mock_runtime(ws: &Workspace, layout: &[(PathBuf, Option<PathBuf>)]) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let layout: HashMap<PathBuf, Option<PathBuf>> = layout.iter().cloned().collect();
        let lock = ws.lock_file();
        let node_modules = ws.node_modules();

        runtime.expect_exists().returning(move |p| p == lock);
        {
            let (layout, node_modules) = (layout.clone(), node_modules.clone());
            runtime.expect_is_dir().returning(move |p| {
                p == node_modules || matches!(layout.get(p), Some(None))
            });
        }
        {
            let layout = layout.clone();
            runtime.expect_read_dir().returning(move |dir| {
                let mut children: Vec<PathBuf> = layout
                    .keys()
                    .filter(|p| p.parent() == Some(dir))
                    .cloned()
                    .collect();
                children.sort();
                Ok(children)
            });
        }
        {
            let layout = layout.clone();
            runtime
                .expect_is_symlink()
                .returning(move |p| matches!(layout.get(p), Some(Some(_))));
        }
        runtime.expect_canonicalize().returning(move |p| match layout.get(p) {
            Some(Some(target)) => Ok(target.clone()),
            _ => Ok(p.to_path_buf()),
        });
        runtime
    }

    fn recording_runner(commands: Arc<Mutex<Vec<String>>>) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |spec| {
            commands.lock().unwrap().push(spec.to_string());
            Ok(String::new())
        });
        runner
    }

    fn layout(ws: &Workspace) -> Vec<(PathBuf, Option<PathBuf>)> {
        let nm = ws.node_modules();
        vec![
            (nm.join(".pnpm"), None),
            (nm.join("widget"), Some(ws.clone_dir("widget"))),
            (
                nm.join("lodash"),
                Some(nm.join(".pnpm/lodash@4.17.21/node_modules/lodash")),
            ),
            (nm.join("@acme"), None),
            (nm.join("@acme").join("gizmo"), Some(ws.clone_dir("gizmo"))),
        ]
    }

    #[tokio::test]
    async fn test_clear_all_linked() {
        let ws = test_workspace();
        let mut runtime = mock_runtime(&ws, &layout(&ws));
        let removed = Arc::new(Mutex::new(Vec::new()));
        {
            let removed = removed.clone();
            runtime.expect_remove_symlink().returning(move |p| {
                removed.lock().unwrap().push(p.to_path_buf());
                Ok(())
            });
        }
        let commands = Arc::new(Mutex::new(Vec::new()));
        let runner = recording_runner(commands.clone());
        let config = Config::default();

        let outcome = ClearAction::new(&runtime, &runner, &config, &ws)
            .clear(None)
            .await
            .unwrap();

        let expected = vec![
            ws.node_modules().join("@acme").join("gizmo"),
            ws.node_modules().join("widget"),
        ];
        assert_eq!(outcome.removed, expected);
        assert_eq!(*removed.lock().unwrap(), expected);

        let lock = ws.lock_file().display().to_string();
        assert_eq!(
            *commands.lock().unwrap(),
            vec![
                format!("git status --porcelain {}", lock),
                "pnpm install".to_string(),
                format!("git checkout -- {}", lock),
                format!("git status --porcelain {}", lock),
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_single_package() {
        let ws = test_workspace();
        let mut runtime = mock_runtime(&ws, &layout(&ws));
        let widget = ws.managed_entry("widget");
        {
            let widget = widget.clone();
            runtime
                .expect_remove_symlink()
                .withf(move |p| p == widget)
                .times(1)
                .returning(|_| Ok(()));
        }
        let runner = recording_runner(Arc::new(Mutex::new(Vec::new())));
        let config = Config::default();

        let outcome = ClearAction::new(&runtime, &runner, &config, &ws)
            .clear(Some("widget"))
            .await
            .unwrap();
        assert_eq!(outcome.removed, vec![widget]);
    }

    #[tokio::test]
    async fn test_clear_package_not_linked() {
        let ws = test_workspace();
        let mut runtime = mock_runtime(&ws, &layout(&ws));
        runtime.expect_remove_symlink().never();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let runner = recording_runner(commands.clone());
        let config = Config::default();

        for package in ["lodash", "missing"] {
            let err = ClearAction::new(&runtime, &runner, &config, &ws)
                .clear(Some(package))
                .await
                .unwrap_err();
            match err.downcast_ref::<DepdevError>() {
                Some(DepdevError::NotLinked { entry, .. }) => {
                    assert_eq!(entry, &ws.managed_entry(package))
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
        assert!(
            !commands
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.starts_with("pnpm"))
        );
    }

    #[tokio::test]
    async fn test_clear_nothing_linked() {
        let ws = test_workspace();
        let nm = ws.node_modules();
        let runtime = mock_runtime(
            &ws,
            &[(
                nm.join("lodash"),
                Some(nm.join(".pnpm/lodash@4.17.21/node_modules/lodash")),
            )],
        );
        let commands = Arc::new(Mutex::new(Vec::new()));
        let runner = recording_runner(commands.clone());
        let config = Config::default();

        let outcome = ClearAction::new(&runtime, &runner, &config, &ws)
            .clear(None)
            .await
            .unwrap();
        assert!(outcome.removed.is_empty());
        assert_eq!(commands.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_requires_clean_lock_file() {
        let ws = test_workspace();
        let runtime = mock_runtime(&ws, &layout(&ws));
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| spec.to_string().starts_with("git status"))
            .times(1)
            .returning(|_| Ok(" M pnpm-lock.yaml".to_string()));
        let config = Config::default();

        let err = ClearAction::new(&runtime, &runner, &config, &ws)
            .clear(None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DepdevError>(),
            Some(DepdevError::LockFileDirty { .. })
        ));
    }
}
