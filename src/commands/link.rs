use anyhow::{Result, ensure};

use crate::application::LinkAction;
use crate::config::Config;
use crate::process::CommandRunner;
use crate::runtime::Runtime;
use crate::workspace::Workspace;

/// Link a dependency of the current project to a clone of its repository
#[tracing::instrument(skip(runtime, runner, config))]
pub async fn link<R: Runtime, C: CommandRunner>(
    runtime: &R,
    runner: &C,
    config: &Config,
    package: &str,
) -> Result<()> {
    let workspace = Workspace::discover(runtime)?;
    link_in(runtime, runner, config, &workspace, package).await
}

pub(super) async fn link_in<R: Runtime, C: CommandRunner>(
    runtime: &R,
    runner: &C,
    config: &Config,
    workspace: &Workspace,
    package: &str,
) -> Result<()> {
    ensure!(!package.trim().is_empty(), "Package name must not be empty");

    let outcome = LinkAction::new(runtime, runner, config, workspace)
        .link(package)
        .await?;

    println!("{}", outcome.display(&workspace.project_dir));
    Ok(())
}

// Reconciliation itself is tested in application/link.rs
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepdevError;
    use crate::process::MockCommandRunner;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_workspace_root;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_link_uses_init_cwd() {
        let root = test_workspace_root();
        let project = root.join("packages").join("app");

        let mut runtime = MockRuntime::new();
        {
            let project = project.clone();
            runtime
                .expect_env_var()
                .with(eq("INIT_CWD"))
                .returning(move |_| Ok(project.to_string_lossy().into_owned()));
        }
        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_read_to_string()
            .with(eq(project.join("package.json")))
            .returning(|_| Ok(r#"{ "name": "app" }"#.to_string()));
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();

        let err = link(&runtime, &runner, &Config::default(), "widget")
            .await
            .unwrap_err();
        match err.downcast_ref::<DepdevError>() {
            Some(DepdevError::DependencyNotDeclared { manifest, .. }) => {
                assert_eq!(manifest, &project.join("package.json"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_link_empty_package_name() {
        let runtime = MockRuntime::new();
        let runner = MockCommandRunner::new();
        let ws = Workspace::new(test_workspace_root(), test_workspace_root());

        let err = link_in(&runtime, &runner, &Config::default(), &ws, "  ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Package name must not be empty");
    }
}
