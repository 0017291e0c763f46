use anyhow::Result;

use crate::application::ClearAction;
use crate::config::Config;
use crate::process::CommandRunner;
use crate::runtime::{Runtime, relative_display};
use crate::workspace::Workspace;

/// Remove links into `deps/` and reinstall the published packages
#[tracing::instrument(skip(runtime, runner, config))]
pub async fn clear<R: Runtime, C: CommandRunner>(
    runtime: &R,
    runner: &C,
    config: &Config,
    package: Option<&str>,
) -> Result<()> {
    let workspace = Workspace::discover(runtime)?;
    let outcome = ClearAction::new(runtime, runner, config, &workspace)
        .clear(package)
        .await?;

    if outcome.removed.is_empty() {
        println!("No linked dependencies.");
        return Ok(());
    }

    for entry in &outcome.removed {
        println!(
            "Unlinked {}",
            relative_display(&workspace.project_dir, entry).display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockCommandRunner;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_workspace_root;
    use mockall::predicate::eq;
    use std::env::VarError;

    #[tokio::test]
    async fn test_clear_without_node_modules() {
        let root = test_workspace_root();
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("INIT_CWD"))
            .returning(|_| Err(VarError::NotPresent));
        {
            let root = root.clone();
            runtime.expect_current_dir().returning(move || Ok(root.clone()));
        }
        {
            let lock = root.join("pnpm-lock.yaml");
            runtime.expect_exists().returning(move |p| p == lock);
        }
        runtime.expect_is_dir().returning(|_| false);
        runtime.expect_remove_symlink().never();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| spec.to_string().starts_with("git status --porcelain"))
            .times(1)
            .returning(|_| Ok(String::new()));

        clear(&runtime, &runner, &Config::default(), None)
            .await
            .unwrap();
    }
}
