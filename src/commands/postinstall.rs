use anyhow::{Context, Result};
use log::info;

use crate::config::{Config, InlinedDependencies};
use crate::process::CommandRunner;
use crate::runtime::Runtime;
use crate::workspace::Workspace;

use super::link::link_in;

/// Link every dependency listed in `depdev.config.json`, one after another.
///
/// Stops at the first dependency that fails to link.
#[tracing::instrument(skip(runtime, runner, config))]
pub async fn postinstall<R: Runtime, C: CommandRunner>(
    runtime: &R,
    runner: &C,
    config: &Config,
) -> Result<()> {
    let workspace = Workspace::discover(runtime)?;
    let (path, inlined) = InlinedDependencies::find_and_load(runtime, &workspace.project_dir)?;

    let packages = inlined.entries();
    if packages.is_empty() {
        info!("No inlined dependencies in {:?}", path);
        return Ok(());
    }

    for package in packages {
        link_in(runtime, runner, config, &workspace, package)
            .await
            .with_context(|| format!("Failed to link inlined dependency {}", package))?;
    }
    Ok(())
}
