//! Error taxonomy for linking, clearing and configuration.
//!
//! Every variant is fatal to the current invocation. Errors travel inside
//! `anyhow::Error` and can be recovered with `downcast_ref::<DepdevError>()`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::process::CommandError;

#[derive(Debug, Error)]
pub enum DepdevError {
    #[error(
        "Couldn't find `{package}` in `package.json#dependencies` nor `package.json#devDependencies` of {manifest:?}"
    )]
    DependencyNotDeclared { package: String, manifest: PathBuf },

    #[error("Missing `pnpm-lock.yaml` at {root:?}")]
    LockFileMissing { root: PathBuf },

    #[error(
        "`pnpm-lock.yaml` is dirty. Make sure `pnpm-lock.yaml` ({lock_file:?}) has no uncommitted changes."
    )]
    LockFileDirty { lock_file: PathBuf },

    #[error(
        "The `package.json#repository` value of `{package}` is `{repository}` but only values with the format `https://github.com/${{owner}}/${{repo}}` or `github:${{owner}}/${{repo}}` are supported."
    )]
    UnsupportedRepositoryFormat { package: String, repository: String },

    #[error("The `package.json` of the npm package `{package}` is missing the `package.json#{field}` field.")]
    ManifestFieldMissing { package: String, field: &'static str },

    #[error("Cloning {url} into {dir:?} timed out after {} seconds.", .timeout.as_secs())]
    CloneTimeout {
        url: String,
        dir: PathBuf,
        timeout: Duration,
        #[source]
        source: CommandError,
    },

    #[error("Merging upstream changes into {dir:?} failed. Resolve the conflict manually.")]
    MergeConflict {
        dir: PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("Something went wrong: {entry:?} should be a symlink but it isn't.")]
    LinkingFailed { entry: PathBuf },

    #[error("The `package.json` of the clone at {clone_dir:?} is missing the `package.json#version` field.")]
    CloneVersionMissing { clone_dir: PathBuf },

    #[error("Couldn't find the installed package `{package}` in any `node_modules` above {start:?}")]
    PackageNotInstalled { package: String, start: PathBuf },

    #[error("Failed to parse {path:?}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("{entry:?} is not linked to a clone under {deps_dir:?}")]
    NotLinked { entry: PathBuf, deps_dir: PathBuf },

    #[error("Config file {file_name} not found between {start:?} and the filesystem root")]
    ConfigNotFound {
        file_name: &'static str,
        start: PathBuf,
    },

    #[error("Config file {path:?} {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },
}
