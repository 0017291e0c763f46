//! Symlink operations (read, resolve, remove).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;
use super::path::normalize_path;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_link_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).with_context(|| format!("Failed to read symlink {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn resolve_link_impl(&self, path: &Path) -> Result<PathBuf> {
        let target = self.read_link_impl(path)?;
        if target.is_absolute() {
            Ok(normalize_path(&target))
        } else {
            let parent = path
                .parent()
                .context("Failed to get parent directory of symlink")?;
            Ok(normalize_path(&parent.join(&target)))
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn canonicalize_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("Failed to canonicalize {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path).with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks and junctions need remove_dir, file symlinks need remove_file.
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        Ok(())
    }
}
