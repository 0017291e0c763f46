//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over the filesystem and
//! process environment, enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `path` - Path utility functions (normalize, is_path_under, relative_display)
//! - `env` - Environment variables and the current directory
//! - `fs` - File system operations (read, directory)
//! - `symlink` - Symlink operations (read, resolve, remove)

mod env;
mod fs;
pub mod path;
mod symlink;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

pub use path::{is_path_under, normalize_path, relative_display};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;
    fn current_dir(&self) -> Result<PathBuf>;

    // File System
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    // Symlinks
    fn is_symlink(&self, path: &Path) -> bool;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;

    /// Resolve a symlink to an absolute path (without recursively resolving symlinks).
    /// If the link target is relative, it is resolved relative to the link's parent directory.
    fn resolve_link(&self, path: &Path) -> Result<PathBuf>;

    /// Canonicalize a path by resolving all symlinks and returning the canonical absolute path.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    fn remove_symlink(&self, path: &Path) -> Result<()>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.is_symlink_impl(path)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        self.read_link_impl(path)
    }

    fn resolve_link(&self, path: &Path) -> Result<PathBuf> {
        self.resolve_link_impl(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.canonicalize_impl(path)
    }

    fn remove_symlink(&self, path: &Path) -> Result<()> {
        self.remove_symlink_impl(path)
    }
}
