//! Path utility functions for normalization and comparison.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep the `..` if there is nothing left to pop
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check if a path is under a given directory by comparing normalized path components.
///
/// `/ws/deps/../node_modules/x` is NOT under `/ws/deps`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Display `path` relative to `base` when possible, falling back to `path` itself.
///
/// `/ws/app/node_modules/widget` relative to `/ws/app` is `node_modules/widget`.
pub fn relative_display(base: &Path, path: &Path) -> PathBuf {
    match pathdiff::diff_paths(path, base) {
        Some(rel) if !rel.is_absolute() && !rel.as_os_str().is_empty() => rel,
        _ => path.to_path_buf(),
    }
}
