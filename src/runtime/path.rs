//! Lexical path helpers used to keep destructive operations inside the store.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Returns true if `path` is `dir` or lies below it, comparing whole
/// components after lexical normalization. `/store/foo-1.0/../../etc` is not
/// under `/store`, and neither is `/store-old/foo`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let mut path_components = normalized_path.components();
    normalized_dir
        .components()
        .all(|d| path_components.next() == Some(d))
}
