//! Path helpers.
//!
//! Workspace and project files always use `\` separators; paths are converted
//! to the host separator before they are joined so lookups work on every
//! platform.

use std::path::{Component, Path, PathBuf};

/// Convert both `\` and `/` to the host separator.
pub fn to_native_separators(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c == '\\' || c == '/' {
                std::path::MAIN_SEPARATOR
            } else {
                c
            }
        })
        .collect()
}

/// Lexically normalize `path`: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(result.components().next_back(), Some(Component::Normal(_)))
                    && result.pop();
                if !popped && !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Join a declared (possibly `\`-separated, possibly relative) path onto
/// `base` and normalize the result.
pub fn join_declared(base: &Path, declared: &str) -> PathBuf {
    normalize(&base.join(to_native_separators(declared)))
}

/// Lower-cased string form of a path, used as a case-insensitive index key.
pub fn index_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
