//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - absolute, lexically clean, symlink-resolved paths
//! - `relative_to` - express a path relative to a base directory
//! - `to_slash` - platform-neutral string form used for persisted keys

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Relative paths are joined with the current directory, `.` and `..` are
/// folded lexically, and the longest existing prefix is canonicalized so
/// that a deleted file normalizes to the same form it had while it existed.
///
/// # Example
/// ```ignore
/// let abs = normalize_path(Path::new("./source/components/Button.jsx"));
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let clean = clean_path(&absolute);

    if let Ok(canonical) = clean.canonicalize() {
        return canonical;
    }

    // Canonicalize the deepest existing ancestor, re-append the missing tail
    let mut tail = Vec::new();
    let mut cursor = clean.as_path();
    while let Some(parent) = cursor.parent() {
        if let Some(name) = cursor.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            let mut out = canonical;
            for part in tail.iter().rev() {
                out.push(part);
            }
            return out;
        }
        cursor = parent;
    }

    clean
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `path` relative to the directory `base`.
///
/// Both inputs are expected to be absolute and normalized. Walks up from
/// `base` with `..` until a common ancestor is reached.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    out
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
