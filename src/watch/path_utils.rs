// src/watch/path_utils.rs

//! Utility functions for path handling.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root is dropped; leading `..` of a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against `base` (if relative) and normalize it.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || has_windows_drive(path) {
        normalize_lexically(path)
    } else {
        normalize_lexically(&base.join(path))
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` is not inside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// `C:/...` style paths are absolute even when `Path::is_absolute` disagrees
/// (e.g. a Windows descriptor parsed on another host).
fn has_windows_drive(path: &Path) -> bool {
    let s = path.to_string_lossy();
    let bytes = s.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(
            normalize_lexically(Path::new("/proj/./tools/../scripts/a.py")),
            PathBuf::from("/proj/scripts/a.py")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexically(Path::new("../x/./y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn absolutize_joins_relative_paths_only() {
        let base = Path::new("/proj");
        assert_eq!(absolutize(base, Path::new("tools/a.py")), PathBuf::from("/proj/tools/a.py"));
        assert_eq!(absolutize(base, Path::new("/etc/../opt")), PathBuf::from("/opt"));
        assert_eq!(absolutize(base, Path::new("C:/work")), PathBuf::from("C:/work"));
    }

    #[test]
    fn relative_str_strips_root() {
        let root = Path::new("/proj/scripts");
        assert_eq!(
            relative_str(root, Path::new("/proj/scripts/sub/a.py")).as_deref(),
            Some("sub/a.py")
        );
        assert_eq!(relative_str(root, Path::new("/elsewhere/a.py")), None);
    }
}
