//! Resolves a raw `#include` target against the set of known roots.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path, collapsing `.` and `..` components without
/// touching the filesystem (no symlink resolution — the source tree is
/// read-only during analysis).
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

/// Resolution candidates, in the documented order: absolute path; relative
/// to the including file's directory; relative to each of `roots` in turn.
/// Returns the first candidate that exists and does not escape
/// `project_root`.
pub fn resolve_include(
    including_file: &Path,
    target: &str,
    roots: &[&Path],
    project_root: &Path,
) -> Option<PathBuf> {
    let target_path = Path::new(target);

    if target_path.is_absolute() {
        let normalized = normalize(target_path);
        if normalized.starts_with(project_root) && normalized.is_file() {
            return Some(normalized);
        }
        return None;
    }

    let including_dir = including_file.parent().unwrap_or(including_file);
    let mut candidates = vec![including_dir.join(target_path)];
    candidates.extend(roots.iter().map(|r| r.join(target_path)));

    for candidate in candidates {
        let normalized = normalize(&candidate);
        if !normalized.starts_with(project_root) {
            continue;
        }
        if normalized.is_file() {
            return Some(normalized);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_parent_dir_components() {
        let p = Path::new("/a/b/../c/./d");
        assert_eq!(normalize(p), PathBuf::from("/a/c/d"));
    }

    #[test]
    fn resolve_prefers_including_files_own_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("Foo.hpp"), "").unwrap();
        let including = sub.join("Foo.cpp");
        std::fs::write(&including, "").unwrap();

        let resolved = resolve_include(&including, "Foo.hpp", &[], dir.path()).unwrap();
        assert_eq!(resolved, sub.join("Foo.hpp"));
    }

    #[test]
    fn resolve_refuses_to_escape_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let including = dir.path().join("Foo.cpp");
        std::fs::write(&including, "").unwrap();

        let resolved = resolve_include(&including, "../../../etc/passwd", &[], dir.path());
        assert!(resolved.is_none());
    }
}
