//! Reading and atomically rewriting sorted, LF-terminated path lists.
//!
//! Every prune file (`failures`, `passes`, `external_dependencies`, and the
//! per-replica instability files) shares this format: UTF-8 text, one
//! relative path per line, sorted lexicographically, LF-terminated.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PruneResult;

/// Reads a path-list file. Returns an empty set if the file doesn't exist —
/// absence means "nothing recorded yet", not an error.
pub fn read_set(path: &Path) -> PruneResult<BTreeSet<PathBuf>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e.into()),
    }
}

/// Writes a path-list file as a single atomic rewrite: the new content is
/// written to a sibling temp file then renamed over the target, so readers
/// always see either the old or the new content, never a partial write.
pub fn write_set(path: &Path, paths: &BTreeSet<PathBuf>) -> PruneResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = std::fs::File::create(&tmp)?;
        for p in paths {
            writeln!(file, "{}", p.to_string_lossy())?;
        }
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = read_set(&dir.path().join("failures")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn round_trip_is_sorted_and_lf_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures");
        let mut set = BTreeSet::new();
        set.insert(PathBuf::from("Stuff/ZTest.cpp"));
        set.insert(PathBuf::from("Stuff/ATest.cpp"));
        write_set(&path, &set).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Stuff/ATest.cpp\nStuff/ZTest.cpp\n");

        let read_back = read_set(&path).unwrap();
        assert_eq!(read_back, set);
    }
}
