//! Walks the source, test, and additional analysis roots to gather include
//! graph nodes, the way this codebase's directory scanners always do: a
//! parallel, gitignore-aware walk collected onto a bounded channel, then
//! sorted into a deterministic order before anything downstream touches it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::{WalkBuilder, WalkState};

/// Extensions the analyzer considers part of the include graph.
const NODE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "hpp", "h", "hxx"];

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub last_write_time: SystemTime,
}

/// Walks every root in `roots`, returning every file with a recognised
/// source/header extension, sorted by `(filename, full_path)` so that
/// same-stem cpp/hpp pairs sit adjacent to each other — the ordering the
/// edge-resolution pass in [`crate::graph`] depends on.
pub fn gather_nodes(roots: &[&Path]) -> std::io::Result<Vec<ScannedFile>> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let mut roots = roots.iter();
    let Some(first) = roots.next() else {
        return Ok(Vec::new());
    };
    let mut builder = WalkBuilder::new(first);
    for root in roots {
        builder.add(root);
    }
    builder.hidden(false).git_ignore(true).follow_links(false);

    builder.build_parallel().run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                        if NODE_EXTENSIONS.contains(&ext) {
                            let _ = tx.send(entry.into_path());
                        }
                    }
                }
            }
            WalkState::Continue
        })
    });
    drop(tx);

    let mut files = Vec::new();
    for path in rx {
        let last_write_time = std::fs::metadata(&path)?.modified()?;
        files.push(ScannedFile {
            path,
            last_write_time,
        });
    }

    files.sort_by(|a, b| {
        let a_name = a.path.file_name();
        let b_name = b.path.file_name();
        (a_name, &a.path).cmp(&(b_name, &b.path))
    });

    Ok(files)
}
