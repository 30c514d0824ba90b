//! The materials updater: soft-copies a test's "working" output back into
//! its "prediction" directory, but only for files that actually differ —
//! so a file's modification time stays stable when its content didn't
//! change, and the whole operation is idempotent.

use std::path::{Path, PathBuf};

use crate::error::RunnerResult;

const PRESERVED_NAME: &str = ".keep";
const PRESERVED_EXT: &str = "seqpat";

/// Recursively copies every file under `working` into the corresponding
/// path under `prediction`, skipping files that are byte-identical to
/// their existing prediction counterpart and files that are preserved
/// (named `.keep` or extension `.seqpat`, which are never compared or
/// copied). Running this twice in a row is a no-op the second time.
pub fn soft_update(working: &Path, prediction: &Path) -> RunnerResult<usize> {
    let mut updated = 0;
    if !working.is_dir() {
        return Ok(updated);
    }

    let mut stack = vec![PathBuf::new()];
    while let Some(rel) = stack.pop() {
        let working_dir = working.join(&rel);
        for entry in std::fs::read_dir(&working_dir)? {
            let entry = entry?;
            let rel_path = rel.join(entry.file_name());
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                stack.push(rel_path);
                continue;
            }

            if is_preserved(&rel_path) {
                continue;
            }

            let working_file = working.join(&rel_path);
            let prediction_file = prediction.join(&rel_path);

            let new_bytes = std::fs::read(&working_file)?;
            let unchanged = std::fs::read(&prediction_file)
                .map(|existing| existing == new_bytes)
                .unwrap_or(false);

            if unchanged {
                continue;
            }

            if let Some(parent) = prediction_file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&prediction_file, &new_bytes)?;
            updated += 1;
        }
    }

    Ok(updated)
}

fn is_preserved(rel_path: &Path) -> bool {
    if rel_path.file_name().and_then(|n| n.to_str()) == Some(PRESERVED_NAME) {
        return true;
    }
    rel_path.extension().and_then(|e| e.to_str()) == Some(PRESERVED_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn copies_differing_files_into_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("working");
        let prediction = dir.path().join("prediction");
        fs::create_dir_all(&working).unwrap();
        fs::create_dir_all(&prediction).unwrap();
        fs::write(working.join("out.txt"), "new").unwrap();
        fs::write(prediction.join("out.txt"), "old").unwrap();

        let updated = soft_update(&working, &prediction).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(fs::read_to_string(prediction.join("out.txt")).unwrap(), "new");
    }

    #[test]
    fn byte_equal_files_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("working");
        let prediction = dir.path().join("prediction");
        fs::create_dir_all(&working).unwrap();
        fs::create_dir_all(&prediction).unwrap();
        fs::write(working.join("out.txt"), "same").unwrap();
        fs::write(prediction.join("out.txt"), "same").unwrap();

        let updated = soft_update(&working, &prediction).unwrap();
        assert_eq!(updated, 0);
    }

    #[test]
    fn preserved_files_are_never_touched() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("working");
        let prediction = dir.path().join("prediction");
        fs::create_dir_all(&working).unwrap();
        fs::write(working.join(".keep"), "anything").unwrap();
        fs::write(working.join("state.seqpat"), "anything").unwrap();

        let updated = soft_update(&working, &prediction).unwrap();
        assert_eq!(updated, 0);
        assert!(!prediction.join(".keep").exists());
        assert!(!prediction.join("state.seqpat").exists());
    }

    #[test]
    fn running_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("working");
        let prediction = dir.path().join("prediction");
        fs::create_dir_all(&working).unwrap();
        fs::create_dir_all(&prediction).unwrap();
        fs::write(working.join("out.txt"), "new").unwrap();

        soft_update(&working, &prediction).unwrap();
        let second = soft_update(&working, &prediction).unwrap();
        assert_eq!(second, 0);
    }
}
