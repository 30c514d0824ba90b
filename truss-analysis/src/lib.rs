//! # truss-analysis
//!
//! The dependency analyzer: builds a directed include graph over a
//! project's source, test, and materials trees, propagates staleness, and
//! yields the minimal set of tests that need to rerun.
//!
//! The heavy lifting is spread across [`scanner`] (gathering nodes),
//! [`includes`] (comment-aware `#include` extraction), [`resolve`]
//! (resolving an include target to a node), and [`graph`] (the staleness
//! propagation itself). This module ties those together into the
//! documented eight-step algorithm and adds the two steps that need a
//! prune database: the materials check and the passing-test reprieve.

pub mod error;
pub mod graph;
pub mod includes;
pub mod resolve;
pub mod scanner;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use error::{AnalyzerError, AnalyzerResult};
use graph::IncludeGraph;
use truss_storage::PruneState;

/// Extensions recognised as test translation units (as opposed to headers,
/// which never appear directly in the rerun set).
const TEST_SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];

/// Everything the analyzer needs that isn't already persisted in the prune
/// database — the roots to walk and the cutoff token for include scanning.
pub struct AnalyzerInput<'a> {
    pub source_root: &'a Path,
    pub tests_root: &'a Path,
    pub materials_root: &'a Path,
    pub additional_roots: &'a [PathBuf],
    pub project_root: &'a Path,
    pub include_cutoff: &'a str,
    /// Modification time of the test executable, if one already exists.
    /// `None` disables the out-of-date check (e.g. first build).
    pub executable_mtime: Option<SystemTime>,
    pub executable_path: Option<&'a Path>,
}

/// Result of one analyzer invocation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutput {
    /// Stale test sources, relative to `tests_root`, sorted.
    pub stale_tests: Vec<PathBuf>,
    /// Include targets that could not be resolved against any known root.
    pub externals: BTreeSet<String>,
}

/// Runs the eight-step staleness algorithm.
///
/// Returns `Ok(None)` when `prune` is `None` — there is no prior stamp, so
/// nothing can be pruned and the caller should run everything. Returns
/// `Ok(Some(_))` with the (possibly empty) stale set otherwise.
pub fn analyze(
    input: &AnalyzerInput<'_>,
    prune: Option<&PruneState>,
    passes_last_modified: Option<SystemTime>,
) -> AnalyzerResult<Option<AnalyzerOutput>> {
    let mut roots: Vec<&Path> = vec![input.source_root, input.tests_root];
    roots.extend(input.additional_roots.iter().map(|p| p.as_path()));

    let files = scanner::gather_nodes(&roots)?;

    if let Some(exe_mtime) = input.executable_mtime {
        if let Some(newer) = files.iter().find(|f| f.last_write_time > exe_mtime) {
            let exe = input
                .executable_path
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Err(AnalyzerError::ExecutableOutOfDate {
                exe,
                newer: newer.path.clone(),
            });
        }
    }

    let Some(prune) = prune else {
        tracing::debug!("no prune stamp on record, analyzer signals a full run");
        return Ok(None);
    };

    let mut externals = BTreeSet::new();
    let graph = IncludeGraph::build(
        &files,
        prune.stamp_time,
        &roots,
        input.project_root,
        input.include_cutoff,
        &mut externals,
    )?;

    let mut stale_tests = Vec::new();
    for file in &files {
        if !file.path.starts_with(input.tests_root) {
            continue;
        }
        let Some(ext) = file.path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !TEST_SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }

        let node = graph
            .node(&file.path)
            .expect("every scanned file has a graph node");
        let mut stale = node.stale;

        let materials_dir = materials_dir_for(input.materials_root, input.tests_root, &file.path);
        let materials_mtime = newest_mtime_under(&materials_dir)?;
        if let Some(m) = materials_mtime {
            if m > prune.stamp_time {
                stale = true;
            }
        }

        let rel = file
            .path
            .strip_prefix(input.tests_root)
            .unwrap_or(&file.path)
            .to_path_buf();

        if stale {
            if let Some(reprieved) = apply_passing_reprieve(
                &rel,
                prune,
                passes_last_modified,
                node.last_write_time,
                materials_mtime,
            ) {
                stale = !reprieved;
            }
        }

        if stale {
            tracing::debug!(test = %rel.display(), "marked stale");
            stale_tests.push(rel);
        }
    }

    stale_tests.sort();

    for target in &externals {
        tracing::warn!(include = %target, "could not resolve include against any known root");
    }

    Ok(Some(AnalyzerOutput {
        stale_tests,
        externals,
    }))
}

/// A test marked stale is reprieved (step 7) when it is in the previous
/// passes list and every one of its inputs predates the passes file.
/// Returns `None` when the test isn't a reprieve candidate at all (not in
/// the passes list, or there's no passes file yet).
fn apply_passing_reprieve(
    rel: &Path,
    prune: &PruneState,
    passes_last_modified: Option<SystemTime>,
    node_mtime: SystemTime,
    materials_mtime: Option<SystemTime>,
) -> Option<bool> {
    if !prune.passes.contains(rel) {
        return None;
    }
    let passes_mtime = passes_last_modified?;

    let inputs_are_older = node_mtime < passes_mtime
        && materials_mtime.map(|m| m < passes_mtime).unwrap_or(true);

    Some(inputs_are_older)
}

fn materials_dir_for(materials_root: &Path, tests_root: &Path, test_source: &Path) -> PathBuf {
    let rel = test_source.strip_prefix(tests_root).unwrap_or(test_source);
    materials_root.join(rel.with_extension(""))
}

/// Newest modification time among every regular file under `dir`,
/// recursively. `None` if the directory doesn't exist or is empty.
fn newest_mtime_under(dir: &Path) -> std::io::Result<Option<SystemTime>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut newest = None;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
                continue;
            }
            let mtime = entry.metadata()?.modified()?;
            if newest.map(|n| mtime > n).unwrap_or(true) {
                newest = Some(mtime);
            }
        }
    }
    Ok(newest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet as Set;
    use std::fs;
    use std::time::Duration;

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("source/foo")).unwrap();
        fs::create_dir_all(root.join("tests/maths")).unwrap();
        fs::create_dir_all(root.join("test_materials")).unwrap();
        dir
    }

    fn input<'a>(root: &'a Path, cutoff: &'a str) -> AnalyzerInput<'a> {
        AnalyzerInput {
            source_root: Box::leak(root.join("source").into_boxed_path()),
            tests_root: Box::leak(root.join("tests").into_boxed_path()),
            materials_root: Box::leak(root.join("test_materials").into_boxed_path()),
            additional_roots: &[],
            project_root: root,
            include_cutoff: cutoff,
            executable_mtime: None,
            executable_path: None,
        }
    }

    #[test]
    fn no_stamp_means_run_everything() {
        let dir = scaffold();
        let inp = input(dir.path(), "");
        let out = analyze(&inp, None, None).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn fresh_stamp_yields_empty_rerun_set() {
        let dir = scaffold();
        fs::write(dir.path().join("tests/maths/probability_test.cpp"), "").unwrap();

        let inp = input(dir.path(), "");
        let prune = PruneState {
            stamp_time: SystemTime::now() + Duration::from_secs(1),
            failures: Set::new(),
            passes: Set::new(),
            externals: Set::new(),
        };
        let out = analyze(&inp, Some(&prune), None).unwrap().unwrap();
        assert!(out.stale_tests.is_empty());
    }

    #[test]
    fn touched_header_marks_its_test_stale() {
        let dir = scaffold();
        let header = dir.path().join("source/foo/probability.hpp");
        let test_source = dir.path().join("tests/maths/probability_test.cpp");
        fs::write(&header, "").unwrap();
        fs::write(&test_source, "#include \"probability.hpp\"\n").unwrap();

        let stamp = SystemTime::now();
        std::thread::sleep(Duration::from_millis(10));
        let later = SystemTime::now();
        fs::File::options()
            .write(true)
            .open(&header)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let inp = input(dir.path(), "");
        let prune = PruneState {
            stamp_time: stamp,
            failures: Set::new(),
            passes: Set::new(),
            externals: Set::new(),
        };
        let out = analyze(&inp, Some(&prune), None).unwrap().unwrap();
        assert_eq!(out.stale_tests, vec![PathBuf::from("maths/probability_test.cpp")]);
    }

    #[test]
    fn touched_materials_marks_test_stale() {
        let dir = scaffold();
        let test_source = dir.path().join("tests/maths/probability_test.cpp");
        fs::write(&test_source, "").unwrap();
        fs::create_dir_all(dir.path().join("test_materials/maths/probability_test")).unwrap();
        fs::write(
            dir.path().join("test_materials/maths/probability_test/prediction.txt"),
            "x",
        )
        .unwrap();

        let stamp = SystemTime::now();
        let inp = input(dir.path(), "");
        let prune = PruneState {
            stamp_time: stamp,
            failures: Set::new(),
            passes: Set::new(),
            externals: Set::new(),
        };
        let out = analyze(&inp, Some(&prune), None).unwrap().unwrap();
        assert_eq!(out.stale_tests, vec![PathBuf::from("maths/probability_test.cpp")]);
    }

    #[test]
    fn passing_reprieve_unstales_a_test_whose_inputs_predate_the_passes_file() {
        let dir = scaffold();
        let test_source = dir.path().join("tests/maths/probability_test.cpp");
        fs::write(&test_source, "").unwrap();

        let stamp = SystemTime::now();
        std::thread::sleep(Duration::from_millis(10));
        let passes_mtime = SystemTime::now();
        std::thread::sleep(Duration::from_millis(10));
        let touched = SystemTime::now();
        fs::File::options()
            .write(true)
            .open(&test_source)
            .unwrap()
            .set_modified(touched)
            .unwrap();

        let inp = input(dir.path(), "");
        let mut passes = Set::new();
        passes.insert(PathBuf::from("maths/probability_test.cpp"));
        let prune = PruneState {
            stamp_time: stamp,
            failures: Set::new(),
            passes,
            externals: Set::new(),
        };

        // Without a passes timestamp the test stays stale (touched after stamp).
        let out = analyze(&inp, Some(&prune), None).unwrap().unwrap();
        assert_eq!(out.stale_tests, vec![PathBuf::from("maths/probability_test.cpp")]);

        // The file's mtime (`touched`) is after `passes_mtime`, so the reprieve
        // must not apply even though the test is in the passes list.
        let out = analyze(&inp, Some(&prune), Some(passes_mtime)).unwrap().unwrap();
        assert_eq!(out.stale_tests, vec![PathBuf::from("maths/probability_test.cpp")]);
    }

    use proptest::prelude::*;

    proptest! {
        /// For all file sets under `tests_root`, a stamp taken after every
        /// file was written yields an empty rerun set — nothing is stale
        /// relative to a fresh-enough stamp, no matter how many test
        /// sources exist or what they're named.
        #[test]
        fn fresh_enough_stamp_always_yields_an_empty_rerun_set(
            names in proptest::collection::vec("[a-z][a-z0-9_]{0,12}", 0..8),
        ) {
            let dir = scaffold();
            for name in &names {
                fs::write(
                    dir.path().join("tests/maths").join(format!("{name}_test.cpp")),
                    "",
                )
                .unwrap();
            }

            let stamp = SystemTime::now() + Duration::from_secs(1);
            let inp = input(dir.path(), "");
            let prune = PruneState {
                stamp_time: stamp,
                failures: Set::new(),
                passes: Set::new(),
                externals: Set::new(),
            };

            let out = analyze(&inp, Some(&prune), None).unwrap().unwrap();
            prop_assert!(out.stale_tests.is_empty());
        }
    }
}
