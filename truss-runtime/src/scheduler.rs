//! The top-level runner: discovery → prune → execute → update-prune →
//! summarize. Owns the argument-consistency checks and ties every other
//! component in this crate together for the `run` operation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use truss_analysis::{AnalyzerInput, analyze};
use truss_core::{ConcurrencyMode, ProjectPaths, ResolvedConcurrency};
use truss_storage::PruneDatabase;

use crate::dispatch::{dispatch_concurrent, run_one, TestOutcome};
use crate::error::{RunnerError, RunnerResult};
use crate::materials::soft_update;
use crate::recovery::{recovery_dir_under, RecoveryJournal};
use crate::registry::{TestCase, TestRegistry};
use crate::summary::Summary;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: ConcurrencyMode,
    pub recovery: bool,
    pub prune_enabled: bool,
    pub update_materials: bool,
    pub include_cutoff: String,
    pub additional_analysis_roots: Vec<PathBuf>,
    /// Bounds the width of the thread pool used for concurrent dispatch
    /// (the CLI's `--async-depth`); `None` uses the process-wide default
    /// `rayon` pool. Has no effect on [`ConcurrencyMode::Serial`] runs.
    pub max_parallelism: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyMode::Dynamic,
            recovery: false,
            prune_enabled: true,
            update_materials: false,
            include_cutoff: String::new(),
            additional_analysis_roots: Vec::new(),
            max_parallelism: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub suite_summaries: Vec<Summary>,
    pub grand_total: Summary,
    pub executed: BTreeSet<PathBuf>,
    pub failed: BTreeSet<PathBuf>,
    pub warnings: Vec<String>,
}

/// Runs the selected (or pruned, or all) tests once, per §4.6.
///
/// `registry` should already reflect any explicit `select`/`test`
/// selections the CLI made; an empty selection means "consult the prune
/// database" when `options.prune_enabled`, or "run everything" otherwise.
pub fn run(
    paths: &ProjectPaths,
    compiler: &str,
    registry: &TestRegistry,
    options: &RunOptions,
) -> RunnerResult<RunReport> {
    check_argument_consistency(options)?;

    let prune_db = PruneDatabase::open(&paths.build_dir(compiler))?;

    let (tests, is_full_run) = select_tests(paths, registry, &prune_db, options)?;

    let journal = if options.recovery {
        Some(RecoveryJournal::new(recovery_dir_under(paths.output_root()))?)
    } else {
        None
    };

    let resolved = if options.recovery {
        ResolvedConcurrency::Serial
    } else {
        options.concurrency.resolve(registry.suite_count_in(&tests))
    };

    tracing::info!(
        concurrency = ?resolved,
        selected = tests.len(),
        "starting run"
    );

    let outcomes = dispatch(&tests, resolved, journal.as_ref(), options.max_parallelism);

    let report = build_report(paths, &tests, &outcomes);

    if options.prune_enabled || is_full_run {
        let stamp_time = if is_full_run {
            SystemTime::now()
        } else {
            prune_db
                .load()?
                .map(|s| s.stamp_time)
                .unwrap_or(SystemTime::UNIX_EPOCH)
        };
        prune_db.store(&report.failed, &report.executed, stamp_time)?;
    }

    if options.update_materials {
        update_materials(paths, &tests)?;
    }

    Ok(report)
}

fn check_argument_consistency(options: &RunOptions) -> RunnerResult<()> {
    if options.recovery && !matches!(options.concurrency, ConcurrencyMode::Serial) {
        return Err(RunnerError::InconsistentArguments(
            "recovery mode requires serial concurrency".to_string(),
        ));
    }
    Ok(())
}

fn select_tests<'r>(
    paths: &ProjectPaths,
    registry: &'r TestRegistry,
    prune_db: &PruneDatabase,
    options: &RunOptions,
) -> RunnerResult<(Vec<&'r TestCase>, bool)> {
    if registry.has_selection() {
        return Ok((registry.iter_selected(), false));
    }

    if !options.prune_enabled {
        return Ok((registry.iter_all().collect(), true));
    }

    let additional_roots = &options.additional_analysis_roots;
    let input = AnalyzerInput {
        source_root: paths.source_root(),
        tests_root: paths.tests_root(),
        materials_root: paths.materials_root(),
        additional_roots,
        project_root: paths.project_root(),
        include_cutoff: &options.include_cutoff,
        executable_mtime: None,
        executable_path: None,
    };

    let prune_state = prune_db.load()?;
    let passes_mtime = prune_db.passes_last_modified()?;

    match analyze(&input, prune_state.as_ref(), passes_mtime)? {
        None => Ok((registry.iter_all().collect(), true)),
        Some(output) => {
            let stale: BTreeSet<PathBuf> = output
                .stale_tests
                .iter()
                .map(|rel| paths.tests_root().join(rel))
                .collect();
            let selected = registry
                .iter_all()
                .filter(|t| stale.contains(&t.identity.source_file_path))
                .collect();
            Ok((selected, true))
        }
    }
}

fn dispatch(
    tests: &[&TestCase],
    resolved: ResolvedConcurrency,
    journal: Option<&RecoveryJournal>,
    max_parallelism: Option<usize>,
) -> Vec<(usize, TestOutcome)> {
    match resolved {
        ResolvedConcurrency::Serial => tests
            .iter()
            .enumerate()
            .map(|(idx, test)| (idx, run_one(test, journal)))
            .collect(),
        other => dispatch_concurrent(tests, other, max_parallelism),
    }
}

fn build_report(paths: &ProjectPaths, tests: &[&TestCase], outcomes: &[(usize, TestOutcome)]) -> RunReport {
    let mut per_suite: Vec<(String, Vec<Summary>)> = Vec::new();
    let mut executed = BTreeSet::new();
    let mut failed = BTreeSet::new();

    for (idx, outcome) in outcomes {
        let test = tests[*idx];
        let rel = test
            .identity
            .source_file_path
            .strip_prefix(paths.tests_root())
            .unwrap_or(&test.identity.source_file_path)
            .to_path_buf();
        executed.insert(rel.clone());
        if !outcome.passed() {
            failed.insert(rel);
        }

        let suite = &test.identity.suite_name;
        match per_suite.iter_mut().find(|(name, _)| name == suite) {
            Some((_, summaries)) => summaries.push(outcome.summary.clone()),
            None => per_suite.push((suite.clone(), vec![outcome.summary.clone()])),
        }
    }

    let suite_summaries: Vec<Summary> = per_suite
        .iter()
        .map(|(name, summaries)| Summary::combine(name.clone(), summaries))
        .collect();
    let grand_total = Summary::combine("grand total", &suite_summaries);

    RunReport {
        suite_summaries,
        grand_total,
        executed,
        failed,
        warnings: Vec::new(),
    }
}

fn update_materials(paths: &ProjectPaths, tests: &[&TestCase]) -> RunnerResult<()> {
    for test in tests {
        let materials_dir = paths.materials_dir_for_test(&test.identity.source_file_path);
        if !materials_dir.is_dir() {
            continue;
        }
        let working = materials_dir.join("working");
        let prediction = materials_dir.join("prediction");
        soft_update(&working, &prediction)?;
    }
    Ok(())
}

/// Compiler identification used to pick `build_dir`/`prune_dir`, resolved
/// at runtime (the distilled spec's `with_msvc_v`/`with_clang_v`/
/// `with_gcc_v` compile-time tags have no equivalent without template
/// specialization — see DESIGN.md).
pub fn detect_compiler_tag() -> &'static str {
    if std::env::var_os("VSINSTALLDIR").is_some() {
        "msvc"
    } else if cfg!(target_os = "macos") {
        "clang"
    } else {
        "gcc"
    }
}

pub fn relative_test_path(tests_root: &Path, test: &TestCase) -> PathBuf {
    test.identity
        .source_file_path
        .strip_prefix(tests_root)
        .unwrap_or(&test.identity.source_file_path)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use truss_core::{ProjectPathsInit, TestIdentity};

    fn scaffold() -> (tempfile::TempDir, ProjectPaths) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("source/foo")).unwrap();
        fs::create_dir_all(root.join("tests/maths")).unwrap();
        fs::create_dir_all(root.join("test_materials")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("aux_files")).unwrap();
        fs::create_dir_all(root.join("output")).unwrap();
        fs::write(root.join("source/foo/main.cpp"), "").unwrap();
        fs::write(root.join("source/foo/common_includes.hpp"), "").unwrap();
        fs::write(root.join("tests/maths/probability_test.cpp"), "").unwrap();

        let paths = ProjectPaths::new(
            root,
            "Foo",
            ProjectPathsInit {
                main_source: "main.cpp".into(),
                ancillary_mains: vec![],
                common_includes: "common_includes.hpp".into(),
            },
        )
        .unwrap();
        (dir, paths)
    }

    fn case(paths: &ProjectPaths, suite: &str, test: &str, passes: bool) -> TestCase {
        TestCase {
            identity: TestIdentity {
                suite_name: suite.to_string(),
                test_name: test.to_string(),
                source_file_path: paths.tests_root().join(format!("{suite}/{test}.cpp")),
            },
            body: Arc::new(move |log: &crate::logger::CheckLog| {
                log.check_equal("x", &passes, &true);
            }),
        }
    }

    #[test]
    fn a_full_run_with_no_selection_runs_everything_and_advances_stamp() {
        let (_dir, paths) = scaffold();
        let mut registry = TestRegistry::new();
        registry
            .add_suite(
                "maths",
                vec![case(&paths, "maths", "probability_test", true)],
            )
            .unwrap();

        let options = RunOptions::default();
        let report = run(&paths, "gcc", &registry, &options).unwrap();
        assert_eq!(report.executed.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn recovery_with_non_serial_concurrency_is_rejected() {
        let (_dir, paths) = scaffold();
        let registry = TestRegistry::new();
        let options = RunOptions {
            recovery: true,
            concurrency: ConcurrencyMode::Test,
            ..RunOptions::default()
        };
        let err = run(&paths, "gcc", &registry, &options).unwrap_err();
        assert_eq!(err.error_code(), "INCONSISTENT_ARGUMENTS");
    }

    #[test]
    fn second_run_with_fresh_stamp_prunes_everything_away() {
        let (_dir, paths) = scaffold();
        let mut registry = TestRegistry::new();
        registry
            .add_suite(
                "maths",
                vec![case(&paths, "maths", "probability_test", true)],
            )
            .unwrap();

        let options = RunOptions::default();
        run(&paths, "gcc", &registry, &options).unwrap();
        let second = run(&paths, "gcc", &registry, &options).unwrap();
        assert!(second.executed.is_empty());
    }
}
