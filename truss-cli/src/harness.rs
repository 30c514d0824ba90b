//! Project discovery and the reusable harness entry point.
//!
//! `truss` the standalone binary has no compiled test bodies to register
//! (test/materials generation is explicitly out of scope, §1) — it
//! exercises the full pipeline (path model, config, prune database,
//! analyzer, scheduler, recovery) against whatever [`TestRegistry`] it is
//! given, which is empty by default. A project that wants real coverage
//! links `truss-runtime` directly and builds its own binary that
//! registers real [`truss_runtime::TestCase`]s and calls
//! [`run_harness`] itself — the same "library, not a magic test
//! discoverer" shape as this workspace's other embeddable harness-style
//! crates.

use std::path::{Path, PathBuf};

use truss_core::{ProjectPaths, ProjectPathsInit, TrussConfig};
use truss_runtime::{RunOptions, RunReport, TestRegistry};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Walks upward from `start` looking for `Truss.toml`.
pub fn locate_project_root(start: &Path) -> CliResult<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join("Truss.toml").is_file() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(CliError::ProjectRootNotFound(start.to_path_buf()));
        }
    }
}

pub fn load_config(root: &Path) -> CliResult<TrussConfig> {
    let path = root.join("Truss.toml");
    Ok(TrussConfig::load(&path)?)
}

/// Builds the path model using this workspace's fixed main-source/
/// common-includes naming convention (`main.cpp` / `common_includes.hpp`
/// directly under `source/<lower(project_name)>`), the same convention
/// `truss-core`'s own fixtures use.
pub fn discover_paths(root: &Path, project_name: &str) -> CliResult<ProjectPaths> {
    Ok(ProjectPaths::new(
        root,
        project_name,
        ProjectPathsInit {
            main_source: PathBuf::from("main.cpp"),
            ancillary_mains: vec![],
            common_includes: PathBuf::from("common_includes.hpp"),
        },
    )?)
}

/// Resolves the [`RunOptions`] this invocation should use from the global
/// CLI flags and the project config, honoring `--serial` as an override.
pub fn resolve_run_options(cli: &Cli, config: &TrussConfig, cutoff_override: Option<&str>) -> RunOptions {
    let concurrency = if cli.serial {
        truss_core::ConcurrencyMode::Serial
    } else {
        match config.effective_concurrency() {
            "serial" => truss_core::ConcurrencyMode::Serial,
            "suite" => truss_core::ConcurrencyMode::Suite,
            "test" => truss_core::ConcurrencyMode::Test,
            _ => truss_core::ConcurrencyMode::Dynamic,
        }
    };

    RunOptions {
        concurrency,
        recovery: false,
        prune_enabled: config.effective_prune_enabled(),
        update_materials: false,
        include_cutoff: cutoff_override
            .unwrap_or_else(|| config.effective_include_cutoff())
            .to_string(),
        additional_analysis_roots: Vec::new(),
        max_parallelism: cli.async_depth,
    }
}

/// Expands a `select` argument against `tests_root`: an absolute path
/// selects itself directly, a relative one is resolved as a glob pattern
/// (matching the way `drift-core`'s own project detection treats a bare
/// filename as a degenerate one-match glob) so `select "Maths/*Test.cpp"`
/// selects every matching test source, not just a single file.
pub fn expand_selection(tests_root: &Path, source: &Path) -> CliResult<Vec<PathBuf>> {
    if source.is_absolute() {
        return Ok(vec![source.to_path_buf()]);
    }

    let pattern = tests_root.join(source);
    let pattern_str = pattern.to_string_lossy().into_owned();
    let mut matches: Vec<PathBuf> = glob::glob(&pattern_str)
        .map_err(|e| CliError::GlobPattern(pattern_str.clone(), e.to_string()))?
        .filter_map(|entry| entry.ok())
        .collect();

    if matches.is_empty() {
        // No glob match (or a literal filename that doesn't exist yet as
        // a glob-expandable entry) falls back to the literal join, so a
        // plain `select Stuff/FooTest.cpp` still behaves as a direct path
        // even before the file is scanned.
        matches.push(pattern);
    }

    matches.sort();
    Ok(matches)
}

/// The reusable entry point a project's own test binary calls after
/// registering its real test bodies.
pub fn run_harness(
    paths: &ProjectPaths,
    compiler: &str,
    registry: &TestRegistry,
    options: &RunOptions,
) -> CliResult<RunReport> {
    Ok(truss_runtime::run(paths, compiler, registry, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_pattern_selects_every_matching_test() {
        let dir = tempfile::tempdir().unwrap();
        let tests_root = dir.path();
        std::fs::create_dir_all(tests_root.join("Maths")).unwrap();
        std::fs::write(tests_root.join("Maths/ProbabilityTest.cpp"), "").unwrap();
        std::fs::write(tests_root.join("Maths/VectorTest.cpp"), "").unwrap();
        std::fs::write(tests_root.join("Maths/VectorTest.hpp"), "").unwrap();

        let matches = expand_selection(tests_root, Path::new("Maths/*Test.cpp")).unwrap();
        assert_eq!(
            matches,
            vec![
                tests_root.join("Maths/ProbabilityTest.cpp"),
                tests_root.join("Maths/VectorTest.cpp"),
            ]
        );
    }

    #[test]
    fn literal_path_with_no_glob_match_falls_back_to_direct_join() {
        let dir = tempfile::tempdir().unwrap();
        let tests_root = dir.path();

        let matches = expand_selection(tests_root, Path::new("Stuff/FooTest.cpp")).unwrap();
        assert_eq!(matches, vec![tests_root.join("Stuff/FooTest.cpp")]);
    }

    #[test]
    fn absolute_source_selects_itself_without_globbing() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("Anywhere/FooTest.cpp");

        let matches = expand_selection(dir.path(), &absolute).unwrap();
        assert_eq!(matches, vec![absolute]);
    }
}
