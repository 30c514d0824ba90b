//! `truss` — the standalone command-line front end.
//!
//! Parses the nested subcommand tree, wires it to the runner library, and
//! owns the process exit code. This binary registers no compiled test
//! bodies of its own (test/materials generation is out of scope, §1 of
//! SPEC_FULL.md) — a project that wants real coverage links
//! `truss-runtime` directly and builds its own binary around
//! [`truss_cli::harness::run_harness`], registering real
//! [`truss_runtime::TestCase`]s before calling it. This binary still
//! exercises the full pipeline (path model, config, prune database,
//! analyzer, scheduler, recovery) end to end, just against whichever
//! registry its caller built — an empty one here.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use truss_cli::cli::{Cli, Command};
use truss_cli::error::{CliError, CliResult, EXIT_INFRASTRUCTURE_ERROR, EXIT_OK};
use truss_cli::harness::{
    discover_paths, expand_selection, load_config, locate_project_root, resolve_run_options,
};
use truss_cli::init::{self, InitOptions};
use truss_core::TrussConfig;
use truss_runtime::{
    read_dump_file, read_recovery_file, recovery_dir_under, run_instability, RunnerError,
    Summary, TestRegistry,
};
use truss_storage::PruneDatabase;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(code = err.error_code(), "{err}");
            eprintln!("error[{}]: {err}", err.error_code());
            std::process::exit(EXIT_INFRASTRUCTURE_ERROR);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Dispatches one parsed invocation, returning the process exit code.
fn dispatch(cli: &Cli) -> CliResult<i32> {
    match &cli.command {
        Command::Init {
            copyright,
            path,
            to_files,
            no_ide,
            no_git,
        } => run_init(copyright, path, *to_files, *no_ide, *no_git),

        Command::Test { suite } => {
            let (paths, config) = open_project()?;
            let mut registry = TestRegistry::new();
            registry.select_by_suite(suite);
            run_and_report(cli, &paths, &config, &registry, None)
        }

        Command::Select { source } => {
            let (paths, config) = open_project()?;
            let mut registry = TestRegistry::new();
            for matched in expand_selection(paths.tests_root(), source)? {
                registry.select_by_source(&matched);
            }
            run_and_report(cli, &paths, &config, &registry, None)
        }

        Command::Prune { cutoff } => {
            let (paths, config) = open_project()?;
            let registry = TestRegistry::new();
            run_and_report(cli, &paths, &config, &registry, cutoff.as_deref())
        }

        Command::Locate { n, sandbox } => {
            let (paths, config) = open_project()?;
            locate_instability(cli, &paths, &config, *n, *sandbox)
        }

        Command::UpdateMaterials => {
            let (paths, config) = open_project()?;
            let registry = TestRegistry::new();
            let mut options = resolve_run_options(cli, &config, None);
            options.update_materials = true;
            run_report(&paths, &registry, &options)
        }

        Command::Recover => {
            let (paths, _config) = open_project()?;
            let dir = recovery_dir_under(paths.output_root());
            let text = read_recovery_file(&dir)?;
            if text.is_empty() {
                println!("no recovery state recorded");
            } else {
                println!("{text}");
            }
            Ok(EXIT_OK)
        }

        Command::Dump => {
            let (paths, _config) = open_project()?;
            let dir = recovery_dir_under(paths.output_root());
            let text = read_dump_file(&dir)?;
            print!("{text}");
            Ok(EXIT_OK)
        }

        Command::Create { kind } => {
            // Argument parsing and validation for `create` is in scope;
            // the generation body itself is out of scope (§1) — report
            // the missing collaborator rather than silently no-op-ing.
            Err(CliError::Runner(RunnerError::NotImplemented(kind.name())))
        }
    }
}

fn run_init(copyright: &str, path: &Path, to_files: bool, no_ide: bool, no_git: bool) -> CliResult<i32> {
    let project_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string();

    std::fs::create_dir_all(path)?;
    init::scaffold(
        path,
        &InitOptions {
            copyright: copyright.to_string(),
            project_name,
            to_files,
            no_ide,
            no_git,
        },
    )?;
    println!("initialized truss project at {}", path.display());
    Ok(EXIT_OK)
}

/// Locates the project root from the current directory, loads
/// `Truss.toml`, and builds the path model from its `project_name`.
fn open_project() -> CliResult<(truss_core::ProjectPaths, TrussConfig)> {
    let cwd = std::env::current_dir()?;
    let root = locate_project_root(&cwd)?;
    let config = load_config(&root)?;
    let project_name = config
        .project_name
        .clone()
        .ok_or_else(|| CliError::MissingProjectName(root.join("Truss.toml")))?;
    let paths = discover_paths(&root, &project_name)?;
    Ok((paths, config))
}

fn run_and_report(
    cli: &Cli,
    paths: &truss_core::ProjectPaths,
    config: &TrussConfig,
    registry: &TestRegistry,
    cutoff_override: Option<&str>,
) -> CliResult<i32> {
    let options = resolve_run_options(cli, config, cutoff_override);
    run_report(paths, registry, &options)
}

fn run_report(
    paths: &truss_core::ProjectPaths,
    registry: &TestRegistry,
    options: &truss_runtime::RunOptions,
) -> CliResult<i32> {
    let compiler = truss_runtime::detect_compiler_tag();
    let report = truss_cli::harness::run_harness(paths, compiler, registry, options)?;

    print_summary(&report.grand_total);
    for suite in &report.suite_summaries {
        print_summary(suite);
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    // Per the documented exit-code contract: a completed run exits 0 even
    // when it recorded test failures — those are reported in the summary,
    // not surfaced as a process error.
    Ok(EXIT_OK)
}

fn print_summary(summary: &Summary) {
    println!(
        "{}: {} checks, {} failures ({} critical), {}",
        summary.name,
        summary.total_checks(),
        summary.failures,
        summary.critical_failures,
        truss_runtime::format_duration(summary.duration),
    );
}

fn locate_instability(
    cli: &Cli,
    paths: &truss_core::ProjectPaths,
    config: &TrussConfig,
    n: usize,
    sandbox: bool,
) -> CliResult<i32> {
    let mut options = resolve_run_options(cli, config, None);
    if sandbox {
        options.concurrency = truss_core::ConcurrencyMode::Serial;
    }

    let compiler = truss_runtime::detect_compiler_tag();
    let build_dir = paths.build_dir(compiler);
    let prune_db = PruneDatabase::open(&build_dir).map_err(RunnerError::from)?;

    // An empty registry (this binary registers no compiled tests) means
    // an empty selection; a real embedding project's registry would feed
    // its actual prune-selected or explicitly-selected tests here.
    let registry = TestRegistry::new();
    let selected = registry.iter_selected();

    let report = run_instability(&prune_db, paths.tests_root(), &selected, n)?;

    println!("ran {} replicas over {} tests", report.replicas, selected.len());
    if report.unstable.is_empty() {
        println!("no unstable tests detected");
    }
    for unstable in &report.unstable {
        println!("{}: {}", unstable.path.display(), unstable.describe());
    }
    let mut failures: Vec<&PathBuf> = report.aggregate_failures.iter().collect();
    failures.sort();
    for failure in failures {
        println!("failed in at least one replica: {}", failure.display());
    }

    Ok(EXIT_OK)
}
