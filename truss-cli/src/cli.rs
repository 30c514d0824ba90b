//! The nested subcommand tree, built with `clap`'s derive API.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "truss", version, about = "Static dependency-aware test orchestration")]
pub struct Cli {
    /// Force serial dispatch, overriding the configured concurrency mode.
    #[arg(long, global = true)]
    pub serial: bool,

    /// Bounds the width of the thread pool used for concurrent dispatch
    /// (the number of tests or suites that may run at once); the
    /// concurrency mode itself (serial/suite/test/dynamic) is unaffected.
    /// Unset uses the process-wide default pool.
    #[arg(long = "async-depth", global = true)]
    pub async_depth: Option<usize>,

    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the run set from a suite name and execute it.
    Test { suite: String },

    /// Build the run set from a test source file (or glob pattern,
    /// relative to the tests root) and execute it.
    Select { source: PathBuf },

    /// Consult the prune database (no explicit selection) and execute the
    /// resulting run set. `--cutoff` sets the include-scan cutoff token.
    Prune {
        #[arg(long)]
        cutoff: Option<String>,
    },

    /// Run the current selection (or everything, if pruning is disabled
    /// and nothing was selected) `n` times across independent replicas to
    /// detect non-deterministic outcomes.
    Locate {
        n: usize,
        /// Forces serial dispatch within each replica.
        #[arg(long)]
        sandbox: bool,
    },

    /// Scaffold a fresh project layout and a default `Truss.toml`.
    Init {
        copyright: String,
        path: PathBuf,
        #[arg(long = "to-files")]
        to_files: bool,
        #[arg(long = "no-ide")]
        no_ide: bool,
        #[arg(long = "no-git")]
        no_git: bool,
    },

    /// Generate test/source scaffolding (out of scope: parsed and
    /// validated, body not implemented).
    Create {
        #[command(subcommand)]
        kind: CreateKind,
    },

    /// Soft-copy each run test's working materials back into prediction.
    #[command(alias = "u", name = "update-materials")]
    UpdateMaterials,

    /// Print the last-entered check description from the recovery
    /// journal.
    Recover,

    /// Print the accumulated recovery dump text.
    Dump,
}

#[derive(Debug, Subcommand)]
pub enum CreateKind {
    RegularTest(CreateArgs),
    MoveOnlyTest(CreateArgs),
    RegularAllocationTest(CreateArgs),
    MoveOnlyAllocationTest(CreateArgs),
    FreeTest(CreateArgs),
    PerformanceTest(CreateArgs),
}

impl CreateKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegularTest(_) => "regular_test",
            Self::MoveOnlyTest(_) => "move_only_test",
            Self::RegularAllocationTest(_) => "regular_allocation_test",
            Self::MoveOnlyAllocationTest(_) => "move_only_allocation_test",
            Self::FreeTest(_) => "free_test",
            Self::PerformanceTest(_) => "performance_test",
        }
    }
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(short = 'f', long = "family")]
    pub family: Option<String>,

    #[arg(long = "class-header", alias = "ch")]
    pub class_header: Option<String>,

    #[arg(long = "forename")]
    pub forename: Option<String>,

    #[arg(short = 'e', long = "equivalent-type")]
    pub equivalent_type: Option<String>,

    #[arg(long = "gen-source")]
    pub gen_source: bool,
}
