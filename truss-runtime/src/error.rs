//! Runner-level error taxonomy.

use truss_analysis::AnalyzerError;
use truss_core::{ConfigError, PathModelError};
use truss_storage::PruneError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("inconsistent arguments: {0}")]
    InconsistentArguments(String),

    #[error("not yet implemented: {0}")]
    NotImplemented(&'static str),

    #[error("no test or suite matched the given selection: {0}")]
    SelectionNotFound(String),

    #[error(transparent)]
    PathModel(#[from] PathModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error("io error in the runner: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate test registered: suite={suite} test={test} source={source}")]
    DuplicateTest {
        suite: String,
        test: String,
        source: std::path::PathBuf,
    },
}

impl RunnerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InconsistentArguments(_) => "INCONSISTENT_ARGUMENTS",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::SelectionNotFound(_) => "SELECTION_NOT_FOUND",
            Self::PathModel(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Analyzer(e) => e.error_code(),
            Self::Prune(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::DuplicateTest { .. } => "DUPLICATE_TEST",
        }
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
