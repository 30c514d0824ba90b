//! CLI-level error taxonomy and exit codes.

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    PathModel(#[from] truss_core::PathModelError),

    #[error(transparent)]
    Config(#[from] truss_core::ConfigError),

    #[error(transparent)]
    Runner(#[from] truss_runtime::RunnerError),

    #[error("project root not found starting from {0}: no Truss.toml in any ancestor")]
    ProjectRootNotFound(std::path::PathBuf),

    #[error("Truss.toml at {0} does not set project_name")]
    MissingProjectName(std::path::PathBuf),

    #[error("invalid glob pattern {0}: {1}")]
    GlobPattern(String, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PathModel(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Runner(e) => e.error_code(),
            Self::ProjectRootNotFound(_) => "PROJECT_ROOT_NOT_FOUND",
            Self::MissingProjectName(_) => "MISSING_PROJECT_NAME",
            Self::GlobPattern(..) => "GLOB_PATTERN_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// `0` on success (including recorded-but-completed test failures — those
/// are reported via [`truss_runtime::RunReport`], not this error type);
/// non-zero on every infrastructure error this enum names.
pub const EXIT_OK: i32 = 0;
pub const EXIT_INFRASTRUCTURE_ERROR: i32 = 2;
