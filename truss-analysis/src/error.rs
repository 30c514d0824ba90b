use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("test executable {exe} is out of date with respect to {newer}")]
    ExecutableOutOfDate { exe: PathBuf, newer: PathBuf },

    #[error("io error during dependency analysis: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Prune(#[from] truss_storage::PruneError),
}

impl AnalyzerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExecutableOutOfDate { .. } => "EXECUTABLE_OUT_OF_DATE",
            Self::Io(_) => "IO_ERROR",
            Self::Prune(e) => e.error_code(),
        }
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
