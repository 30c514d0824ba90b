#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("io error in prune database: {0}")]
    Io(#[from] std::io::Error),

    #[error("prune database at {0} is locked by another process")]
    Locked(std::path::PathBuf),

    #[error("system time is before UNIX_EPOCH")]
    InvalidTime(#[from] std::time::SystemTimeError),
}

impl PruneError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Locked(_) => "PRUNE_LOCKED",
            Self::InvalidTime(_) => "INVALID_TIME",
        }
    }
}

pub type PruneResult<T> = Result<T, PruneError>;
