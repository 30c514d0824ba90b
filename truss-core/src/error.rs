//! Shared error taxonomy.
//!
//! Each fallible boundary gets its own `thiserror` enum with an inherent
//! `error_code()` so callers can match on a stable string independently of
//! the `Display` message. `truss-cli`'s own `CliError` is the top-level
//! enum that converts these into a process exit code.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PathModelError {
    #[error("project root does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("required directory missing: {0}")]
    MissingDir(PathBuf),

    #[error("required file missing: {0}")]
    MissingFile(PathBuf),

    #[error("path {0} is not contained within the project root")]
    OutsideRoot(PathBuf),

    #[error("io error reading project layout: {0}")]
    Io(#[from] std::io::Error),
}

impl PathModelError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RootNotFound(_) => "ROOT_NOT_FOUND",
            Self::MissingDir(_) => "MISSING_DIR",
            Self::MissingFile(_) => "MISSING_FILE",
            Self::OutsideRoot(_) => "OUTSIDE_ROOT",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Invalid(String),

    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "CONFIG_INVALID",
            Self::Io(_) => "IO_ERROR",
            Self::TomlParse(_) => "CONFIG_PARSE_ERROR",
        }
    }
}

