//! # truss-core
//!
//! Foundation crate for the truss test-orchestration runtime. Defines the
//! project path model, configuration, and the shared error/data types every
//! other crate in the workspace depends on.

pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use config::TrussConfig;
pub use error::{ConfigError, PathModelError};
pub use path::{ProjectPaths, ProjectPathsInit, PROTECTED_MATERIALS_EXT};
pub use types::{
    CheckMode, CheckRecord, ConcurrencyMode, FxHashMap, FxHashSet, ResolvedConcurrency,
    TestIdentity,
};
