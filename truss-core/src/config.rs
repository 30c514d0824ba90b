//! Project configuration (`Truss.toml`).
//!
//! Every field is optional in the file; an `effective_*()` accessor supplies
//! the documented default. CLI flags override the corresponding field for a
//! single invocation rather than mutating the file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrussConfig {
    /// Project name used to derive `source_project`.
    pub project_name: Option<String>,
    /// Concurrency mode: "serial", "suite", "test", or "dynamic".
    pub concurrency: Option<String>,
    /// Number of instability-analysis replicas for `locate`.
    pub instability_replicas: Option<usize>,
    /// Token that terminates include scanning early; empty scans the whole file.
    pub include_cutoff: Option<String>,
    /// Whether `prune` is consulted automatically on `run` when no explicit
    /// selection is given.
    pub prune_enabled: Option<bool>,
}

impl TrussConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn effective_concurrency(&self) -> &str {
        self.concurrency.as_deref().unwrap_or("dynamic")
    }

    pub fn effective_instability_replicas(&self) -> usize {
        self.instability_replicas.unwrap_or(2)
    }

    pub fn effective_include_cutoff(&self) -> &str {
        self.include_cutoff.as_deref().unwrap_or("")
    }

    pub fn effective_prune_enabled(&self) -> bool {
        self.prune_enabled.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_empty() {
        let cfg: TrussConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.effective_concurrency(), "dynamic");
        assert_eq!(cfg.effective_instability_replicas(), 2);
        assert!(cfg.effective_prune_enabled());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg: TrussConfig = toml::from_str(
            r#"
            concurrency = "serial"
            instability_replicas = 5
            prune_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.effective_concurrency(), "serial");
        assert_eq!(cfg.effective_instability_replicas(), 5);
        assert!(!cfg.effective_prune_enabled());
    }
}
