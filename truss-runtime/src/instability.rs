//! Instability analysis: run the same selection `N` times across
//! independent worker-group replicas, then aggregate to find tests whose
//! outcome wasn't constant.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use truss_core::FxHashMap;
use truss_storage::PruneDatabase;

use crate::dispatch::{run_one, TestOutcome};
use crate::error::RunnerResult;
use crate::registry::TestCase;

#[derive(Debug, Clone)]
pub struct UnstableTest {
    pub path: PathBuf,
    pub failure_rate: f64,
}

impl UnstableTest {
    /// Renders as `"60% / 40%"` (failure / pass), matching the documented
    /// reporting format.
    pub fn describe(&self) -> String {
        let fail_pct = (self.failure_rate * 100.0).round() as i64;
        let pass_pct = 100 - fail_pct;
        format!("{fail_pct}% / {pass_pct}%")
    }
}

#[derive(Debug, Clone)]
pub struct InstabilityReport {
    pub replicas: usize,
    pub aggregate_failures: BTreeSet<PathBuf>,
    pub aggregate_passes: Option<BTreeSet<PathBuf>>,
    pub unstable: Vec<UnstableTest>,
}

/// Runs `tests` `replicas` times as independent worker groups (replicas
/// run concurrently with each other; within a replica, tests run
/// serially — instability-sandbox mode disables the usual per-test
/// concurrency, per §5), writing each replica's outcome into its own
/// `instability_analysis/<replica>/` subdirectory, then aggregates.
pub fn run_instability(
    prune_db: &PruneDatabase,
    tests_root: &Path,
    tests: &[&TestCase],
    replicas: usize,
) -> RunnerResult<InstabilityReport> {
    prune_db.setup_instability_folder()?;

    let per_replica: Vec<Vec<(usize, TestOutcome)>> = (0..replicas)
        .into_par_iter()
        .map(|_| {
            tests
                .iter()
                .enumerate()
                .map(|(idx, test)| (idx, run_one(test, None)))
                .collect()
        })
        .collect();

    let rel_paths: Vec<PathBuf> = tests
        .iter()
        .map(|t| {
            t.identity
                .source_file_path
                .strip_prefix(tests_root)
                .unwrap_or(&t.identity.source_file_path)
                .to_path_buf()
        })
        .collect();

    for (replica, outcomes) in per_replica.iter().enumerate() {
        let executed: BTreeSet<PathBuf> = rel_paths.iter().cloned().collect();
        let failed: BTreeSet<PathBuf> = outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.passed())
            .map(|(idx, _)| rel_paths[*idx].clone())
            .collect();
        let passed: BTreeSet<PathBuf> = executed.difference(&failed).cloned().collect();
        prune_db.store_replica(replica, &failed, &passed)?;
    }

    let (aggregate_failures, aggregate_passes) = prune_db.aggregate_instability(replicas)?;

    let mut failure_counts: FxHashMap<PathBuf, usize> = FxHashMap::default();
    for outcomes in &per_replica {
        for (idx, outcome) in outcomes {
            if !outcome.passed() {
                *failure_counts.entry(rel_paths[*idx].clone()).or_insert(0) += 1;
            }
        }
    }

    let mut unstable: Vec<UnstableTest> = failure_counts
        .into_iter()
        .filter(|(_, count)| *count > 0 && *count < replicas)
        .map(|(path, count)| UnstableTest {
            path,
            failure_rate: count as f64 / replicas as f64,
        })
        .collect();
    unstable.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(InstabilityReport {
        replicas,
        aggregate_failures,
        aggregate_passes,
        unstable,
    })
}
