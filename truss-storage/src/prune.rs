//! The prune database: a per-build-directory record of the last successful
//! run's timestamp, the tests that failed, the tests observed to pass, and
//! include paths the dependency analyzer could not resolve.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::PruneResult;
use crate::fileset::{read_set, write_set};
use crate::lock::PruneLock;

const STAMP_FILE: &str = "stamp";
const FAILURES_FILE: &str = "failures";
const PASSES_FILE: &str = "passes";
const EXTERNALS_FILE: &str = "external_dependencies";
const INSTABILITY_DIR: &str = "instability_analysis";

/// Snapshot of a prune database as of the last `store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneState {
    pub stamp_time: SystemTime,
    pub failures: BTreeSet<PathBuf>,
    pub passes: BTreeSet<PathBuf>,
    pub externals: BTreeSet<PathBuf>,
}

/// Handle onto one build directory's prune records.
pub struct PruneDatabase {
    dir: PathBuf,
    _lock: PruneLock,
}

impl PruneDatabase {
    /// Opens (creating if absent) the prune directory under `build_dir` and
    /// takes the advisory write lock for the lifetime of this handle.
    pub fn open(build_dir: &Path) -> PruneResult<Self> {
        let dir = build_dir.join("prune");
        let mut lock = PruneLock::new(&dir)?;
        lock.acquire_write()?;
        Ok(Self { dir, _lock: lock })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Modification time of the passes file, used by the passing-test
    /// reprieve check: a test's inputs must all predate this time for the
    /// reprieve to apply.
    pub fn passes_last_modified(&self) -> PruneResult<Option<SystemTime>> {
        match std::fs::metadata(self.passes_path()) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stamp_path(&self) -> PathBuf {
        self.dir.join(STAMP_FILE)
    }

    fn failures_path(&self) -> PathBuf {
        self.dir.join(FAILURES_FILE)
    }

    fn passes_path(&self) -> PathBuf {
        self.dir.join(PASSES_FILE)
    }

    fn externals_path(&self) -> PathBuf {
        self.dir.join(EXTERNALS_FILE)
    }

    /// Returns `None` when no stamp file exists — "run everything".
    pub fn load(&self) -> PruneResult<Option<PruneState>> {
        let stamp_path = self.stamp_path();
        let stamp_time = match std::fs::metadata(&stamp_path) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(PruneState {
            stamp_time,
            failures: read_set(&self.failures_path())?,
            passes: read_set(&self.passes_path())?,
            externals: read_set(&self.externals_path())?,
        }))
    }

    /// Union-updates passes with `executed \ new_failures`; replaces
    /// failures with `failures ∪ new_failures`, less anything that just
    /// passed; rewrites the stamp file's modification time to `stamp_time`.
    ///
    /// `new_failures` must be a subset of `executed` — every failing test
    /// was, by definition, executed.
    pub fn store(
        &self,
        new_failures: &BTreeSet<PathBuf>,
        executed: &BTreeSet<PathBuf>,
        stamp_time: SystemTime,
    ) -> PruneResult<()> {
        let previous = self.load()?;
        let (prev_failures, prev_passes) = match previous {
            Some(s) => (s.failures, s.passes),
            None => (BTreeSet::new(), BTreeSet::new()),
        };

        let newly_passing: BTreeSet<PathBuf> = executed.difference(new_failures).cloned().collect();

        let mut passes: BTreeSet<PathBuf> = prev_passes.union(&newly_passing).cloned().collect();
        for f in new_failures {
            passes.remove(f);
        }

        let mut failures: BTreeSet<PathBuf> = prev_failures.union(new_failures).cloned().collect();
        for p in &passes {
            failures.remove(p);
        }

        write_set(&self.failures_path(), &failures)?;
        write_set(&self.passes_path(), &passes)?;
        touch(&self.stamp_path(), stamp_time)?;

        tracing::info!(
            failures = failures.len(),
            passes = passes.len(),
            "prune database updated"
        );

        Ok(())
    }

    pub fn store_externals(&self, externals: &BTreeSet<PathBuf>) -> PruneResult<()> {
        write_set(&self.externals_path(), externals)
    }

    fn instability_dir(&self, replica: usize) -> PathBuf {
        self.dir.join(INSTABILITY_DIR).join(replica.to_string())
    }

    /// Removes and recreates the `instability_analysis/` subdirectory so a
    /// fresh set of replicas starts from a clean slate.
    pub fn setup_instability_folder(&self) -> PruneResult<()> {
        let dir = self.dir.join(INSTABILITY_DIR);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(())
    }

    pub fn teardown_instability_folder(&self) -> PruneResult<()> {
        let dir = self.dir.join(INSTABILITY_DIR);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn store_replica(
        &self,
        replica: usize,
        failures: &BTreeSet<PathBuf>,
        passes: &BTreeSet<PathBuf>,
    ) -> PruneResult<()> {
        let dir = self.instability_dir(replica);
        std::fs::create_dir_all(&dir)?;
        write_set(&dir.join(FAILURES_FILE), failures)?;
        write_set(&dir.join(PASSES_FILE), passes)?;
        Ok(())
    }

    /// Aggregates `num_replicas` per-replica records: failures union across
    /// all replicas; passes intersect across all replicas. Returns `None`
    /// for the passes set if any replica's passes file is missing (an
    /// incomplete replica makes the intersection meaningless).
    pub fn aggregate_instability(
        &self,
        num_replicas: usize,
    ) -> PruneResult<(BTreeSet<PathBuf>, Option<BTreeSet<PathBuf>>)> {
        let mut aggregate_failures = BTreeSet::new();
        let mut aggregate_passes: Option<BTreeSet<PathBuf>> = None;
        let mut any_missing = false;

        for replica in 0..num_replicas {
            let dir = self.instability_dir(replica);
            let failures_path = dir.join(FAILURES_FILE);
            let passes_path = dir.join(PASSES_FILE);

            aggregate_failures.extend(read_set(&failures_path)?);

            if !passes_path.exists() {
                any_missing = true;
                continue;
            }
            let passes = read_set(&passes_path)?;
            aggregate_passes = Some(match aggregate_passes {
                None => passes,
                Some(acc) => acc.intersection(&passes).cloned().collect(),
            });
        }

        if any_missing {
            aggregate_passes = None;
        }

        Ok((aggregate_failures, aggregate_passes))
    }
}

fn touch(path: &Path, time: SystemTime) -> PruneResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::File::create(path)?;
    }
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_modified(time)?;
    Ok(())
}
