//! The recovery journal: on-disk context for post-mortem debugging when a
//! test crashes the whole process (an abort, not a catchable panic).
//!
//! Files live in `output/recovery/` — `recovery.txt` records the last
//! check description entered, truncated fresh before every run; `dump.txt`
//! accumulates free-form diagnostic text appended across the run. There is
//! no synchronisation beyond "one test at a time in recovery mode" — the
//! runner disables concurrency whenever recovery is active (see
//! [`crate::scheduler`]).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::RunnerResult;

const RECOVERY_FILE: &str = "recovery.txt";
const DUMP_FILE: &str = "dump.txt";

pub struct RecoveryJournal {
    dir: PathBuf,
}

impl RecoveryJournal {
    /// Creates `dir` if needed and truncates the recovery file, ready for
    /// a fresh run.
    pub fn new(dir: impl Into<PathBuf>) -> RunnerResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(RECOVERY_FILE), "")?;
        Ok(Self { dir })
    }

    /// Overwrites the recovery file with `description` — the last check
    /// entered before a possible crash.
    pub fn enter(&self, description: &str) -> RunnerResult<()> {
        std::fs::write(self.recovery_path(), description)?;
        Ok(())
    }

    /// Appends `text` to the dump file.
    pub fn dump(&self, text: &str) -> RunnerResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dump_path())?;
        writeln!(file, "{text}")?;
        Ok(())
    }

    pub fn recovery_path(&self) -> PathBuf {
        self.dir.join(RECOVERY_FILE)
    }

    pub fn dump_path(&self) -> PathBuf {
        self.dir.join(DUMP_FILE)
    }

    pub fn read_recovery(&self) -> RunnerResult<String> {
        Ok(std::fs::read_to_string(self.recovery_path())?)
    }

    pub fn read_dump(&self) -> RunnerResult<String> {
        match std::fs::read_to_string(self.dump_path()) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn recovery_dir_under(output_root: &Path) -> PathBuf {
    output_root.join("recovery")
}

/// Reads whatever a previous (possibly crashed) run left in `recovery.txt`
/// under `dir`, without creating or truncating it — unlike
/// [`RecoveryJournal::new`], which resets state for a fresh run. Empty if
/// the directory or file doesn't exist yet.
pub fn read_recovery_file(dir: &Path) -> RunnerResult<String> {
    match std::fs::read_to_string(dir.join(RECOVERY_FILE)) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Reads whatever a previous run appended to `dump.txt` under `dir`,
/// without touching it. Empty if the directory or file doesn't exist yet.
pub fn read_dump_file(dir: &Path) -> RunnerResult<String> {
    match std::fs::read_to_string(dir.join(DUMP_FILE)) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
