//! The test registry: suite-keyed collection of test instances, with
//! idempotent, accumulating selection by source file or by suite name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use truss_core::{FxHashMap, FxHashSet, TestIdentity};

use crate::error::{RunnerError, RunnerResult};
use crate::logger::CheckLog;

/// A test body is an in-process closure rather than an external-process
/// invocation — the framework's test/materials creator is out of scope
/// (§1), but the runner itself never shells out to run a test.
pub type TestBody = Arc<dyn Fn(&CheckLog) + Send + Sync>;

#[derive(Clone)]
pub struct TestCase {
    pub identity: TestIdentity,
    pub body: TestBody,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct TestRegistry {
    suite_order: Vec<String>,
    suites: FxHashMap<String, Vec<TestCase>>,
    known_triples: FxHashSet<(String, String, PathBuf)>,
    selected_sources: FxHashSet<PathBuf>,
    selected_suites: FxHashSet<String>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a suite's tests, erroring if any `(suite, test, source)` triple
    /// already exists anywhere in the registry. Calling this again for a
    /// suite name already present appends to that suite's test list.
    pub fn add_suite(&mut self, name: &str, tests: Vec<TestCase>) -> RunnerResult<()> {
        for test in &tests {
            let triple = (
                test.identity.suite_name.clone(),
                test.identity.test_name.clone(),
                test.identity.source_file_path.clone(),
            );
            if !self.known_triples.insert(triple) {
                return Err(RunnerError::DuplicateTest {
                    suite: test.identity.suite_name.clone(),
                    test: test.identity.test_name.clone(),
                    source: test.identity.source_file_path.clone(),
                });
            }
        }

        if !self.suites.contains_key(name) {
            self.suite_order.push(name.to_string());
        }
        self.suites.entry(name.to_string()).or_default().extend(tests);
        Ok(())
    }

    /// Selects every test whose canonical source path equals `path`.
    /// Idempotent: selecting the same path twice has no additional effect.
    pub fn select_by_source(&mut self, path: &Path) {
        self.selected_sources.insert(path.to_path_buf());
    }

    pub fn select_by_suite(&mut self, name: &str) {
        self.selected_suites.insert(name.to_string());
    }

    /// Selects every registered test — used when pruning is disabled and
    /// no explicit selection was made.
    pub fn select_all(&mut self) {
        let names: Vec<String> = self.suite_order.clone();
        for name in names {
            self.selected_suites.insert(name);
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_sources.is_empty() || !self.selected_suites.is_empty()
    }

    /// All tests in suite-registration order, then test-registration order
    /// within each suite.
    pub fn iter_all(&self) -> impl Iterator<Item = &TestCase> {
        self.suite_order
            .iter()
            .flat_map(move |name| self.suites.get(name).into_iter().flatten())
    }

    /// The union of every selection made so far, in the same stable
    /// ordering as [`TestRegistry::iter_all`].
    pub fn iter_selected(&self) -> Vec<&TestCase> {
        self.iter_all()
            .filter(|t| {
                self.selected_suites.contains(&t.identity.suite_name)
                    || self.selected_sources.contains(&t.identity.source_file_path)
            })
            .collect()
    }

    pub fn suite_names(&self) -> &[String] {
        &self.suite_order
    }

    pub fn suite_count_in(&self, tests: &[&TestCase]) -> usize {
        let suites: FxHashSet<&str> = tests.iter().map(|t| t.identity.suite_name.as_str()).collect();
        suites.len()
    }
}
