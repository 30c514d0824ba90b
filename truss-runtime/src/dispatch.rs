//! Dispatch of a single test and the concurrent fan-out over many. A test
//! panic is caught at this boundary — the way this workspace's detector
//! registry catches a panicking detector rather than losing the whole
//! run — and turned into a critical failure on that test's logger; it
//! never stops the remaining tests.

use std::any::Any;
use std::time::Instant;

use crate::logger::CheckLog;
use crate::recovery::RecoveryJournal;
use crate::registry::TestCase;
use crate::summary::Summary;
use truss_core::ResolvedConcurrency;

/// Outcome of dispatching one test.
pub struct TestOutcome {
    pub summary: Summary,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.summary.is_success()
    }
}

/// Runs one test to completion, catching a panic and recording it as a
/// critical failure rather than letting it unwind past this point.
pub fn run_one(test: &TestCase, journal: Option<&RecoveryJournal>) -> TestOutcome {
    if let Some(journal) = journal {
        let _ = journal.enter(&test.identity.test_name);
    }

    let log = CheckLog::new();
    let start = Instant::now();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        (test.body)(&log);
    }));
    let duration = start.elapsed();

    if let Err(payload) = result {
        let message = panic_message(&payload);
        log.record_critical_failure(&test.identity.test_name, &message);
        if let Some(journal) = journal {
            let _ = journal.dump(&format!(
                "{}: {message}",
                test.identity.test_name
            ));
        }
    }

    let summary = log.summarize(&test.identity.test_name, duration);
    TestOutcome { summary }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Dispatches `tests` according to `mode`, returning `(original_index,
/// outcome)` pairs re-sorted back into the order `tests` was given in —
/// regardless of the order in which the underlying tasks actually
/// completed. Never called with [`ResolvedConcurrency::Serial`]; the
/// caller handles that case inline since it needs no thread pool.
///
/// `max_parallelism`, when set (the CLI's `--async-depth`), bounds how
/// many worker threads the dispatch scope may use at once by running it
/// inside a dedicated `rayon` thread pool of that width instead of the
/// process-wide default pool.
pub fn dispatch_concurrent(
    tests: &[&TestCase],
    mode: ResolvedConcurrency,
    max_parallelism: Option<usize>,
) -> Vec<(usize, TestOutcome)> {
    let (tx, rx) = crossbeam_channel::unbounded();

    // A bounded `--async-depth` runs the scope inside a dedicated pool of
    // that width instead of the process-wide default pool.
    let bounded_pool = max_parallelism.map(|n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n.max(1))
            .build()
            .expect("building a bounded rayon thread pool for --async-depth")
    });

    match mode {
        ResolvedConcurrency::Test => {
            let body = |scope: &rayon::Scope| {
                for (idx, test) in tests.iter().enumerate() {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = run_one(test, None);
                        let _ = tx.send((idx, outcome));
                    });
                }
            };
            match &bounded_pool {
                Some(pool) => pool.scope(body),
                None => rayon::scope(body),
            }
        }
        ResolvedConcurrency::Suite => {
            let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
            for (idx, test) in tests.iter().enumerate() {
                let suite = test.identity.suite_name.as_str();
                match groups.iter_mut().find(|(name, _)| *name == suite) {
                    Some((_, idxs)) => idxs.push(idx),
                    None => groups.push((suite, vec![idx])),
                }
            }

            let body = |scope: &rayon::Scope| {
                for (_, idxs) in groups {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        for idx in idxs {
                            let outcome = run_one(tests[idx], None);
                            let _ = tx.send((idx, outcome));
                        }
                    });
                }
            };
            match &bounded_pool {
                Some(pool) => pool.scope(body),
                None => rayon::scope(body),
            }
        }
        ResolvedConcurrency::Serial => unreachable!("caller dispatches serial mode inline"),
    }

    drop(tx);
    let mut results: Vec<(usize, TestOutcome)> = rx.into_iter().collect();
    results.sort_by_key(|(idx, _)| *idx);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use truss_core::TestIdentity;

    fn case(suite: &str, test: &str, panics: bool) -> TestCase {
        TestCase {
            identity: TestIdentity {
                suite_name: suite.to_string(),
                test_name: test.to_string(),
                source_file_path: PathBuf::from(format!("{suite}/{test}.cpp")),
            },
            body: Arc::new(move |log: &CheckLog| {
                if panics {
                    panic!("boom");
                }
                log.check_equal("trivial", &1, &1);
            }),
        }
    }

    #[test]
    fn a_panicking_test_is_recorded_as_a_critical_failure() {
        let test = case("Maths", "Blows", true);
        let outcome = run_one(&test, None);
        assert!(!outcome.passed());
        assert_eq!(outcome.summary.critical_failures, 1);
    }

    #[test]
    fn a_passing_test_has_no_failures() {
        let test = case("Maths", "Fine", false);
        let outcome = run_one(&test, None);
        assert!(outcome.passed());
    }

    #[test]
    fn concurrent_results_are_resequenced_to_registration_order() {
        let cases = vec![case("A", "1", false), case("A", "2", true), case("A", "3", false)];
        let refs: Vec<&TestCase> = cases.iter().collect();
        let results = dispatch_concurrent(&refs, ResolvedConcurrency::Test, None);

        let indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(results[0].1.passed());
        assert!(!results[1].1.passed());
        assert!(results[2].1.passed());
    }
}
