//! The check logger: records every check outcome a test produces while
//! preserving enough context to reproduce a failure message and to detect
//! an in-flight panic.
//!
//! A [`CheckLog`] is created fresh per test and lives only for that test's
//! duration (per the lifecycle note in the data model). [`Sentinel`] is the
//! scope guard tying "a check is currently executing" to a stack value —
//! on unwind, its `Drop` impl records a critical failure naming the last
//! description that was entered, the same drop-based substitute for
//! exception-driven finalization this workspace uses elsewhere for
//! scope-bound cleanup.

use std::cell::RefCell;
use std::fmt::Debug;

use truss_core::{CheckMode, CheckRecord};

use crate::summary::Summary;

#[derive(Debug, Default)]
struct CheckLogInner {
    next_index: usize,
    records: Vec<CheckRecord>,
    standard_checks: usize,
    false_positive_checks: usize,
    false_negative_checks: usize,
    failures: usize,
    critical_failures: usize,
    exceptions: usize,
    diagnostics: String,
    caught_exceptions: String,
    nesting_depth: usize,
    last_entered: Option<String>,
    critical_recorded: bool,
}

/// Per-test accumulator of check outcomes. Not `Sync` — a fresh log is
/// built for each dispatched test, so there is never more than one writer.
#[derive(Debug, Default)]
pub struct CheckLog {
    inner: RefCell<CheckLogInner>,
}

impl CheckLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a logical check scope. The returned [`Sentinel`] finalizes
    /// the scope on drop; only the outermost sentinel (nesting depth back
    /// to zero) performs the panic check, so a check helper that opens its
    /// own nested sentinel doesn't double-record.
    pub fn open_sentinel<'a>(&'a self, description: impl Into<String>) -> Sentinel<'a> {
        let mut inner = self.inner.borrow_mut();
        inner.nesting_depth += 1;
        let is_outermost = inner.nesting_depth == 1;
        let description = description.into();
        inner.last_entered = Some(description.clone());
        Sentinel {
            log: self,
            description,
            is_outermost,
        }
    }

    /// Records a failed check. `kind` selects which sub-counter is bumped
    /// in addition to the overall `failures` tally; `Performance` checks
    /// have no dedicated sub-counter (the summary tracks only standard,
    /// false-positive, and false-negative check counts individually).
    pub fn record_check_failure(&self, kind: CheckMode, message: impl Into<String>) {
        let mut inner = self.inner.borrow_mut();
        let message = message.into();
        let index = inner.next_index;
        inner.next_index += 1;

        inner.diagnostics.push_str(&message);
        inner.diagnostics.push('\n');
        inner.records.push(CheckRecord {
            index,
            message,
            mode: kind,
        });
        inner.failures += 1;
        match kind {
            CheckMode::Standard => inner.standard_checks += 1,
            CheckMode::FalsePositive => inner.false_positive_checks += 1,
            CheckMode::FalseNegative => inner.false_negative_checks += 1,
            CheckMode::Performance => {}
        }
    }

    /// Convenience equality check: records a failure formatted as
    /// "predicted vs obtained" when `expected != actual`, rendering both
    /// via `Debug` (the range/struct-decomposition helpers a richer
    /// value-printer would supply are out of core scope; callers needing
    /// that can format their own message and call
    /// [`CheckLog::record_check_failure`] directly). Returns whether the
    /// check passed.
    pub fn check_equal<T: PartialEq + Debug>(
        &self,
        description: &str,
        expected: &T,
        actual: &T,
    ) -> bool {
        if expected == actual {
            return true;
        }
        self.record_check_failure(
            CheckMode::Standard,
            format!(
                "{description}: operator== returned false\n  predicted: {expected:?}\n  obtained:  {actual:?}"
            ),
        );
        false
    }

    /// Records an unrecoverable failure carrying the in-flight panic's
    /// message. Atomic with respect to further recording in the same
    /// scope: a second call in the same test after the first is a no-op,
    /// matching "exactly-once finalization".
    pub fn record_critical_failure(&self, context: &str, what: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.critical_recorded {
            return;
        }
        inner.critical_recorded = true;
        inner.critical_failures += 1;
        inner.exceptions += 1;
        inner
            .caught_exceptions
            .push_str(&format!("critical failure in {context}: {what}\n"));
    }

    pub fn diagnostics_output(&self) -> String {
        self.inner.borrow().diagnostics.clone()
    }

    pub fn caught_exceptions_output(&self) -> String {
        self.inner.borrow().caught_exceptions.clone()
    }

    pub fn records(&self) -> Vec<CheckRecord> {
        self.inner.borrow().records.clone()
    }

    pub fn summarize(&self, name: &str, duration: std::time::Duration) -> Summary {
        let inner = self.inner.borrow();
        Summary {
            name: name.to_string(),
            standard_checks: inner.standard_checks,
            false_positive_checks: inner.false_positive_checks,
            false_negative_checks: inner.false_negative_checks,
            failures: inner.failures,
            critical_failures: inner.critical_failures,
            exceptions: inner.exceptions,
            duration,
            failure_messages: if inner.diagnostics.is_empty() {
                None
            } else {
                Some(inner.diagnostics.clone())
            },
        }
    }

    fn last_entered(&self) -> Option<String> {
        self.inner.borrow().last_entered.clone()
    }

    fn exit_sentinel(&self, description: &str, is_outermost: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.nesting_depth = inner.nesting_depth.saturating_sub(1);
        drop(inner);

        if is_outermost && std::thread::panicking() {
            let last = self.last_entered().unwrap_or_else(|| description.to_string());
            self.record_critical_failure(&last, "panic detected during check scope");
        }
    }
}

/// Scope guard returned by [`CheckLog::open_sentinel`]. On drop, if the
/// thread is unwinding and this is the outermost sentinel, finalizes the
/// check as a critical failure naming the last description entered.
pub struct Sentinel<'a> {
    log: &'a CheckLog,
    description: String,
    is_outermost: bool,
}

impl Drop for Sentinel<'_> {
    fn drop(&mut self) {
        self.log.exit_sentinel(&self.description, self.is_outermost);
    }
}
