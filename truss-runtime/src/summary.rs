//! Per-test, per-suite, and grand-total summary aggregation.
//!
//! Summaries compose by element-wise addition of counts and concatenation
//! of failure-message buffers with a heading inserted per contributing
//! part — the same additive law the property tests in this crate's test
//! suite hold the scheduler to.

use std::time::Duration;

/// Aggregated outcome of one test, one suite, or the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub name: String,
    pub standard_checks: usize,
    pub false_positive_checks: usize,
    pub false_negative_checks: usize,
    pub failures: usize,
    pub critical_failures: usize,
    pub exceptions: usize,
    pub duration: Duration,
    pub failure_messages: Option<String>,
}

impl Summary {
    pub fn zero(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            standard_checks: 0,
            false_positive_checks: 0,
            false_negative_checks: 0,
            failures: 0,
            critical_failures: 0,
            exceptions: 0,
            duration: Duration::ZERO,
            failure_messages: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0 && self.critical_failures == 0
    }

    pub fn total_checks(&self) -> usize {
        self.standard_checks + self.false_positive_checks + self.false_negative_checks
    }

    /// Combines `parts` into one summary named `name`: counts and
    /// durations add element-wise; failure messages concatenate with a
    /// `"== {part.name} ==\n"` heading inserted ahead of each
    /// non-empty buffer, in the order `parts` is given.
    pub fn combine<'a>(name: impl Into<String>, parts: impl IntoIterator<Item = &'a Summary>) -> Summary {
        let mut total = Summary::zero(name);
        let mut messages = String::new();

        for part in parts {
            total.standard_checks += part.standard_checks;
            total.false_positive_checks += part.false_positive_checks;
            total.false_negative_checks += part.false_negative_checks;
            total.failures += part.failures;
            total.critical_failures += part.critical_failures;
            total.exceptions += part.exceptions;
            total.duration += part.duration;

            if let Some(m) = &part.failure_messages {
                messages.push_str(&format!("== {} ==\n", part.name));
                messages.push_str(m);
            }
        }

        total.failure_messages = if messages.is_empty() { None } else { Some(messages) };
        total
    }
}

/// Formats a duration picking the largest of ns/µs/ms/s in which the
/// magnitude is >= 1, rendered to three significant figures.
pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(&str, f64); 4] = [("ns", 1.0), ("\u{b5}s", 1e3), ("ms", 1e6), ("s", 1e9)];

    let nanos = duration.as_nanos() as f64;
    if nanos == 0.0 {
        return "0ns".to_string();
    }

    let mut chosen = UNITS[0];
    for unit in UNITS {
        if nanos / unit.1 >= 1.0 {
            chosen = unit;
        }
    }

    let value = nanos / chosen.1;
    format!("{}{}", format_sig_figs(value, 3), chosen.0)
}

/// Renders `value` to `sig_figs` significant figures, trimming a trailing
/// decimal point if rounding lands on a whole number.
fn format_sig_figs(value: f64, sig_figs: u32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (sig_figs as i32 - 1 - magnitude).max(0) as usize;
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(failures: usize, messages: Option<&str>) -> Summary {
        Summary {
            failures,
            failure_messages: messages.map(str::to_string),
            ..Summary::zero("t")
        }
    }

    #[test]
    fn combine_adds_counts_additively() {
        let a = summary_with(1, None);
        let b = summary_with(2, None);
        let total = Summary::combine("suite", [&a, &b]);
        assert_eq!(total.failures, 3);
    }

    #[test]
    fn combine_inserts_heading_per_nonempty_message_buffer() {
        let a = Summary {
            name: "TestA".to_string(),
            ..summary_with(1, Some("boom\n"))
        };
        let b = summary_with(0, None);
        let total = Summary::combine("suite", [&a, &b]);
        assert_eq!(total.failure_messages.as_deref(), Some("== TestA ==\nboom\n"));
    }

    #[test]
    fn additive_law_whole_equals_sum_of_parts() {
        let parts: Vec<Summary> = (0..5).map(|i| summary_with(i, None)).collect();
        let whole = Summary::combine("all", &parts);
        let expected: usize = (0..5).sum();
        assert_eq!(whole.failures, expected);
    }

    #[test]
    fn duration_formatting_picks_largest_unit_with_three_sig_figs() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_micros(1)), "1\u{b5}s");
        assert_eq!(format_duration(Duration::from_millis(123)), "123ms");
        assert_eq!(format_duration(Duration::from_secs_f64(1.2345)), "1.23s");
    }

    use proptest::prelude::*;

    proptest! {
        /// Combining is associative under any grouping: summing every leaf
        /// directly must equal folding the leaves into two halves first
        /// and then combining the two half-totals.
        #[test]
        fn combine_is_associative_under_grouping(
            counts in proptest::collection::vec(0usize..50, 1..12),
            split in 0usize..12,
        ) {
            let leaves: Vec<Summary> = counts
                .iter()
                .enumerate()
                .map(|(i, &f)| summary_with_named(&format!("leaf{i}"), f))
                .collect();
            let split = split.min(leaves.len());

            let direct = Summary::combine("all", &leaves);

            let (left, right) = leaves.split_at(split);
            let left_total = Summary::combine("left", left);
            let right_total = Summary::combine("right", right);
            let grouped = Summary::combine("all", [&left_total, &right_total]);

            prop_assert_eq!(direct.failures, grouped.failures);
            prop_assert_eq!(direct.standard_checks, grouped.standard_checks);
            prop_assert_eq!(direct.critical_failures, grouped.critical_failures);
            prop_assert_eq!(direct.duration, grouped.duration);
        }
    }

    fn summary_with_named(name: &str, failures: usize) -> Summary {
        Summary {
            standard_checks: failures + 1,
            ..summary_with(failures, None)
        }
        .with_name(name)
    }

    impl Summary {
        fn with_name(mut self, name: &str) -> Self {
            self.name = name.to_string();
            self
        }
    }
}
