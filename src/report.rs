//! Console output for a collected run.

use crate::model::{RunCounts, TestRun};

/// Prints a summary of the run about to be published.
///
/// Displays suite and spec counts with colored pass/fail/skip totals.
pub fn print_summary(run: &TestRun) {
    let counts = run.counts();

    println!();
    println!("{}", summary_line(&counts));
    println!("  Passed:  {}", console::style(counts.passed).green());
    println!("  Failed:  {}", console::style(counts.failed).red());
    println!("  Skipped: {}", console::style(counts.skipped).yellow());

    if let (Some(start), Some(end)) = (run.start_time, run.end_time) {
        println!("  Window:  {} .. {}", start.to_rfc3339(), end.to_rfc3339());
    }
    println!();
}

/// One-line description of how much was collected.
pub fn summary_line(counts: &RunCounts) -> String {
    format!(
        "Found {} test suites with a total of {} test specs",
        counts.suites, counts.specs
    )
}
