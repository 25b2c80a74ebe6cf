//! Handles all user-facing output for the CLI.
//!
//! Results are printed as they arrive, one block per test file, followed by
//! a summary. Colour goes through `termcolor`; diff lines inside failure
//! details are coloured the same way everywhere.

use std::io::Write;
use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::render::Chart;
use crate::results::{FileRunResult, RunSummary, TestJobResult, TestSuiteResult};

// ============================================================================
// PRINTER
// ============================================================================

pub struct Printer {
    out: StandardStream,
}

impl Printer {
    pub fn new(use_colors: bool) -> Self {
        let choice = if use_colors {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            out: StandardStream::stdout(choice),
        }
    }

    fn paint(&mut self, color: Color, bold: bool, text: &str) {
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }

    pub fn chart(&mut self, chart: &Chart) {
        let _ = writeln!(self.out);
        self.paint(Color::Cyan, true, "### Chart ");
        let _ = writeln!(
            self.out,
            "[ {} ] {}",
            chart.metadata.name,
            chart.path.display()
        );
        let _ = writeln!(self.out);
    }

    pub fn file(&mut self, result: &FileRunResult) {
        for suite in &result.suites {
            self.suite(suite);
        }
        if !result.orphaned_namespaces.is_empty() {
            self.paint(Color::Yellow, false, " WARN ");
            let _ = writeln!(
                self.out,
                " unused snapshot ids in {}: {}",
                result.file_path.display(),
                result.orphaned_namespaces.join(", ")
            );
        }
    }

    fn suite(&mut self, suite: &TestSuiteResult) {
        if suite.passed {
            self.paint(Color::Green, true, " PASS ");
        } else {
            self.paint(Color::Red, true, " FAIL ");
        }
        let _ = writeln!(
            self.out,
            " {}\t{}",
            suite.display_name,
            suite.file_path.display()
        );

        if let Some(error) = &suite.exec_error {
            self.error_block("\t", error);
        }
        for job in &suite.tests_result {
            self.job(job);
        }
        if suite.snapshot_counting.vanished > 0 {
            let _ = writeln!(
                self.out,
                "\t{} snapshot(s) recorded earlier were not produced",
                suite.snapshot_counting.vanished
            );
        }
    }

    fn job(&mut self, job: &TestJobResult) {
        if job.skipped {
            self.paint(Color::Yellow, false, "\t- SKIP ");
            let reason = job.skip_reason.as_deref().unwrap_or_default();
            let _ = writeln!(self.out, "{} {}", job.display_name, reason);
            return;
        }
        if job.passed {
            return;
        }
        let _ = writeln!(self.out, "\t- {}", job.display_name);
        if let Some(error) = &job.exec_error {
            self.error_block("\t\t", error);
            return;
        }
        for assertion in job.failed_assertions() {
            let negation = if assertion.not { "not " } else { "" };
            let _ = writeln!(
                self.out,
                "\n\t\t- asserts[{}] `{}{}` fail",
                assertion.index, negation, assertion.assert_type
            );
            for line in &assertion.fail_info {
                self.detail_line(line);
            }
        }
        let _ = writeln!(self.out);
    }

    fn error_block(&mut self, indent: &str, error: &str) {
        self.paint(Color::Red, false, &format!("{}Error: ", indent));
        let mut lines = error.lines();
        let _ = writeln!(self.out, "{}", lines.next().unwrap_or_default());
        for line in lines {
            let _ = writeln!(self.out, "{}  {}", indent, line);
        }
    }

    /// Indented failure detail; diff lines are coloured.
    fn detail_line(&mut self, line: &str) {
        let color = match line.strip_prefix('\t').and_then(|l| l.chars().next()) {
            Some('+') if !line.starts_with("\t+++") => Some(Color::Green),
            Some('-') if !line.starts_with("\t---") => Some(Color::Red),
            _ => None,
        };
        let text = format!("\t\t\t{}", line);
        match color {
            Some(color) => {
                self.paint(color, false, &text);
                let _ = writeln!(self.out);
            }
            None => {
                let _ = writeln!(self.out, "{}", text);
            }
        }
    }

    pub fn file_error(&mut self, path: &Path, error: &dyn std::fmt::Display) {
        self.paint(Color::Red, true, " ERROR ");
        let _ = writeln!(self.out, " {}: {}", path.display(), error);
    }

    pub fn summary(&mut self, summary: &RunSummary, update_snapshots: bool) {
        let _ = writeln!(self.out);
        self.counts(
            "Suites:",
            summary.suites_failed,
            summary.suites_passed,
            0,
        );
        self.counts(
            "Tests:",
            summary.tests_failed,
            summary.tests_passed,
            summary.tests_skipped,
        );
        let snapshots = summary.snapshots;
        let _ = writeln!(
            self.out,
            "Snapshot:    {} passed, {} failed, {} created, {} total",
            snapshots
                .total
                .saturating_sub(snapshots.failed + snapshots.created),
            snapshots.failed,
            snapshots.created,
            snapshots.total
        );
        if snapshots.vanished > 0 {
            let verb = if update_snapshots { "removed" } else { "vanished" };
            let _ = writeln!(self.out, "             {} {}", snapshots.vanished, verb);
        }
        if summary.file_errors > 0 {
            self.paint(Color::Red, false, "Errors:");
            let _ = writeln!(self.out, "      {} file(s) could not be run", summary.file_errors);
        }
    }

    fn counts(&mut self, label: &str, failed: usize, passed: usize, skipped: usize) {
        let _ = write!(self.out, "{:<13}", label);
        if failed > 0 {
            self.paint(Color::Red, true, &format!("{} failed", failed));
            let _ = write!(self.out, ", ");
        }
        if skipped > 0 {
            self.paint(Color::Yellow, false, &format!("{} skipped", skipped));
            let _ = write!(self.out, ", ");
        }
        self.paint(Color::Green, false, &format!("{} passed", passed));
        let _ = writeln!(self.out, ", {} total", failed + passed + skipped);
    }
}
