//! CLI output for the `generate` and `check` commands.
//!
//! # Row-First Display
//!
//! Every line about a row leads with its spreadsheet row number (header is
//! row 1), zero-padded to three digits, so the output reads as a ledger of
//! the input in sheet order:
//!
//! ```text
//! Loaded 4 rows
//! 002 → +441234567890.png
//! 003 skipped (duplicate): Duplicate phone +441234567890
//! 004 warning: Path traversal detected in column 'Name'
//! 004 → _etc_passwd.png
//! 005 skipped (failed): Failed to generate +15551234567.png: Data exceeds maximum QR code capacity
//! Manifest: images/manifest.json (2 entries)
//!
//! ==================================================
//! Generated 2 of 4 QR codes in 0.3s
//!     Skipped (invalid): 1
//!     Skipped (duplicate): 1
//! ==================================================
//! ```
//!
//! # Check
//!
//! ```text
//! Payload: vcard (vCard 3.0 format)
//! Columns: Phone, Name, Email
//!     Not in input (optional): Organization
//! Rows: 3
//!     Valid: 2
//!     Invalid: 1
//! 004 Phone number must have at least 7 digits
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*`/`log_*` wrapper that does the I/O. Row events
//! go through `tracing` at the level [`event_level`] picks; the summary and
//! the check report go to stdout. With PII redaction on, every line passes
//! through [`redact_if`] on its way out.

use crate::input::{RowIssue, ValidationReport};
use crate::process::{CheckResult, RowEvent, RunStats, SkipReason};
use crate::redact::redact_if;

const BANNER_WIDTH: usize = 50;

/// Severity a row event is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

fn format_row(row: usize) -> String {
    format!("{:03}", row)
}

fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Invalid => "invalid",
        SkipReason::Duplicate => "duplicate",
        SkipReason::Existing => "existing",
        SkipReason::EmitFailed => "failed",
    }
}

fn issue_lines(issues: &[RowIssue], total: usize) -> Vec<String> {
    let mut lines: Vec<String> = issues
        .iter()
        .map(|issue| format!("{} {}", format_row(issue.row), issue.message))
        .collect();
    if total > issues.len() {
        lines.push(format!("... and {} more", total - issues.len()));
    }
    lines
}

pub fn event_level(event: &RowEvent) -> EventLevel {
    match event {
        RowEvent::Skipped {
            reason: SkipReason::EmitFailed,
            ..
        } => EventLevel::Error,
        RowEvent::Skipped {
            reason: SkipReason::Existing,
            ..
        } => EventLevel::Info,
        RowEvent::Skipped { .. } | RowEvent::Warning { .. } | RowEvent::DataIssues { .. } => {
            EventLevel::Warn
        }
        _ => EventLevel::Info,
    }
}

/// Format a single progress event as display lines.
pub fn format_row_event(event: &RowEvent) -> Vec<String> {
    match event {
        RowEvent::RowsLoaded { count } => vec![format!("Loaded {} rows", count)],
        RowEvent::DataIssues { invalid, issues } => {
            let mut lines = vec![format!("{} rows failed data checks", invalid)];
            lines.extend(issue_lines(issues, *invalid));
            lines
        }
        RowEvent::Generated {
            row,
            filename,
            dry_run,
        } => {
            let suffix = if *dry_run { " (dry run)" } else { "" };
            vec![format!("{} → {}{}", format_row(*row), filename, suffix)]
        }
        RowEvent::Skipped {
            row,
            reason,
            message,
        } => vec![format!(
            "{} skipped ({}): {}",
            format_row(*row),
            skip_label(*reason),
            message
        )],
        RowEvent::Warning { row, message } => {
            vec![format!("{} warning: {}", format_row(*row), message)]
        }
        RowEvent::ManifestWritten { path, entries } => {
            vec![format!("Manifest: {} ({} entries)", path.display(), entries)]
        }
        RowEvent::Finished(stats) => format_summary(stats),
    }
}

/// End-of-run banner. Skip counters only appear when non-zero.
pub fn format_summary(stats: &RunStats) -> Vec<String> {
    let banner = "=".repeat(BANNER_WIDTH);
    let elapsed = stats
        .elapsed()
        .map(|d| format!(" in {:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_default();

    let mut lines = vec![
        String::new(),
        banner.clone(),
        format!(
            "Generated {} of {} QR codes{}",
            stats.generated, stats.total, elapsed
        ),
    ];
    for (label, count) in [
        ("existing", stats.skipped_existing),
        ("invalid", stats.skipped_invalid),
        ("duplicate", stats.skipped_duplicate),
    ] {
        if count > 0 {
            lines.push(format!("    Skipped ({}): {}", label, count));
        }
    }
    lines.push(banner);
    lines
}

pub fn format_validation_report(report: &ValidationReport) -> Vec<String> {
    let mut lines = vec![
        format!("    Valid: {}", report.valid),
        format!("    Invalid: {}", report.invalid),
    ];
    lines.extend(issue_lines(&report.issues, report.invalid));
    lines
}

pub fn format_check_report(result: &CheckResult) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Payload: {} ({})",
            result.payload.name(),
            result.payload.description()
        ),
        format!("Columns: {}", result.columns.join(", ")),
    ];
    let missing = result.missing_optional_columns();
    if !missing.is_empty() {
        lines.push(format!("    Not in input (optional): {}", missing.join(", ")));
    }
    lines.push(format!("Rows: {}", result.report.total()));
    lines.extend(format_validation_report(&result.report));
    lines
}

/// Send one event to the log, line by line.
pub fn log_row_event(event: &RowEvent, redact: bool) {
    let level = event_level(event);
    for line in format_row_event(event) {
        let line = redact_if(redact, &line);
        match level {
            EventLevel::Info => tracing::info!("{}", line),
            EventLevel::Warn => tracing::warn!("{}", line),
            EventLevel::Error => tracing::error!("{}", line),
        }
    }
}

pub fn print_summary(stats: &RunStats, redact: bool) {
    for line in format_summary(stats) {
        println!("{}", redact_if(redact, &line));
    }
}

pub fn print_check_report(result: &CheckResult, redact: bool) {
    for line in format_check_report(result) {
        println!("{}", redact_if(redact, &line));
    }
}
