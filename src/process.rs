//! Row pipeline: spreadsheet rows in, QR images out.
//!
//! [`run`] loads and checks the input, then drives every row through
//! [`Pipeline::process_row`] one at a time, in sheet order:
//!
//! ```text
//! Intake ─► phone formatted ─► dedup ─► payload built ─► filename resolved
//!    │                           │            │                  │
//!    ▼                           ▼            ▼                  ▼
//! Skipped(invalid)      Skipped(duplicate) Skipped(invalid)  path sandboxed ─► Skipped(invalid)
//!                                                                │
//!                                            exists, no overwrite ─► Skipped(existing)
//!                                                                │
//!                                               dry run ─► Generated (nothing written)
//!                                                                │
//!                                       backend.emit ─► Generated | Skipped(failed)
//! ```
//!
//! ## Failure Tiers
//!
//! Anything wrong with the run as a whole (config, unknown payload format,
//! missing or oversized input, missing `Phone` column, unreadable sheet) is a
//! [`ProcessError`] and stops before the first row. Anything wrong with one
//! row is a [`RowOutcome::Skipped`] and the loop carries on.
//!
//! ## Progress
//!
//! The pipeline never logs directly. It sends [`RowEvent`]s down an optional
//! channel; the binary formats and prints them, tests collect them.
//!
//! ## Known Limitation
//!
//! The existence check and the write are not atomic. Another process writing
//! into the same directory between the two can be overwritten.

use crate::config::{ConfigError, RunConfig};
use crate::imaging::{EmitParams, QrBackend, RenderParams, RustBackend};
use crate::input::{InputError, RowIssue, load_input, validate_rows};
use crate::manifest::{ManifestEntry, ManifestError, write_manifest};
use crate::naming::FilenameResolver;
use crate::payload::{PayloadError, PayloadFormat};
use crate::phone::format_phone;
use crate::sandbox::PathSandbox;
use crate::types::{OutputFormat, RowRecord};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// Settings the row loop needs, resolved from a [`RunConfig`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub payload: PayloadFormat,
    pub output_format: OutputFormat,
    pub render: RenderParams,
    pub filename_template: String,
    /// Directory images are written into.
    pub image_dir: PathBuf,
    pub allowed_root: Option<PathBuf>,
    pub keep_plus: bool,
    pub dedup: bool,
    pub overwrite: bool,
    pub dry_run: bool,
    /// Collect a manifest entry per written image.
    pub collect_manifest: bool,
}

impl ProcessConfig {
    /// Resolve the config. Fails on an unknown payload format name.
    pub fn from_run_config(config: &RunConfig) -> Result<Self, ProcessError> {
        let payload: PayloadFormat = config.payload.format.parse()?;
        Ok(Self {
            payload,
            output_format: config.output.format,
            render: config.render_params()?,
            filename_template: config.output.filename_template.clone(),
            image_dir: config.image_dir().to_path_buf(),
            allowed_root: config.output.allowed_root.clone(),
            keep_plus: config.payload.keep_plus,
            dedup: config.payload.dedup,
            overwrite: config.output.overwrite,
            dry_run: config.output.dry_run,
            collect_manifest: config.manifest.enabled,
        })
    }
}

// =============================================================================
// Outcomes, events, statistics
// =============================================================================

/// Why a row produced no image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing phone, failed payload validation, or path outside the sandbox.
    Invalid,
    Duplicate,
    /// Target file exists and overwrite is off.
    Existing,
    /// The backend could not encode or write the image.
    EmitFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Generated { filename: String, path: PathBuf },
    Skipped { reason: SkipReason, message: String },
}

/// Progress report sent while a run is in flight.
#[derive(Debug, Clone)]
pub enum RowEvent {
    RowsLoaded {
        count: usize,
    },
    /// Rows the data check flagged. The rows are still processed.
    DataIssues {
        invalid: usize,
        issues: Vec<RowIssue>,
    },
    Generated {
        row: usize,
        filename: String,
        dry_run: bool,
    },
    Skipped {
        row: usize,
        reason: SkipReason,
        message: String,
    },
    Warning {
        row: usize,
        message: String,
    },
    ManifestWritten {
        path: PathBuf,
        entries: usize,
    },
    Finished(RunStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub generated: usize,
    pub skipped_existing: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            total: 0,
            generated: 0,
            skipped_existing: 0,
            skipped_invalid: 0,
            skipped_duplicate: 0,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        self.total += 1;
        match outcome {
            RowOutcome::Generated { .. } => self.generated += 1,
            RowOutcome::Skipped { reason, .. } => match reason {
                SkipReason::Invalid | SkipReason::EmitFailed => self.skipped_invalid += 1,
                SkipReason::Duplicate => self.skipped_duplicate += 1,
                SkipReason::Existing => self.skipped_existing += 1,
            },
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn skipped(&self) -> usize {
        self.skipped_existing + self.skipped_invalid + self.skipped_duplicate
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunResult {
    pub stats: RunStats,
    pub manifest: Vec<ManifestEntry>,
    pub manifest_path: Option<PathBuf>,
}

fn send(events: Option<&Sender<RowEvent>>, event: RowEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

// =============================================================================
// Row pipeline
// =============================================================================

/// Per-run state: the collaborators plus the set of phones seen so far.
pub struct Pipeline<'a> {
    backend: &'a dyn QrBackend,
    config: &'a ProcessConfig,
    resolver: FilenameResolver,
    sandbox: PathSandbox,
    seen: HashSet<String>,
    events: Option<&'a Sender<RowEvent>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        backend: &'a dyn QrBackend,
        config: &'a ProcessConfig,
        events: Option<&'a Sender<RowEvent>>,
    ) -> Self {
        Self {
            backend,
            config,
            resolver: FilenameResolver::new(&config.filename_template, config.output_format),
            sandbox: PathSandbox::new(config.allowed_root.clone()),
            seen: HashSet::new(),
            events,
        }
    }

    fn warn(&self, row: usize, message: String) {
        send(self.events, RowEvent::Warning { row, message });
    }

    /// Take one row from intake to a final outcome.
    pub fn process_row(&mut self, row: &RowRecord) -> RowOutcome {
        let skip = |reason, message: String| RowOutcome::Skipped { reason, message };
        let raw_phone = row.value("Phone");
        if raw_phone.trim().is_empty() {
            return skip(SkipReason::Invalid, "Missing phone number".to_string());
        }

        let phone = format_phone(raw_phone, self.config.keep_plus);

        // The key is taken before payload validation, so a later row with
        // the same phone is a duplicate even if this one fails.
        if self.config.dedup && !self.seen.insert(phone.clone()) {
            return skip(SkipReason::Duplicate, format!("Duplicate phone {phone}"));
        }

        if let Err(e) = self.config.payload.validate(row) {
            return skip(SkipReason::Invalid, e.to_string());
        }
        let payload = self.config.payload.generate(row);

        let resolved = self.resolver.resolve(row, &phone, self.config.keep_plus);
        for warning in &resolved.warnings {
            self.warn(row.number(), warning.to_string());
        }
        if let Some(reason) = &resolved.fallback {
            self.warn(
                row.number(),
                format!("Filename template not usable ({reason}), using phone"),
            );
        }

        let candidate = self.config.image_dir.join(&resolved.filename);
        let path = match self.sandbox.validate(&candidate) {
            Ok(path) => path,
            Err(e) => return skip(SkipReason::Invalid, e.to_string()),
        };

        if path.exists() && !self.config.overwrite {
            return skip(
                SkipReason::Existing,
                format!("{} already exists", resolved.filename),
            );
        }

        if !self.config.dry_run {
            let params = EmitParams {
                payload,
                output: path.clone(),
                format: self.config.output_format,
                render: self.config.render,
            };
            if let Err(e) = self.backend.emit(&params) {
                return skip(
                    SkipReason::EmitFailed,
                    format!("Failed to generate {}: {e}", resolved.filename),
                );
            }
        }

        RowOutcome::Generated {
            filename: resolved.filename,
            path,
        }
    }
}

/// Run `rows` through a fresh [`Pipeline`]. Returns statistics (not yet
/// finished) and the manifest entries collected.
pub fn process_rows_with_backend(
    backend: &dyn QrBackend,
    rows: &[RowRecord],
    config: &ProcessConfig,
    events: Option<&Sender<RowEvent>>,
) -> (RunStats, Vec<ManifestEntry>) {
    let mut pipeline = Pipeline::new(backend, config, events);
    let mut stats = RunStats::start();
    let mut entries = Vec::new();

    for row in rows {
        let outcome = pipeline.process_row(row);
        stats.record(&outcome);
        match outcome {
            RowOutcome::Generated { filename, .. } => {
                if config.collect_manifest && !config.dry_run {
                    entries.push(ManifestEntry::now(row.number(), &filename, config.payload));
                }
                send(
                    events,
                    RowEvent::Generated {
                        row: row.number(),
                        filename,
                        dry_run: config.dry_run,
                    },
                );
            }
            RowOutcome::Skipped { reason, message } => send(
                events,
                RowEvent::Skipped {
                    row: row.number(),
                    reason,
                    message,
                },
            ),
        }
    }
    (stats, entries)
}

// =============================================================================
// Entry points
// =============================================================================

/// Run the whole pipeline with the real image backend.
pub fn run(config: &RunConfig, events: Option<Sender<RowEvent>>) -> Result<RunResult, ProcessError> {
    run_with_backend(&RustBackend::new(), config, events)
}

/// Run the whole pipeline with a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &dyn QrBackend,
    config: &RunConfig,
    events: Option<Sender<RowEvent>>,
) -> Result<RunResult, ProcessError> {
    config.validate()?;
    let process_config = ProcessConfig::from_run_config(config)?;
    let events = events.as_ref();
    tracing::debug!(
        payload = %process_config.payload,
        format = process_config.output_format.extension(),
        dry_run = process_config.dry_run,
        "starting run"
    );

    let table = load_input(
        &config.input.path,
        &config.input.sheet,
        &config.input_limits(),
    )?;
    send(events, RowEvent::RowsLoaded { count: table.rows.len() });

    let report = validate_rows(&table.rows);
    if report.invalid > 0 {
        send(
            events,
            RowEvent::DataIssues {
                invalid: report.invalid,
                issues: report.issues,
            },
        );
    }

    if !process_config.dry_run {
        std::fs::create_dir_all(&process_config.image_dir)?;
    }

    let (mut stats, manifest) =
        process_rows_with_backend(backend, &table.rows, &process_config, events);

    let manifest_path = if process_config.collect_manifest && !manifest.is_empty() {
        let path = write_manifest(&config.output.folder, config.manifest.format, &manifest)?;
        send(
            events,
            RowEvent::ManifestWritten {
                path: path.clone(),
                entries: manifest.len(),
            },
        );
        Some(path)
    } else {
        None
    };

    stats.finish();
    send(events, RowEvent::Finished(stats.clone()));
    Ok(RunResult {
        stats,
        manifest,
        manifest_path,
    })
}

/// Result of `check`: the input as read plus the data report.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub payload: PayloadFormat,
    pub columns: Vec<String>,
    pub report: crate::input::ValidationReport,
}

impl CheckResult {
    /// Optional payload columns the input does not have.
    pub fn missing_optional_columns(&self) -> Vec<&'static str> {
        self.payload
            .optional_columns()
            .iter()
            .copied()
            .filter(|col| !self.columns.iter().any(|c| c == col))
            .collect()
    }
}

/// Load and validate the input without producing any image.
pub fn check(config: &RunConfig) -> Result<CheckResult, ProcessError> {
    config.validate()?;
    let process_config = ProcessConfig::from_run_config(config)?;
    let table = load_input(
        &config.input.path,
        &config.input.sheet,
        &config.input_limits(),
    )?;
    Ok(CheckResult {
        payload: process_config.payload,
        report: validate_rows(&table.rows),
        columns: table.columns,
    })
}
