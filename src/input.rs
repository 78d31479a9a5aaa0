//! Input loading: pre-flight checks, tabular reading, schema and data checks.
//!
//! ```text
//! path ─► validate_input_file ─► read_table ─► row cap ─► validate_schema ─► Table
//!          exists / file / ext      xlsx, xls  (calamine)
//!          signature / size         csv        (csv)
//!                                   json       (serde_json)
//! ```
//!
//! Everything in [`load_input`] is fatal for the run. [`validate_rows`] is the
//! softer per-row check: it only produces a report and never removes rows.
//!
//! Cells are normalized to text the way a spreadsheet user reads them: whole
//! floats lose their `.0` (so a phone typed as a number stays `441234567890`),
//! booleans become `TRUE`/`FALSE`, empty cells become `""`.

use crate::phone::validate_phone;
use crate::types::{RowRecord, SheetSelector};
use calamine::{Data, Reader, open_workbook_auto};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns every input must have, in reporting order.
pub const REQUIRED_COLUMNS: &[&str] = &["Phone"];

/// Upper bound on issues kept in a [`ValidationReport`].
pub const MAX_REPORTED_ISSUES: usize = 100;

const ZIP_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE2_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const LEGACY_SIGNATURE: &[u8] = &[0x50, 0x0B, 0x01, 0x02, 0x00, 0x00];

#[derive(Error, Debug)]
pub enum InputError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("Invalid Excel file format")]
    InvalidSignature,
    #[error("File size ({size_mb:.1}MB) exceeds limit ({limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: u64 },
    #[error("Row count ({count}) exceeds limit ({limit})")]
    TooManyRows { count: usize, limit: usize },
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Sheet {0} not found in workbook")]
    SheetNotFound(SheetSelector),
    #[error("JSON input must be an array of objects")]
    JsonShape,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("Cannot read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Cannot read JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a file is read, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.xlsx` or `.xls`
    Excel,
    Csv,
    Json,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xls" => Ok(InputKind::Excel),
            "csv" => Ok(InputKind::Csv),
            "json" => Ok(InputKind::Json),
            _ => Err(InputError::UnsupportedExtension(if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{ext}")
            })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_file_size_mb: u64,
    pub max_rows: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_rows: 100_000,
        }
    }
}

/// Header plus data rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RowRecord>,
}

// =========================================================================
// Pre-flight
// =========================================================================

/// Check the file exists, is a supported kind, looks like what its extension
/// claims, and is under the size cap.
pub fn validate_input_file(path: &Path, limits: &InputLimits) -> Result<InputKind, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    let kind = InputKind::from_path(path)?;

    if kind == InputKind::Excel {
        let mut header = [0u8; 8];
        let read = read_prefix(path, &mut header)?;
        if !has_workbook_signature(&header[..read]) {
            return Err(InputError::InvalidSignature);
        }
    }

    let size = std::fs::metadata(path)?.len();
    let limit_bytes = limits.max_file_size_mb.saturating_mul(1024 * 1024);
    if size > limit_bytes {
        return Err(InputError::TooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            limit_mb: limits.max_file_size_mb,
        });
    }
    Ok(kind)
}

fn read_prefix(path: &Path, buf: &mut [u8]) -> Result<usize, InputError> {
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn has_workbook_signature(header: &[u8]) -> bool {
    [ZIP_SIGNATURE, OLE2_SIGNATURE, LEGACY_SIGNATURE]
        .iter()
        .any(|sig| header.starts_with(sig))
}

// =========================================================================
// Reading
// =========================================================================

/// Read the whole table. `sheet` only matters for workbooks.
pub fn read_table(
    path: &Path,
    kind: InputKind,
    sheet: &SheetSelector,
) -> Result<Table, InputError> {
    let table = match kind {
        InputKind::Excel => read_workbook(path, sheet)?,
        InputKind::Csv => read_csv(path)?,
        InputKind::Json => read_json(path)?,
    };
    tracing::debug!(
        columns = table.columns.len(),
        rows = table.rows.len(),
        "read input table"
    );
    Ok(table)
}

fn read_workbook(path: &Path, selector: &SheetSelector) -> Result<Table, InputError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_vec();
    let name = match selector {
        SheetSelector::Index(i) => names.get(*i).cloned(),
        SheetSelector::Name(n) => names.iter().find(|s| *s == n).cloned(),
    }
    .ok_or_else(|| InputError::SheetNotFound(selector.clone()))?;
    tracing::debug!(sheet = %name, "reading worksheet");

    let range = workbook.worksheet_range(&name)?;
    // Spreadsheet row (1-based) of the range's first row.
    let first_row = range.start().map_or(1, |(r, _)| r as usize + 1);

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let columns = header_names(header.iter().map(cell_to_string));

    let rows = rows
        .enumerate()
        .map(|(i, cells)| {
            let values = cells.iter().map(cell_to_string);
            build_row(first_row + 1 + i, &columns, values)
        })
        .filter(|r| !r.is_blank())
        .collect();
    Ok(Table { columns, rows })
}

/// Spreadsheet cell → text.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::Error(e) => format!("#{e:?}"),
    }
}

/// Integers without decimals; everything else as-is.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn read_csv(path: &Path) -> Result<Table, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(File::open(path)?));

    let columns = header_names(reader.headers()?.iter().map(str::to_string));
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = build_row(i + 2, &columns, record.iter().map(str::to_string));
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(Table { columns, rows })
}

/// Columns are the union of every object's keys, in first-seen order.
fn read_json(path: &Path) -> Result<Table, InputError> {
    let value: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let serde_json::Value::Array(items) = value else {
        return Err(InputError::JsonShape);
    };

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        let serde_json::Value::Object(map) = item else {
            return Err(InputError::JsonShape);
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(map);
    }

    let rows = objects
        .iter()
        .enumerate()
        .map(|(i, map)| {
            let values = columns
                .iter()
                .map(|c| map.get(c).map(json_to_string).unwrap_or_default());
            build_row(i + 2, &columns, values)
        })
        .filter(|r| !r.is_blank())
        .collect();
    Ok(Table { columns, rows })
}

fn json_to_string(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => format_number(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Header cells as column names. Blank headers get positional names so
/// every column stays addressable.
fn header_names(cells: impl Iterator<Item = String>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn build_row(number: usize, columns: &[String], values: impl Iterator<Item = String>) -> RowRecord {
    let mut values = values;
    let mut row = RowRecord::new(number);
    for column in columns {
        row.insert(column.clone(), values.next().unwrap_or_default());
    }
    row
}

// =========================================================================
// Schema and data validation
// =========================================================================

/// Fail when any of [`REQUIRED_COLUMNS`] is absent.
pub fn validate_schema(columns: &[String]) -> Result<(), InputError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|req| !columns.iter().any(|c| c == *req))
        .map(|req| req.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InputError::MissingColumns(missing))
    }
}

/// Pre-flight, read, row cap and schema check in one call.
pub fn load_input(
    path: &Path,
    sheet: &SheetSelector,
    limits: &InputLimits,
) -> Result<Table, InputError> {
    let kind = validate_input_file(path, limits)?;
    let table = read_table(path, kind, sheet)?;
    if table.rows.len() > limits.max_rows {
        return Err(InputError::TooManyRows {
            count: table.rows.len(),
            limit: limits.max_rows,
        });
    }
    validate_schema(&table.columns)?;
    Ok(table)
}

/// One problem found by [`validate_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: usize,
    pub invalid: usize,
    /// First [`MAX_REPORTED_ISSUES`] issues in row order.
    pub issues: Vec<RowIssue>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }
}

/// Flag rows whose phone is missing or implausible.
pub fn validate_rows(rows: &[RowRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for row in rows {
        let phone = row.value("Phone");
        let problem = if phone.trim().is_empty() {
            Some("Missing phone number".to_string())
        } else {
            validate_phone(phone).err().map(|e| e.to_string())
        };

        match problem {
            None => report.valid += 1,
            Some(message) => {
                report.invalid += 1;
                if report.issues.len() < MAX_REPORTED_ISSUES {
                    report.issues.push(RowIssue {
                        row: row.number(),
                        message,
                    });
                }
            }
        }
    }
    report
}
