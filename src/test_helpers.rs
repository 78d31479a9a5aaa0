//! Shared test utilities for the qr-batch test suite.
//!
//! Builds fixture spreadsheets in a temp directory so tests never depend on
//! files checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_xlsx(tmp.path(), "contacts.xlsx", &contacts());
//! let table = read_table(&path, InputKind::Excel, &SheetSelector::default()).unwrap();
//! assert_eq!(table.rows.len(), 3);
//! ```

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

use crate::types::RowRecord;

pub use tempfile::TempDir;

// =========================================================================
// Fixture data
// =========================================================================

/// Header plus three contacts with unique phones.
pub fn contacts() -> Vec<Vec<String>> {
    table(&[
        &["Phone", "Name", "Email"],
        &["441234567890", "John Smith", "john@example.com"],
        &["+449876543210", "Jane Doe", "jane@example.com"],
        &["15551234567", "Bob Jones", ""],
    ])
}

/// Turn string-slice literals into an owned table.
pub fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

/// Build a row record from `(column, value)` pairs.
pub fn row(number: usize, cells: &[(&str, &str)]) -> RowRecord {
    cells
        .iter()
        .fold(RowRecord::new(number), |r, (c, v)| r.with(*c, *v))
}

// =========================================================================
// Fixture files
// =========================================================================

/// Write `rows` to a single-sheet workbook. Every cell is a string.
pub fn write_xlsx(dir: &Path, name: &str, rows: &[Vec<String>]) -> PathBuf {
    write_xlsx_sheets(dir, name, &[("Sheet1", rows)])
}

/// Write a workbook with one named sheet per entry.
pub fn write_xlsx_sheets(dir: &Path, name: &str, sheets: &[(&str, &[Vec<String>])]) -> PathBuf {
    let path = dir.join(name);
    let mut workbook = Workbook::new();
    for (sheet_name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*sheet_name).unwrap();
        for (r, cells) in rows.iter().enumerate() {
            for (c, value) in cells.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, value).unwrap();
                }
            }
        }
    }
    workbook.save(&path).unwrap();
    path
}

/// Write `rows` as comma-separated text, quoting cells that need it.
pub fn write_csv(dir: &Path, name: &str, rows: &[Vec<String>]) -> PathBuf {
    let path = dir.join(name);
    let body: String = rows
        .iter()
        .map(|cells| {
            let line: Vec<String> = cells
                .iter()
                .map(|c| {
                    if c.contains(',') || c.contains('"') {
                        format!("\"{}\"", c.replace('"', "\"\""))
                    } else {
                        c.clone()
                    }
                })
                .collect();
            line.join(",") + "\n"
        })
        .collect();
    std::fs::write(&path, body).unwrap();
    path
}

/// List the file names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
