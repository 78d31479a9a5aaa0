//! Shared types used across all pipeline stages.
//!
//! [`RowRecord`] is what the input stage produces and every later stage
//! consumes. The enums are the closed sets of options the configuration
//! surface accepts; each one deserializes from the same spelling the CLI
//! uses, so `config.toml` and flags never disagree.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// One spreadsheet row: column header → cell text, in sheet column order.
///
/// Empty cells are kept as `""` so every header is present on every row.
/// `number` is the spreadsheet row number (the header is row 1), used in
/// log lines and manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRecord {
    number: usize,
    cells: Vec<(String, String)>,
}

impl RowRecord {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            cells: Vec::new(),
        }
    }

    /// Builder-style insert, mostly for tests and JSON input.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column value. Replaces an existing column in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Column value, or `""` when the column is absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Column value when present and non-empty.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// True when every cell is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Image container written for each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raster image
    #[default]
    Png,
    /// Vector drawing
    Svg,
    /// Single-page document
    Pdf,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// QR error-correction level: the share of codewords that may be damaged
/// while the symbol still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
pub enum ErrorCorrection {
    /// ~7% recovery
    #[default]
    #[serde(rename = "L")]
    #[value(name = "L")]
    Low,
    /// ~15% recovery
    #[serde(rename = "M")]
    #[value(name = "M")]
    Medium,
    /// ~25% recovery
    #[serde(rename = "Q")]
    #[value(name = "Q")]
    Quartile,
    /// ~30% recovery
    #[serde(rename = "H")]
    #[value(name = "H")]
    High,
}

impl ErrorCorrection {
    pub fn letter(self) -> char {
        match self {
            ErrorCorrection::Low => 'L',
            ErrorCorrection::Medium => 'M',
            ErrorCorrection::Quartile => 'Q',
            ErrorCorrection::High => 'H',
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Serialization of the optional run manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Json,
    Csv,
}

impl ManifestFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ManifestFormat::Json => "json",
            ManifestFormat::Csv => "csv",
        }
    }
}

/// Which sheet of a workbook to read: a 0-based index or a sheet name.
///
/// In TOML either `sheet = 0` or `sheet = "Contacts"`. On the command line a
/// value made only of digits is an index, anything else a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl FromStr for SheetSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) => SheetSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "#{i}"),
            SheetSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}
