//! # QR Batch
//!
//! Turns a contact spreadsheet into one QR code image per row. Each row
//! becomes a payload (a phone number, vCard, MeCard, WiFi join string, URL,
//! SMS or mailto link), gets a filename from a template over its columns,
//! and is written as PNG, SVG or PDF.
//!
//! # Architecture: One Pass Over the Rows
//!
//! ```text
//! 1. Load       input.xlsx/.csv/.json  →  Table          (pre-flight, read, schema)
//! 2. Process    Table rows              →  images/        (payload, name, sandbox, emit)
//! 3. Manifest   generated rows          →  manifest.json  (optional)
//! ```
//!
//! Rows are processed one at a time in sheet order. Whole-run problems
//! (bad config, unreadable input, missing `Phone` column) fail before the
//! first row; a bad row is skipped with a reason and the run continues.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, merge over stock defaults, validation |
//! | [`input`] | Pre-flight file checks, spreadsheet/CSV/JSON reading, data report |
//! | [`payload`] | The closed set of payload formats and their text builders |
//! | [`phone`] | Phone formatting and plausibility checks |
//! | [`naming`] | Filename templates and filename sanitization |
//! | [`sandbox`] | Keeps every output path inside an allowed root |
//! | [`imaging`] | QR encoding and PNG/SVG/PDF rendering behind the [`imaging::QrBackend`] trait |
//! | [`process`] | The row pipeline, statistics and progress events |
//! | [`manifest`] | JSON/CSV record of what was generated |
//! | [`redact`] | Masks phones and emails in log text |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Row records and shared enums |
//!
//! # Design Decisions
//!
//! ## Untrusted Cells
//!
//! Cell values end up in filenames, so every template value is checked for
//! traversal sequences and absolute prefixes, the finished name is
//! sanitized, and the joined path is checked against the sandbox root
//! before anything touches the disk.
//!
//! ## Rendering From the Module Matrix
//!
//! The `qrcode` crate only encodes. All three output formats are painted
//! from the same module matrix, so box size, quiet zone and colors agree
//! between a PNG and the SVG or PDF of the same row.
//!
//! ## Idempotent Reruns
//!
//! Existing files are skipped unless overwrite is on. Running the same
//! sheet twice writes nothing the second time.

pub mod config;
pub mod imaging;
pub mod input;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod payload;
pub mod phone;
pub mod process;
pub mod redact;
pub mod sandbox;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
