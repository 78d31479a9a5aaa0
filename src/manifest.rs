//! Run manifest: one entry per generated image.
//!
//! Written once after the row loop into the output folder as
//! `manifest.json` (pretty-printed array) or `manifest.csv`
//! (`row_number,filename,payload_type,timestamp`).

use crate::payload::PayloadFormat;
use crate::types::ManifestFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub row_number: usize,
    pub filename: String,
    pub payload_type: PayloadFormat,
    /// RFC 3339, local time.
    pub timestamp: String,
}

impl ManifestEntry {
    pub fn now(row_number: usize, filename: impl Into<String>, payload_type: PayloadFormat) -> Self {
        Self {
            row_number,
            filename: filename.into(),
            payload_type,
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Where the manifest goes for a given output folder.
pub fn manifest_path(output_dir: &Path, format: ManifestFormat) -> PathBuf {
    output_dir.join(format!("manifest.{}", format.extension()))
}

/// Serialize `entries` and return the file written.
pub fn write_manifest(
    output_dir: &Path,
    format: ManifestFormat,
    entries: &[ManifestEntry],
) -> Result<PathBuf, ManifestError> {
    std::fs::create_dir_all(output_dir)?;
    let path = manifest_path(output_dir, format);
    match format {
        ManifestFormat::Json => {
            let json = serde_json::to_string_pretty(entries)?;
            std::fs::write(&path, json)?;
        }
        ManifestFormat::Csv => {
            let mut writer = csv::Writer::from_path(&path)?;
            for entry in entries {
                writer.serialize(entry)?;
            }
            writer.flush()?;
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry {
                row_number: 2,
                filename: "+441234567890.png".into(),
                payload_type: PayloadFormat::Phone,
                timestamp: "2024-01-01T10:00:00+00:00".into(),
            },
            ManifestEntry {
                row_number: 4,
                filename: "Jane, Doe.png".into(),
                payload_type: PayloadFormat::Vcard,
                timestamp: "2024-01-01T10:00:01+00:00".into(),
            },
        ]
    }

    #[test]
    fn path_per_format() {
        let dir = Path::new("/out");
        assert_eq!(
            manifest_path(dir, ManifestFormat::Json),
            PathBuf::from("/out/manifest.json")
        );
        assert_eq!(
            manifest_path(dir, ManifestFormat::Csv),
            PathBuf::from("/out/manifest.csv")
        );
    }

    #[test]
    fn json_manifest_is_array() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_manifest(tmp.path(), ManifestFormat::Json, &entries()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<ManifestEntry> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, entries());
        assert!(content.contains("\"payload_type\": \"vcard\""));
    }

    #[test]
    fn csv_manifest_has_header() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_manifest(tmp.path(), ManifestFormat::Csv, &entries()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("row_number,filename,payload_type,timestamp")
        );
        assert_eq!(
            lines.next(),
            Some("2,+441234567890.png,phone,2024-01-01T10:00:00+00:00")
        );
        assert_eq!(
            lines.next(),
            Some("4,\"Jane, Doe.png\",vcard,2024-01-01T10:00:01+00:00")
        );
    }

    #[test]
    fn now_uses_rfc3339() {
        let entry = ManifestEntry::now(2, "a.png", PayloadFormat::Phone);
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }
}
