//! Run configuration.
//!
//! Handles loading, validating, and merging a `config.toml`. Stock defaults
//! are the base layer; a user file passed with `--config` overrides them key
//! by key, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [input]
//! path = "input/contacts.xlsx"  # .xlsx, .xls, .csv or .json
//! sheet = 0                     # Index, or a name: sheet = "Contacts"
//! max_file_size_mb = 100
//! max_rows = 100000
//!
//! [output]
//! folder = "images"
//! format = "png"                # png, svg, pdf
//! filename_template = "{Phone}" # Any {Column} from the input
//! # allowed_root = "/srv/qr"    # Refuse to write outside this directory
//! overwrite = false
//! dry_run = false
//!
//! [payload]
//! format = "phone"              # phone, vcard, mecard, wifi, url, sms, email
//! keep_plus = true              # Ensure phones start with "+"
//! dedup = false                 # Skip repeated phones
//!
//! [qr]
//! fill_color = "black"
//! back_color = "white"
//! box_size = 10                 # Pixels per module
//! border = 4                    # Quiet zone, in modules
//! error_correction = "L"        # L, M, Q, H
//!
//! [manifest]
//! enabled = false
//! format = "json"               # json, csv
//!
//! [logging]
//! redact_pii = true             # Mask phones and emails in log output
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [payload]
//! format = "vcard"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Color, RenderParams};
use crate::input::InputLimits;
use crate::types::{ErrorCorrection, ManifestFormat, OutputFormat, SheetSelector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest accepted `qr.box_size` and `qr.border`.
pub const MAX_BOX_SIZE: u32 = 100;
pub const MAX_BORDER: u32 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything one run needs.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Where rows come from and how much input is accepted.
    pub input: InputConfig,
    /// Where images go and how they are named.
    pub output: OutputConfig,
    /// What each QR code encodes.
    pub payload: PayloadConfig,
    /// How each QR code is drawn.
    pub qr: QrConfig,
    /// Optional record of generated files.
    pub manifest: ManifestConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub path: PathBuf,
    pub sheet: SheetSelector,
    pub max_file_size_mb: u64,
    pub max_rows: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        let limits = InputLimits::default();
        Self {
            path: PathBuf::from("input/contacts.xlsx"),
            sheet: SheetSelector::default(),
            max_file_size_mb: limits.max_file_size_mb,
            max_rows: limits.max_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub folder: PathBuf,
    pub format: OutputFormat,
    pub filename_template: String,
    /// When set, images are written under this directory instead of
    /// `folder`, and nothing may resolve outside it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_root: Option<PathBuf>,
    pub overwrite: bool,
    pub dry_run: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("images"),
            format: OutputFormat::Png,
            filename_template: "{Phone}".to_string(),
            allowed_root: None,
            overwrite: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PayloadConfig {
    /// Payload format name. Checked when a run starts, so an unknown name
    /// fails before any row is read.
    pub format: String,
    pub keep_plus: bool,
    pub dedup: bool,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            format: "phone".to_string(),
            keep_plus: true,
            dedup: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    pub fill_color: String,
    pub back_color: String,
    pub box_size: u32,
    pub border: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            fill_color: "black".to_string(),
            back_color: "white".to_string(),
            box_size: 10,
            border: 4,
            error_correction: ErrorCorrection::Low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    pub enabled: bool,
    pub format: ManifestFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub redact_pii: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { redact_pii: true }
    }
}

impl RunConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BOX_SIZE).contains(&self.qr.box_size) {
            return Err(ConfigError::Validation(format!(
                "qr.box_size must be 1-{MAX_BOX_SIZE}"
            )));
        }
        if self.qr.border > MAX_BORDER {
            return Err(ConfigError::Validation(format!(
                "qr.border must be 0-{MAX_BORDER}"
            )));
        }
        if self.input.max_file_size_mb == 0 {
            return Err(ConfigError::Validation(
                "input.max_file_size_mb must be at least 1".into(),
            ));
        }
        if self.input.max_rows == 0 {
            return Err(ConfigError::Validation(
                "input.max_rows must be at least 1".into(),
            ));
        }
        if self.output.filename_template.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.filename_template must not be empty".into(),
            ));
        }
        self.render_params()?;
        Ok(())
    }

    /// QR drawing settings with colors parsed.
    pub fn render_params(&self) -> Result<RenderParams, ConfigError> {
        let color = |key: &str, value: &str| {
            value
                .parse::<Color>()
                .map_err(|e| ConfigError::Validation(format!("qr.{key}: {e}")))
        };
        Ok(RenderParams {
            box_size: self.qr.box_size,
            border: self.qr.border,
            fill: color("fill_color", &self.qr.fill_color)?,
            back: color("back_color", &self.qr.back_color)?,
            error_correction: self.qr.error_correction,
        })
    }

    pub fn input_limits(&self) -> InputLimits {
        InputLimits {
            max_file_size_mb: self.input.max_file_size_mb,
            max_rows: self.input.max_rows,
        }
    }

    /// Directory images are written into: the sandbox root when one is
    /// set, the output folder otherwise.
    pub fn image_dir(&self) -> &Path {
        self.output
            .allowed_root
            .as_deref()
            .unwrap_or(&self.output.folder)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RunConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RunConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RunConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the run config, optionally from a user file.
///
/// Without a path the stock defaults are returned. A path that does not
/// exist is an error: it was asked for explicitly.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# qr-batch Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Use with: qr-batch --config config.toml generate
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Input
# ---------------------------------------------------------------------------
[input]
# Spreadsheet to read: .xlsx, .xls, .csv or .json.
# The first row is the header and must include a "Phone" column.
path = "input/contacts.xlsx"

# Worksheet to read, by 0-based index or by name (workbooks only).
# sheet = "Contacts"
sheet = 0

# Refuse inputs larger than this many megabytes.
max_file_size_mb = 100

# Refuse inputs with more data rows than this.
max_rows = 100000

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory images are written into.
folder = "images"

# Image format: "png", "svg" or "pdf".
format = "png"

# Filename for each image, without extension. Any input column can be used
# as {Column}. {Phone} is the formatted phone. Use {{ and }} for literal
# braces. If a column is missing the phone is used instead.
filename_template = "{Phone}"

# Sandbox: write images under this directory instead of `folder`, and
# reject any filename that would resolve outside it.
# allowed_root = "/srv/qr"

# Replace images that already exist instead of skipping the row.
overwrite = false

# Go through every row without writing any file.
dry_run = false

# ---------------------------------------------------------------------------
# Payload
# ---------------------------------------------------------------------------
[payload]
# What each QR code encodes:
#   phone  - "Phone: <Phone>"                    (needs Phone)
#   vcard  - vCard 3.0 contact                   (needs Phone; Name, Email, Organization)
#   mecard - MeCard contact                      (needs Phone; Name, Email)
#   wifi   - WiFi network                        (needs SSID; Password, Encryption, Hidden)
#   url    - link, https:// added if missing     (needs URL)
#   sms    - prefilled text message              (needs Phone; Message)
#   email  - mailto: link                        (needs Email; Subject, Body)
format = "phone"

# Ensure phone numbers start with "+". When false, "+" is also dropped from
# the phone used in filenames.
keep_plus = true

# Skip rows whose formatted phone was already seen in this run.
dedup = false

# ---------------------------------------------------------------------------
# QR rendering
# ---------------------------------------------------------------------------
[qr]
# Module and background colors: a name ("black", "navy", ...), "#rgb" or "#rrggbb".
fill_color = "black"
back_color = "white"

# Size of one module: pixels for PNG, points for PDF, user units for SVG (1-100).
box_size = 10

# Quiet zone around the symbol, in modules (0-100).
border = 4

# Error correction: "L" (~7%), "M" (~15%), "Q" (~25%), "H" (~30%).
error_correction = "L"

# ---------------------------------------------------------------------------
# Manifest
# ---------------------------------------------------------------------------
[manifest]
# Write manifest.<format> into the output folder listing every image.
enabled = false

# "json" or "csv".
format = "json"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Mask phone numbers and email addresses in log output.
redact_pii = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = RunConfig::default();
        assert_eq!(config.input.path, PathBuf::from("input/contacts.xlsx"));
        assert_eq!(config.input.sheet, SheetSelector::Index(0));
        assert_eq!(config.output.folder, PathBuf::from("images"));
        assert_eq!(config.output.filename_template, "{Phone}");
        assert_eq!(config.payload.format, "phone");
        assert!(config.payload.keep_plus);
        assert!(!config.payload.dedup);
        assert_eq!(config.qr.box_size, 10);
        assert_eq!(config.qr.border, 4);
        assert!(config.logging.redact_pii);
        assert!(!config.manifest.enabled);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[payload]
format = "vcard"
"#;
        let config: RunConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.payload.format, "vcard");
        // Default values preserved
        assert!(config.payload.keep_plus);
        assert_eq!(config.qr.box_size, 10);
    }

    #[test]
    fn parse_sheet_by_name() {
        let config: RunConfig = toml::from_str(
            r#"
[input]
sheet = "People"
"#,
        )
        .unwrap();
        assert_eq!(config.input.sheet, SheetSelector::Name("People".into()));
    }

    #[test]
    fn parse_enums() {
        let config: RunConfig = toml::from_str(
            r#"
[output]
format = "svg"

[qr]
error_correction = "H"

[manifest]
format = "csv"
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::Svg);
        assert_eq!(config.qr.error_correction, ErrorCorrection::High);
        assert_eq!(config.manifest.format, ManifestFormat::Csv);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r##"
[qr]
fill_color = "#123456"
box_size = 5

[output]
allowed_root = "/srv/qr"
"##,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.qr.fill_color, "#123456");
        assert_eq!(config.qr.box_size, 5);
        assert_eq!(config.output.allowed_root, Some(PathBuf::from("/srv/qr")));
        // Unspecified values should be defaults
        assert_eq!(config.qr.back_color, "white");
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"box_size = 10"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"box_size = 4"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("box_size").unwrap().as_integer(), Some(4));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[qr]
box_size = 10
border = 4
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[qr]
border = 1
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let qr = merged.get("qr").unwrap();
        assert_eq!(qr.get("border").unwrap().as_integer(), Some(1));
        // box_size preserved from base
        assert_eq!(qr.get("box_size").unwrap().as_integer(), Some(10));
    }

    #[test]
    fn merge_toml_adds_new_keys() {
        let base: toml::Value = toml::from_str("[output]\nfolder = \"images\"").unwrap();
        let overlay: toml::Value = toml::from_str("[output]\nallowed_root = \"/x\"").unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("folder").unwrap().as_str(), Some("images"));
        assert_eq!(output.get("allowed_root").unwrap().as_str(), Some("/x"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<RunConfig, _> = toml::from_str("[qr]\nbox_sise = 3");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<RunConfig, _> = toml::from_str("[render]\nbox_size = 3");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[payload]\nformatt = \"vcard\"").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    fn overlay(toml_str: &str) -> Result<RunConfig, ConfigError> {
        let overlay: toml::Value = toml::from_str(toml_str).unwrap();
        resolve_config(stock_defaults_value().unwrap(), Some(overlay))
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_box_size_bounds() {
        assert!(overlay("[qr]\nbox_size = 1").is_ok());
        assert!(overlay("[qr]\nbox_size = 100").is_ok());
        assert!(matches!(
            overlay("[qr]\nbox_size = 0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            overlay("[qr]\nbox_size = 101"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_border_bound() {
        assert!(overlay("[qr]\nborder = 0").is_ok());
        assert!(overlay("[qr]\nborder = 101").is_err());
    }

    #[test]
    fn validate_limits() {
        assert!(overlay("[input]\nmax_rows = 0").is_err());
        assert!(overlay("[input]\nmax_file_size_mb = 0").is_err());
    }

    #[test]
    fn validate_colors() {
        assert!(overlay("[qr]\nfill_color = \"#0a0\"").is_ok());
        let err = overlay("[qr]\nback_color = \"blurple\"").unwrap_err();
        assert!(err.to_string().contains("qr.back_color"));
    }

    #[test]
    fn validate_empty_template() {
        assert!(overlay("[output]\nfilename_template = \"  \"").is_err());
    }

    #[test]
    fn render_params_from_config() {
        let config = overlay("[qr]\nfill_color = \"navy\"\nerror_correction = \"Q\"").unwrap();
        let render = config.render_params().unwrap();
        assert_eq!(render.fill, Color([0, 0, 128]));
        assert_eq!(render.back, Color::WHITE);
        assert_eq!(render.error_correction, ErrorCorrection::Quartile);
    }

    #[test]
    fn image_dir_prefers_allowed_root() {
        let mut config = RunConfig::default();
        assert_eq!(config.image_dir(), Path::new("images"));
        config.output.allowed_root = Some(PathBuf::from("/srv/qr"));
        assert_eq!(config.image_dir(), Path::new("/srv/qr"));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value =
            toml::from_str(stock_config_toml()).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: RunConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[input]", "[output]", "[payload]", "[qr]", "[manifest]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for section in ["input", "output", "payload", "qr", "manifest", "logging"] {
            assert!(val.get(section).is_some(), "missing {section}");
        }
        // No sandbox by default
        assert!(val["output"].get("allowed_root").is_none());
    }
}
