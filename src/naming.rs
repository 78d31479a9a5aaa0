//! Filename templating and sanitization.
//!
//! Output filenames are built from a template such as `{Name}_{Phone}` and the
//! values of one row. Row values are untrusted, so every value is cleaned on
//! its own before it is substituted, and the expanded name is cleaned again as
//! a whole:
//!
//! ```text
//! row value ─► traversal check ─► absolute-path check ─► sanitize_filename ─┐
//!                                                                          │
//! template ──────────────────────────── expand {Column} placeholders ◄────┘
//!                                                   │
//!                      "{stem}.{ext}" ─► sanitize_filename ─► filename
//! ```
//!
//! Resolution never fails. A placeholder naming a column the row does not
//! have, a malformed template, or an empty expansion all fall back to the
//! sanitized phone as the stem.
//!
//! ## Sanitized filenames
//!
//! [`sanitize_filename`] guarantees the result:
//! - contains none of `< > : " / \ | ? *` nor control characters `0x00–0x1F`
//!   (each is replaced by `_`);
//! - is not a Windows device name (`CON`, `PRN`, `AUX`, `NUL`, `COM1`–`COM9`,
//!   `LPT1`–`LPT9`, compared case-insensitively on the part before the last
//!   dot); such names get a leading `_`;
//! - is at most [`MAX_FILENAME_LENGTH`] characters, truncating the stem and
//!   keeping the extension.

use crate::types::{OutputFormat, RowRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Longest filename most filesystems accept, in characters.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Placeholder overridden with the formatted phone.
pub const PHONE_COLUMN: &str = "Phone";

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Matched case-insensitively.
const TRAVERSAL_PATTERNS: &[&str] = &["../", "..\\", "%2e%2e/", "%2e%2e\\"];

fn is_forbidden_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || (c as u32) < 0x20
}

/// Make `name` safe to use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    sanitize_filename_with_limit(name, MAX_FILENAME_LENGTH)
}

/// [`sanitize_filename`] with an explicit length limit (in characters).
pub fn sanitize_filename_with_limit(name: &str, max_length: usize) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if is_forbidden_char(c) { '_' } else { c })
        .collect();

    let stem = sanitized
        .rsplit_once('.')
        .map_or(sanitized.as_str(), |(stem, _)| stem);
    if is_reserved_name(stem) {
        sanitized.insert(0, '_');
    }

    if sanitized.chars().count() > max_length {
        sanitized = match sanitized.rsplit_once('.') {
            Some((stem, ext)) if !ext.is_empty() => {
                let keep = max_length.saturating_sub(ext.chars().count() + 1);
                let stem: String = stem.chars().take(keep).collect();
                format!("{stem}.{ext}")
            }
            _ => sanitized.chars().take(max_length).collect(),
        };
    }
    sanitized
}

/// True for Windows device names, ignoring case.
pub fn is_reserved_name(stem: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

/// True when `value` contains `../`, `..\` or a percent-encoded form of either.
pub fn is_path_traversal(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    TRAVERSAL_PATTERNS.iter().any(|p| lower.contains(p))
}

/// True for drive-letter (`C:\`, `c:/`) or UNC-style (`\\`, `//`) prefixes.
pub fn has_absolute_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\');
    drive || value.starts_with("\\\\") || value.starts_with("//")
}

/// Values rooted at `/` or `\` are flagged too; sanitization already turns
/// the leading separator into `_`.
fn looks_absolute(value: &str) -> bool {
    has_absolute_prefix(value) || value.starts_with('/') || value.starts_with('\\')
}

/// Replace `pattern` everywhere in `haystack`, ignoring ASCII case.
fn replace_ignore_ascii_case(haystack: &str, pattern: &str, with: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    // ASCII lowercasing keeps byte offsets, so matches in `lower` index `haystack`.
    for (start, _) in lower.match_indices(pattern) {
        out.push_str(&haystack[last..start]);
        out.push_str(with);
        last = start + pattern.len();
    }
    out.push_str(&haystack[last..]);
    out
}

/// Strip traversal sequences from a flagged value. No `..` survives.
fn neutralize_traversal(value: &str) -> String {
    let mut out = value.to_string();
    for pattern in TRAVERSAL_PATTERNS {
        out = replace_ignore_ascii_case(&out, pattern, "_");
    }
    while out.contains("..") {
        out = out.replace("..", "_");
    }
    format!("_{out}")
}

/// Something suspicious found in a template value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueWarning {
    PathTraversal { column: String },
    AbsolutePath { column: String },
}

impl std::fmt::Display for ValueWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueWarning::PathTraversal { column } => {
                write!(f, "Path traversal detected in column '{column}'")
            }
            ValueWarning::AbsolutePath { column } => {
                write!(f, "Absolute path in column '{column}' is not allowed")
            }
        }
    }
}

/// Clean one row value for substitution into a filename template.
///
/// Returns the cleaned value and, when the raw value was suspicious, the
/// warning to report. Suspicious values are rewritten, never rejected.
pub fn sanitize_template_value(column: &str, value: &str) -> (String, Option<ValueWarning>) {
    let mut warning = None;
    let mut cleaned = value.to_string();

    if is_path_traversal(&cleaned) {
        cleaned = neutralize_traversal(&cleaned);
        warning = Some(ValueWarning::PathTraversal {
            column: column.to_string(),
        });
    }
    if looks_absolute(&cleaned) {
        if has_absolute_prefix(&cleaned) {
            cleaned.insert(0, '_');
        }
        warning.get_or_insert_with(|| ValueWarning::AbsolutePath {
            column: column.to_string(),
        });
    }

    (sanitize_filename(&cleaned), warning)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown column in template: {0}")]
    UnknownColumn(String),
    #[error("Empty placeholder in template")]
    EmptyPlaceholder,
    #[error("Unclosed '{{' in template")]
    Unclosed,
    #[error("Single '}}' in template")]
    StrayClose,
    #[error("Template expanded to an empty name")]
    EmptyResult,
}

/// Substitute `{Column}` placeholders. `{{` and `}}` are literal braces.
pub fn expand_template(
    template: &str,
    values: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => return Err(TemplateError::Unclosed),
                    }
                }
                if key.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder);
                }
                let value = values
                    .get(&key)
                    .ok_or_else(|| TemplateError::UnknownColumn(key.clone()))?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(TemplateError::StrayClose),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Outcome of resolving one row's filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Final filename including extension.
    pub filename: String,
    /// Set when the template could not be used and the phone stem was.
    pub fallback: Option<TemplateError>,
    /// Suspicious row values that were rewritten.
    pub warnings: Vec<ValueWarning>,
}

/// Turns a filename template plus a row into a safe filename.
#[derive(Debug, Clone)]
pub struct FilenameResolver {
    template: String,
    format: OutputFormat,
}

impl FilenameResolver {
    pub fn new(template: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            template: template.into(),
            format,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Resolve the filename for `row`.
    ///
    /// `phone` is the formatted phone; it replaces the row's `Phone` value
    /// (with its leading `+` removed unless `keep_plus`).
    pub fn resolve(&self, row: &RowRecord, phone: &str, keep_plus: bool) -> ResolvedName {
        let phone = crate::phone::filename_phone(phone, keep_plus);
        let mut warnings = Vec::new();
        let mut values: HashMap<String, String> = HashMap::new();

        for (column, raw) in row.iter() {
            let raw = if column == PHONE_COLUMN { phone.as_str() } else { raw };
            let (cleaned, warning) = sanitize_template_value(column, raw);
            warnings.extend(warning);
            values.insert(column.to_string(), cleaned);
        }
        if !values.contains_key(PHONE_COLUMN) {
            let (cleaned, warning) = sanitize_template_value(PHONE_COLUMN, &phone);
            warnings.extend(warning);
            values.insert(PHONE_COLUMN.to_string(), cleaned);
        }

        let fallback_stem = || values.get(PHONE_COLUMN).cloned().unwrap_or_default();
        let (stem, fallback) = match expand_template(&self.template, &values) {
            Ok(stem) if !stem.trim().is_empty() => (stem, None),
            Ok(_) => (fallback_stem(), Some(TemplateError::EmptyResult)),
            Err(e) => (fallback_stem(), Some(e)),
        };

        ResolvedName {
            filename: sanitize_filename(&format!("{stem}.{}", self.format.extension())),
            fallback,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RowRecord {
        RowRecord::new(2)
            .with("Phone", "441234567890")
            .with("Name", "John Smith")
            .with("Email", "john@example.com")
    }

    // =========================================================================
    // sanitize_filename
    // =========================================================================

    #[test]
    fn clean_name_unchanged() {
        assert_eq!(sanitize_filename("test.png"), "test.png");
    }

    #[test]
    fn forbidden_characters_become_underscores() {
        assert_eq!(sanitize_filename("test<>file.png"), "test__file.png");
        assert_eq!(sanitize_filename("a:b\"c|d?e*f.png"), "a_b_c_d_e_f.png");
        assert_eq!(sanitize_filename("tab\there\u{1f}.png"), "tab_here_.png");
        assert_eq!(sanitize_filename("dir/sub\\file"), "dir_sub_file");
    }

    #[test]
    fn reserved_names_get_prefix() {
        assert_eq!(sanitize_filename("CON.png"), "_CON.png");
        assert_eq!(sanitize_filename("PRN.png"), "_PRN.png");
        assert_eq!(sanitize_filename("aux.png"), "_aux.png");
        assert_eq!(sanitize_filename("lpt9"), "_lpt9");
        assert_eq!(sanitize_filename("CONSOLE.png"), "CONSOLE.png");
    }

    #[test]
    fn long_names_truncate_stem_and_keep_extension() {
        let long = format!("{}.png", "a".repeat(300));
        let result = sanitize_filename(&long);
        assert_eq!(result.chars().count(), MAX_FILENAME_LENGTH);
        assert!(result.ends_with(".png"));
    }

    #[test]
    fn long_names_without_extension_truncate() {
        let result = sanitize_filename(&"b".repeat(300));
        assert_eq!(result.chars().count(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = format!("{}.svg", "é".repeat(300));
        let result = sanitize_filename(&long);
        assert_eq!(result.chars().count(), MAX_FILENAME_LENGTH);
        assert!(result.ends_with(".svg"));
    }

    // =========================================================================
    // Template values
    // =========================================================================

    #[test]
    fn traversal_detection() {
        assert!(is_path_traversal("../etc/passwd"));
        assert!(is_path_traversal("..\\windows\\system32"));
        assert!(is_path_traversal("%2E%2E/secret"));
        assert!(!is_path_traversal("normal_file.txt"));
        assert!(!is_path_traversal("John..Smith"));
    }

    #[test]
    fn traversal_value_has_no_dot_dot() {
        for raw in ["../etc/passwd", "....//x", "a..b/../c", "%2E%2e\\..\\boot", "..\\..\\"] {
            let (cleaned, warning) = sanitize_template_value("Name", raw);
            assert!(!cleaned.contains(".."), "{raw} -> {cleaned}");
            assert!(cleaned.starts_with('_'));
            assert!(matches!(warning, Some(ValueWarning::PathTraversal { .. })));
        }
    }

    #[test]
    fn absolute_prefixes_are_detected() {
        assert!(has_absolute_prefix("C:\\Users\\file"));
        assert!(has_absolute_prefix("d:/data"));
        assert!(has_absolute_prefix("\\\\server\\share"));
        assert!(has_absolute_prefix("//server/share"));
        assert!(!has_absolute_prefix("relative/file"));
        assert!(!has_absolute_prefix("/etc/passwd"));
    }

    #[test]
    fn absolute_values_get_underscore_prefix() {
        let (cleaned, warning) = sanitize_template_value("Name", "C:\\Windows");
        assert_eq!(cleaned, "_C__Windows");
        assert!(matches!(warning, Some(ValueWarning::AbsolutePath { .. })));

        let (cleaned, _) = sanitize_template_value("Name", "/etc/passwd");
        assert_eq!(cleaned, "_etc_passwd");
    }

    #[test]
    fn plain_values_have_no_warning() {
        let (cleaned, warning) = sanitize_template_value("Name", "John Smith");
        assert_eq!(cleaned, "John Smith");
        assert_eq!(warning, None);
    }

    // =========================================================================
    // Template expansion
    // =========================================================================

    #[test]
    fn expand_substitutes_and_unescapes() {
        let values = HashMap::from([("Name".to_string(), "Ann".to_string())]);
        assert_eq!(expand_template("{Name}-card", &values).unwrap(), "Ann-card");
        assert_eq!(expand_template("{{{Name}}}", &values).unwrap(), "{Ann}");
    }

    #[test]
    fn expand_errors() {
        let values = HashMap::new();
        assert_eq!(
            expand_template("{Missing}", &values),
            Err(TemplateError::UnknownColumn("Missing".into()))
        );
        assert_eq!(expand_template("{}", &values), Err(TemplateError::EmptyPlaceholder));
        assert_eq!(expand_template("{Name", &values), Err(TemplateError::Unclosed));
        assert_eq!(expand_template("Name}", &values), Err(TemplateError::StrayClose));
    }

    // =========================================================================
    // FilenameResolver
    // =========================================================================

    #[test]
    fn default_template_uses_formatted_phone() {
        let resolver = FilenameResolver::new("{Phone}", OutputFormat::Png);
        let resolved = resolver.resolve(&row(), "+441234567890", true);
        assert_eq!(resolved.filename, "+441234567890.png");
        assert_eq!(resolved.fallback, None);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn without_keep_plus_phone_loses_plus() {
        let resolver = FilenameResolver::new("{Phone}", OutputFormat::Svg);
        let resolved = resolver.resolve(&row(), "+441234567890", false);
        assert_eq!(resolved.filename, "441234567890.svg");
    }

    #[test]
    fn multi_column_template() {
        let resolver = FilenameResolver::new("{Name}_{Phone}", OutputFormat::Pdf);
        let resolved = resolver.resolve(&row(), "+441234567890", true);
        assert_eq!(resolved.filename, "John Smith_+441234567890.pdf");
    }

    #[test]
    fn missing_column_falls_back_to_phone() {
        let resolver = FilenameResolver::new("{Company}", OutputFormat::Png);
        let resolved = resolver.resolve(&row(), "+441234567890", true);
        assert_eq!(resolved.filename, "+441234567890.png");
        assert_eq!(
            resolved.fallback,
            Some(TemplateError::UnknownColumn("Company".into()))
        );
    }

    #[test]
    fn fallback_uses_cleaned_phone() {
        let traversal = RowRecord::new(2).with("Phone", "../../etc/passwd");
        let resolved = FilenameResolver::new("{Company}", OutputFormat::Png).resolve(
            &traversal,
            "+../../etc/passwd",
            false,
        );
        assert!(!resolved.filename.contains(".."));
        assert!(!resolved.filename.contains('/'));
        assert!(resolved.filename.ends_with(".png"));
        assert_eq!(
            resolved.warnings,
            vec![ValueWarning::PathTraversal {
                column: "Phone".into()
            }]
        );

        let backslashes = RowRecord::new(3).with("Phone", "..\\..\\x");
        let resolved = FilenameResolver::new("{Name", OutputFormat::Svg).resolve(
            &backslashes,
            "..\\..\\x",
            false,
        );
        assert_eq!(resolved.fallback, Some(TemplateError::Unclosed));
        assert!(!resolved.filename.contains(".."));
        assert!(!resolved.filename.contains('\\'));
    }

    #[test]
    fn empty_expansion_falls_back_to_phone() {
        let resolver = FilenameResolver::new("{Name}", OutputFormat::Png);
        let row = RowRecord::new(3).with("Phone", "123").with("Name", "");
        let resolved = resolver.resolve(&row, "+1234567", true);
        assert_eq!(resolved.filename, "+1234567.png");
        assert_eq!(resolved.fallback, Some(TemplateError::EmptyResult));
    }

    #[test]
    fn traversal_in_row_value_stays_in_one_component() {
        let resolver = FilenameResolver::new("{Name}", OutputFormat::Png);
        let row = row().with("Name", "../../etc/passwd");
        let resolved = resolver.resolve(&row, "+441234567890", true);
        assert!(!resolved.filename.contains(".."));
        assert!(!resolved.filename.contains('/'));
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn reserved_stem_from_row_value() {
        let resolver = FilenameResolver::new("{Name}", OutputFormat::Png);
        let row = row().with("Name", "CON");
        let resolved = resolver.resolve(&row, "+441234567890", true);
        assert_eq!(resolved.filename, "_CON.png");
    }

    #[test]
    fn long_values_leave_room_for_extension() {
        let resolver = FilenameResolver::new("{Name}", OutputFormat::Png);
        let row = row().with("Name", "x".repeat(400));
        let resolved = resolver.resolve(&row, "+441234567890", true);
        assert_eq!(resolved.filename.chars().count(), MAX_FILENAME_LENGTH);
        assert!(resolved.filename.ends_with(".png"));
    }

    #[test]
    fn phone_placeholder_works_without_phone_column() {
        let resolver = FilenameResolver::new("wifi-{Phone}", OutputFormat::Png);
        let row = RowRecord::new(2).with("SSID", "Cafe");
        let resolved = resolver.resolve(&row, "+100", true);
        assert_eq!(resolved.filename, "wifi-+100.png");
    }
}
