//! Phone number formatting and plausibility checks.
//!
//! The formatted phone is the row's identity: it is the deduplication key and
//! the default filename stem. Formatting is purely textual. Two spellings of
//! the same number (`07700…` and `+447700…`) stay distinct.

use thiserror::Error;

/// Fewest digits a dialable number can have.
pub const MIN_DIGITS: usize = 7;
/// E.164 upper bound.
pub const MAX_DIGITS: usize = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Phone number cannot be empty")]
    Empty,
    #[error("Phone number must have at least 7 digits")]
    TooShort,
    #[error("Phone number cannot exceed 15 digits (E.164)")]
    TooLong,
}

/// Trim the raw cell and, when `keep_plus` is set, prefix `+` if missing.
pub fn format_phone(raw: &str, keep_plus: bool) -> String {
    let phone = raw.trim();
    if keep_plus && !phone.starts_with('+') {
        format!("+{phone}")
    } else {
        phone.to_string()
    }
}

/// The phone as it appears in filenames: leading `+` removed unless
/// `keep_plus` is set.
pub fn filename_phone(formatted: &str, keep_plus: bool) -> String {
    if keep_plus {
        formatted.to_string()
    } else {
        formatted.trim_start_matches('+').to_string()
    }
}

/// Check the number has a plausible digit count.
pub fn validate_phone(raw: &str) -> Result<(), PhoneError> {
    if raw.trim().is_empty() {
        return Err(PhoneError::Empty);
    }
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < MIN_DIGITS {
        return Err(PhoneError::TooShort);
    }
    if digits > MAX_DIGITS {
        return Err(PhoneError::TooLong);
    }
    Ok(())
}
