//! PII redaction for log text.
//!
//! Phone-number-like and email-like substrings are masked before a message
//! reaches the log sink. Filenames on disk and QR payloads are never
//! redacted; only what gets printed is.
//!
//! | Input | Redacted |
//! |---|---|
//! | `+441234567890` | `+********7890` |
//! | `john@example.com` | `j**n@e******.com` |

use regex::Regex;
use std::sync::LazyLock;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?(\(?\d{2,4}\)?[-.\s]?)?\d{3,4}[-.\s]?\d{3,4}")
        .expect("valid regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

fn stars(n: usize) -> String {
    "*".repeat(n)
}

/// Mask all but the last four digits, keeping a leading `+`.
///
/// Separators are dropped from the masked form. Values with four digits or
/// fewer are returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return phone.to_string();
    }
    let prefix = if phone.trim_start().starts_with('+') { "+" } else { "" };
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("{prefix}{}{tail}", stars(digits.len() - 4))
}

/// Keep the first and last character of the local part and the first
/// character of the domain's first label.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };

    let local_chars: Vec<char> = local.chars().collect();
    let local = match local_chars.as_slice() {
        [first, middle @ .., last] if !middle.is_empty() => {
            format!("{first}{}{last}", stars(middle.len()))
        }
        _ => stars(local_chars.len()),
    };

    let (label, rest) = match domain.split_once('.') {
        Some((label, rest)) => (label, Some(rest)),
        None => (domain, None),
    };
    let mut label_chars = label.chars();
    let label = match label_chars.next() {
        Some(first) => format!("{first}{}", stars(label_chars.count())),
        None => String::new(),
    };

    match rest {
        Some(rest) => format!("{local}@{label}.{rest}"),
        None => format!("{local}@{label}"),
    }
}

/// Mask every email and phone number found in `text`.
pub fn redact_pii(text: &str) -> String {
    // Emails first so digits inside an address are not read as a phone.
    let text = EMAIL_RE.replace_all(text, |caps: &regex::Captures| mask_email(&caps[0]));
    PHONE_RE
        .replace_all(&text, |caps: &regex::Captures| mask_phone(&caps[0]))
        .into_owned()
}

/// [`redact_pii`] when `enabled`, otherwise the text unchanged.
pub fn redact_if(enabled: bool, text: &str) -> String {
    if enabled {
        redact_pii(text)
    } else {
        text.to_string()
    }
}
