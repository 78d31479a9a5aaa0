//! Payload construction: what each QR code actually encodes.
//!
//! A [`PayloadFormat`] names one of the seven supported encodings and knows
//! which columns it needs. Callers must run [`PayloadFormat::validate`] before
//! [`PayloadFormat::generate`]; generation itself never fails and fills
//! missing optional values with empty strings or a documented default.
//!
//! | Format | Required | Optional | Output |
//! |--------|----------|----------|--------|
//! | `phone` | Phone | | `Phone: +44…` |
//! | `vcard` | Phone | Name, Email, Organization | vCard 3.0, newline-joined |
//! | `mecard` | Phone | Name, Email | `MECARD:N:…;TEL:…;;` |
//! | `wifi` | SSID | Password, Encryption, Hidden | `WIFI:T:WPA;S:…;P:…;H:false;;` |
//! | `url` | URL | | `https://…` |
//! | `sms` | Phone | Message | `smsto:…:…` |
//! | `email` | Email | Subject, Body | `mailto:…?subject=…&body=…` |
//!
//! Values are inserted verbatim. No escaping or percent-encoding is applied,
//! so the generated text matches what earlier releases produced.

use crate::types::RowRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name used when a contact row has no `Name`.
pub const DEFAULT_NAME: &str = "Unknown";
/// WiFi encryption when the row has none.
pub const DEFAULT_ENCRYPTION: &str = "WPA";
/// WiFi hidden flag when the row has none.
pub const DEFAULT_HIDDEN: &str = "false";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Unknown payload format: {0}")]
    UnknownPayloadFormat(String),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Phone,
    Vcard,
    Mecard,
    Wifi,
    Url,
    Sms,
    Email,
}

impl PayloadFormat {
    pub const ALL: [PayloadFormat; 7] = [
        PayloadFormat::Phone,
        PayloadFormat::Vcard,
        PayloadFormat::Mecard,
        PayloadFormat::Wifi,
        PayloadFormat::Url,
        PayloadFormat::Sms,
        PayloadFormat::Email,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PayloadFormat::Phone => "phone",
            PayloadFormat::Vcard => "vcard",
            PayloadFormat::Mecard => "mecard",
            PayloadFormat::Wifi => "wifi",
            PayloadFormat::Url => "url",
            PayloadFormat::Sms => "sms",
            PayloadFormat::Email => "email",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PayloadFormat::Phone => "Simple phone number payload",
            PayloadFormat::Vcard => "vCard 3.0 format",
            PayloadFormat::Mecard => "MeCard format",
            PayloadFormat::Wifi => "WiFi network configuration",
            PayloadFormat::Url => "URL payload",
            PayloadFormat::Sms => "SMS message",
            PayloadFormat::Email => "Email message",
        }
    }

    /// Columns that must be present and non-empty, in check order.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            PayloadFormat::Wifi => &["SSID"],
            PayloadFormat::Url => &["URL"],
            PayloadFormat::Email => &["Email"],
            PayloadFormat::Phone | PayloadFormat::Vcard | PayloadFormat::Mecard | PayloadFormat::Sms => {
                &["Phone"]
            }
        }
    }

    pub fn optional_columns(self) -> &'static [&'static str] {
        match self {
            PayloadFormat::Phone | PayloadFormat::Url => &[],
            PayloadFormat::Vcard => &["Name", "Email", "Organization"],
            PayloadFormat::Mecard => &["Name", "Email"],
            PayloadFormat::Wifi => &["Password", "Encryption", "Hidden"],
            PayloadFormat::Sms => &["Message"],
            PayloadFormat::Email => &["Subject", "Body"],
        }
    }

    /// Report the first required column that is absent or empty.
    pub fn validate(self, row: &RowRecord) -> Result<(), PayloadError> {
        match self
            .required_columns()
            .iter()
            .find(|col| row.non_empty(col).is_none())
        {
            Some(col) => Err(PayloadError::MissingColumn((*col).to_string())),
            None => Ok(()),
        }
    }

    /// Build the payload text. Assumes [`validate`](Self::validate) passed.
    pub fn generate(self, row: &RowRecord) -> String {
        match self {
            PayloadFormat::Phone => format!("Phone: {}", row.value("Phone")),
            PayloadFormat::Vcard => vcard(row),
            PayloadFormat::Mecard => mecard(row),
            PayloadFormat::Wifi => wifi(row),
            PayloadFormat::Url => url(row.value("URL")),
            PayloadFormat::Sms => format!("smsto:{}:{}", row.value("Phone"), row.value("Message")),
            PayloadFormat::Email => mailto(row),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PayloadFormat::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| PayloadError::UnknownPayloadFormat(s.to_string()))
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn vcard(row: &RowRecord) -> String {
    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("FN:{}", row.non_empty("Name").unwrap_or(DEFAULT_NAME)),
        format!("TEL:{}", row.value("Phone")),
    ];
    if let Some(email) = row.non_empty("Email") {
        lines.push(format!("EMAIL:{email}"));
    }
    if let Some(org) = row.non_empty("Organization") {
        lines.push(format!("ORG:{org}"));
    }
    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

fn mecard(row: &RowRecord) -> String {
    let mut out = format!(
        "MECARD:N:{};TEL:{};",
        row.non_empty("Name").unwrap_or(DEFAULT_NAME),
        row.value("Phone")
    );
    if let Some(email) = row.non_empty("Email") {
        out.push_str(&format!("EMAIL:{email};"));
    }
    out.push(';');
    out
}

fn wifi(row: &RowRecord) -> String {
    let mut out = format!(
        "WIFI:T:{};S:{};",
        row.non_empty("Encryption").unwrap_or(DEFAULT_ENCRYPTION),
        row.value("SSID")
    );
    if let Some(password) = row.non_empty("Password") {
        out.push_str(&format!("P:{password};"));
    }
    out.push_str(&format!(
        "H:{};;",
        row.non_empty("Hidden").unwrap_or(DEFAULT_HIDDEN)
    ));
    out
}

fn url(value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        format!("https://{value}")
    }
}

fn mailto(row: &RowRecord) -> String {
    let mut out = format!("mailto:{}", row.value("Email"));
    let params: Vec<String> = [("subject", "Subject"), ("body", "Body")]
        .into_iter()
        .filter_map(|(key, col)| row.non_empty(col).map(|v| format!("{key}={v}")))
        .collect();
    if !params.is_empty() {
        out.push('?');
        out.push_str(&params.join("&"));
    }
    out
}
