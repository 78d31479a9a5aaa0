//! Parameter types for QR emission.
//!
//! These structs describe *what* to draw, not *how*. They are the interface
//! between the orchestrator (which decides payload and target path) and the
//! [`backend`](super::backend) (which encodes and writes the file), so a mock
//! backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Color`]: An RGB color parsed from `#rgb`, `#rrggbb` or a CSS-style name.
//! - [`RenderParams`]: Module size, quiet zone, colors and error correction.
//! - [`EmitParams`]: One emission: payload, output path, container format, render settings.

use crate::types::{ErrorCorrection, OutputFormat};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("navy", [0, 0, 128]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("orange", [255, 165, 0]),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid color '{0}': expected #rgb, #rrggbb or a color name")]
pub struct ColorError(pub String);

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const WHITE: Color = Color([255, 255, 255]);

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    /// `#rrggbb`, lowercase.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect.
    pub fn unit(self) -> [f32; 3] {
        self.0.map(|c| c as f32 / 255.0)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ColorError(s.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            let digits: Vec<u8> = match hex.len() {
                3 => hex
                    .chars()
                    .map(|c| c.to_digit(16).map_or(0, |d| (d * 17) as u8))
                    .collect(),
                6 => (0..3)
                    .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| err()))
                    .collect::<Result<_, _>>()?,
                _ => return Err(err()),
            };
            return Ok(Color([digits[0], digits[1], digits[2]]));
        }

        NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|(_, rgb)| Color(*rgb))
            .ok_or_else(err)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// How every symbol is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    /// Pixels (PNG) or points/user units (PDF/SVG) per module.
    pub box_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
    pub fill: Color,
    pub back: Color,
    pub error_correction: ErrorCorrection,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            box_size: 10,
            border: 4,
            fill: Color::BLACK,
            back: Color::WHITE,
            error_correction: ErrorCorrection::Low,
        }
    }
}

/// One QR image to write.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitParams {
    pub payload: String,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub render: RenderParams,
}
