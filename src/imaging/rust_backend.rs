//! Pure Rust QR backend.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Symbol encoding | `qrcode::QrCode::with_error_correction_level` |
//! | Module matrix | `QrCode::to_colors` → [`ModuleGrid`] |
//! | PNG | `image::RgbImage`, painted module by module |
//! | SVG / PDF | [`vector`](super::vector), one rectangle per dark run |
//!
//! Rendering always goes through the module matrix so box size, quiet zone
//! and colors come out the same in every container.

use super::backend::{BackendError, MAX_RASTER_SIZE, QrBackend, check_capacity};
use super::calculations::{ModuleGrid, canvas_size, module_origin};
use super::params::{EmitParams, RenderParams};
use super::vector::{pdf_document, svg_document};
use crate::types::{ErrorCorrection, OutputFormat};
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};

pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::Low => EcLevel::L,
        ErrorCorrection::Medium => EcLevel::M,
        ErrorCorrection::Quartile => EcLevel::Q,
        ErrorCorrection::High => EcLevel::H,
    }
}

/// Encode `payload` into a module grid.
pub fn encode(payload: &str, level: ErrorCorrection) -> Result<ModuleGrid, BackendError> {
    check_capacity(payload)?;
    let code = QrCode::with_error_correction_level(payload.as_bytes(), ec_level(level))
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    let width = code.width();
    let cells = code
        .to_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();
    ModuleGrid::new(width, cells)
        .ok_or_else(|| BackendError::Encode("module matrix is not square".to_string()))
}

/// Paint the grid into an RGB raster. Refuses canvases wider than
/// [`MAX_RASTER_SIZE`] before allocating.
pub fn render_raster(grid: &ModuleGrid, render: &RenderParams) -> Result<RgbImage, BackendError> {
    let size = canvas_size(grid.width(), render.box_size, render.border);
    if size > MAX_RASTER_SIZE {
        return Err(BackendError::CanvasTooLarge {
            size,
            max: MAX_RASTER_SIZE,
        });
    }
    let mut img = RgbImage::from_pixel(size, size, Rgb(render.back.rgb()));
    let fill = Rgb(render.fill.rgb());

    for y in 0..grid.width() {
        for x in 0..grid.width() {
            if !grid.is_dark(x, y) {
                continue;
            }
            let (px, py) = module_origin(x, y, render.box_size, render.border);
            for dy in 0..render.box_size {
                for dx in 0..render.box_size {
                    img.put_pixel(px + dx, py + dy, fill);
                }
            }
        }
    }
    Ok(img)
}

impl QrBackend for RustBackend {
    fn emit(&self, params: &EmitParams) -> Result<(), BackendError> {
        let grid = encode(&params.payload, params.render.error_correction)?;

        if let Some(parent) = params.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match params.format {
            OutputFormat::Png => {
                render_raster(&grid, &params.render)?
                    .save_with_format(&params.output, ImageFormat::Png)?;
            }
            OutputFormat::Svg => std::fs::write(&params.output, svg_document(&grid, &params.render))?,
            OutputFormat::Pdf => std::fs::write(&params.output, pdf_document(&grid, &params.render))?,
        }
        Ok(())
    }
}
