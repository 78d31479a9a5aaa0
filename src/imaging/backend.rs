//! QR emission backend trait and shared error type.
//!
//! The [`QrBackend`] trait is the one seam between the row pipeline and
//! pixels: given a payload, a target path and render settings, write a file.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use
//! [`tests::MockBackend`], which records calls and optionally writes a stub
//! file so existence checks behave like a real run.

use super::params::EmitParams;
use thiserror::Error;

/// Byte capacity of the largest QR symbol (version 40, level L, byte mode).
pub const MAX_PAYLOAD_BYTES: usize = 2953;

/// Largest PNG edge, in pixels. Keeps one image near 300 MB of RGB at most.
pub const MAX_RASTER_SIZE: u32 = 10_000;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("QR encoding failed: {0}")]
    Encode(String),
    #[error("Data exceeds maximum QR code capacity")]
    CapacityExceeded { len: usize },
    #[error("Image would be {size}px wide, over the {max}px limit; lower box_size or border")]
    CanvasTooLarge { size: u32, max: u32 },
}

/// Something that can turn a payload into an image file.
pub trait QrBackend {
    /// Encode `params.payload` and write it to `params.output`, creating
    /// parent directories as needed.
    fn emit(&self, params: &EmitParams) -> Result<(), BackendError>;
}

/// Reject payloads no QR version can hold.
pub fn check_capacity(payload: &str) -> Result<(), BackendError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(BackendError::CapacityExceeded { len: payload.len() });
    }
    Ok(())
}
