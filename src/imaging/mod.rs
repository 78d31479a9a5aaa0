//! QR rendering in pure Rust, no system libraries.
//!
//! | Output | Crate / function |
//! |---|---|
//! | **Encode** | `qrcode` (symbol only, no renderer features) |
//! | **PNG** | `image::RgbImage` painted from the module grid |
//! | **SVG** | hand-written single-path document |
//! | **PDF** | single page via `pdf-writer`, vector rectangles |
//!
//! The module is split into:
//! - **Calculations**: Pure layout math over the module grid (unit testable)
//! - **Parameters**: Colors and render/emit settings
//! - **Backend**: [`QrBackend`] trait + [`RustBackend`]
//! - **Vector**: SVG and PDF serializers

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
mod vector;

pub use backend::{BackendError, MAX_PAYLOAD_BYTES, QrBackend};
pub use calculations::ModuleGrid;
pub use params::{Color, ColorError, EmitParams, RenderParams};
pub use rust_backend::RustBackend;
