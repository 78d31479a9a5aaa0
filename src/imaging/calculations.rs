//! Pure layout calculations for drawing a QR module grid.
//!
//! All functions here are pure and testable without encoding or I/O.

/// Square grid of QR modules, `true` = dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    width: usize,
    cells: Vec<bool>,
}

impl ModuleGrid {
    /// `cells` is row-major and must hold `width * width` entries.
    pub fn new(width: usize, cells: Vec<bool>) -> Option<Self> {
        (cells.len() == width * width).then_some(Self { width, cells })
    }

    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }
}

/// Side length of the drawing in output units (pixels or points).
///
/// ```text
/// (modules + 2 × border) × box_size
/// ```
pub fn canvas_size(modules: usize, box_size: u32, border: u32) -> u32 {
    (modules as u32 + 2 * border) * box_size
}

/// Top-left corner of module `(x, y)` in output units, y growing downwards.
pub fn module_origin(x: usize, y: usize, box_size: u32, border: u32) -> (u32, u32) {
    (
        (x as u32 + border) * box_size,
        (y as u32 + border) * box_size,
    )
}

/// Horizontal runs of dark modules in one row as `(start, length)`.
///
/// Vector output draws one rectangle per run instead of one per module.
pub fn dark_runs(row: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (x, &dark) in row.iter().enumerate() {
        match (dark, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                runs.push((s, x - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, row.len() - s));
    }
    runs
}
