//! SVG and PDF writers for a module grid.
//!
//! Both formats draw the background as one rectangle and every horizontal
//! run of dark modules (see [`dark_runs`]) as another, so output size grows
//! with the number of runs rather than the number of modules. One module is
//! `box_size` user units in SVG and `box_size` points in PDF.
//!
//! The PDF is a single page written with `pdf-writer`: one uncompressed
//! content stream of `re`/`f` operators, no fonts or images.

use super::calculations::{ModuleGrid, canvas_size, dark_runs, module_origin};
use super::params::RenderParams;
use pdf_writer::{Content, Finish, Pdf, Rect, Ref};

/// `(x, y, width)` of every dark run, y growing downwards. Height is always
/// one module.
fn run_rects(grid: &ModuleGrid, render: &RenderParams) -> Vec<(u32, u32, u32)> {
    (0..grid.width())
        .flat_map(|y| {
            dark_runs(grid.row(y)).into_iter().map(move |(x, len)| {
                let (px, py) = module_origin(x, y, render.box_size, render.border);
                (px, py, len as u32 * render.box_size)
            })
        })
        .collect()
}

pub fn svg_document(grid: &ModuleGrid, render: &RenderParams) -> String {
    let size = canvas_size(grid.width(), render.box_size, render.border);
    let path: String = run_rects(grid, render)
        .into_iter()
        .map(|(x, y, w)| format!("M{x},{y}h{w}v{}h-{w}z", render.box_size))
        .collect();

    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" ",
            "width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\" ",
            "shape-rendering=\"crispEdges\">\n",
            "<rect width=\"{size}\" height=\"{size}\" fill=\"{back}\"/>\n",
            "<path fill=\"{fill}\" d=\"{path}\"/>\n",
            "</svg>\n"
        ),
        size = size,
        back = render.back.to_hex(),
        fill = render.fill.to_hex(),
        path = path,
    )
}

/// Dark runs as PDF rectangles `(x, y, width, height)`. PDF's y axis grows
/// upwards, so rows are flipped.
fn pdf_rects(grid: &ModuleGrid, render: &RenderParams) -> Vec<[f32; 4]> {
    let size = canvas_size(grid.width(), render.box_size, render.border);
    let h = render.box_size;
    run_rects(grid, render)
        .into_iter()
        .map(|(x, y, w)| [x as f32, (size - y - h) as f32, w as f32, h as f32])
        .collect()
}

pub fn pdf_document(grid: &ModuleGrid, render: &RenderParams) -> Vec<u8> {
    let size = canvas_size(grid.width(), render.box_size, render.border) as f32;
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, size, size));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources().finish();
    page.finish();

    let mut content = Content::new();
    let [r, g, b] = render.back.unit();
    content.set_fill_rgb(r, g, b);
    content.rect(0.0, 0.0, size, size);
    content.fill_nonzero();

    let rects = pdf_rects(grid, render);
    if !rects.is_empty() {
        let [r, g, b] = render.fill.unit();
        content.set_fill_rgb(r, g, b);
        for [x, y, w, h] in rects {
            content.rect(x, y, w, h);
        }
        content.fill_nonzero();
    }
    pdf.stream(content_id, &content.finish());

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Color;

    /// 3×3 grid with a dark diagonal and a full bottom row.
    fn grid() -> ModuleGrid {
        ModuleGrid::new(
            3,
            vec![true, false, false, false, true, false, true, true, true],
        )
        .unwrap()
    }

    fn render() -> RenderParams {
        RenderParams {
            box_size: 2,
            border: 1,
            ..RenderParams::default()
        }
    }

    #[test]
    fn svg_has_canvas_background_and_runs() {
        let svg = svg_document(&grid(), &render());
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("width=\"10\" height=\"10\""));
        assert!(svg.contains("<rect width=\"10\" height=\"10\" fill=\"#ffffff\"/>"));
        assert!(svg.contains("fill=\"#000000\""));
        // Top-left module sits one border module in.
        assert!(svg.contains("M2,2h2v2h-2z"));
        // Bottom row is one run of three modules.
        assert!(svg.contains("M2,6h6v2h-6z"));
        assert_eq!(svg.matches('M').count(), 3);
    }

    #[test]
    fn svg_uses_configured_colors() {
        let render = RenderParams {
            fill: Color([0, 0, 128]),
            back: Color([255, 255, 0]),
            ..render()
        };
        let svg = svg_document(&grid(), &render);
        assert!(svg.contains("fill=\"#000080\""));
        assert!(svg.contains("fill=\"#ffff00\""));
    }

    #[test]
    fn pdf_rects_flip_rows() {
        let rects = pdf_rects(&grid(), &render());
        // Canvas 10pt; top row y=2 in screen space → 10 - 2 - 2 = 6.
        assert_eq!(rects[0], [2.0, 6.0, 2.0, 2.0]);
        // Bottom row y=6 → 10 - 6 - 2 = 2, one run three modules wide.
        assert_eq!(rects[2], [2.0, 2.0, 6.0, 2.0]);
        assert_eq!(rects.len(), 3);
    }

    #[test]
    fn pdf_document_is_one_page() {
        let pdf = pdf_document(&grid(), &render());
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.starts_with("%PDF-"));
        assert!(text.contains("/MediaBox"));
        assert!(text.contains("/Count 1"));
        // Background plus three runs.
        assert_eq!(text.matches(" re").count(), 4);
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn blank_grid_draws_background_only() {
        let blank = ModuleGrid::new(2, vec![false; 4]).unwrap();
        let pdf = pdf_document(&blank, &render());
        assert_eq!(String::from_utf8_lossy(&pdf).matches(" re").count(), 1);
    }
}
