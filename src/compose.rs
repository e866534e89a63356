use crate::background::to_sk_color;
use crate::error::DocPressError;
use crate::font::{FontMetrics, LoadedFont};
use crate::paginate::Page;
use crate::types::{Insets, Rgb};
use tiny_skia::{FillRule, Paint, Pixmap, Transform};

/// A page bound to its fully composited raster, PNG-encoded at the build's
/// resolution. Owned by the container packer during serialization.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Draws the page's lines onto `base` and PNG-encodes the result. Line `i`
/// sits at `inset_y + i * line_height` with its baseline dropped by the
/// font ascent. Overflowing lines are drawn as-is; the canvas bounds do the
/// truncating.
pub(crate) fn composite_page(
    mut base: Pixmap,
    index: usize,
    page: &Page,
    font: &LoadedFont,
    font_size_px: f32,
    color: Rgb,
    insets: Insets,
    metrics: &FontMetrics,
) -> Result<RenderedPage, DocPressError> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;

    for (line_index, line) in page.lines.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let top = insets.y as f32 + line_index as f32 * metrics.line_height_px as f32;
        let baseline = top + metrics.ascent_px;
        for placement in font.layout_line(&line.text, font_size_px, insets.x as f32, baseline) {
            if let Some(path) = font.glyph_outline(&placement) {
                base.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }

    let width = base.width();
    let height = base.height();
    let png = base
        .encode_png()
        .map_err(|err| DocPressError::Pack(format!("png encode failed: {err}")))?;
    Ok(RenderedPage {
        index,
        width,
        height,
        png,
    })
}
