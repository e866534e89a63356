use crate::error::DocPressError;
use crate::types::{Resolution, Rgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tiny_skia::{
    GradientStop, LinearGradient, Paint, Pixmap, Point, Rect, Shader, SpreadMode, Transform,
};

/// Base-art fill for every page of a build.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundStyle {
    Solid(Rgb),
    /// Vertical linear gradient from `start` (top) to `end` (bottom).
    Gradient { start: Rgb, end: Rgb },
    /// Gradient plus a solid border frame composited at the image edges.
    GradientFrame {
        start: Rgb,
        end: Rgb,
        frame: Rgb,
        thickness: u32,
    },
    /// Supplied picture, stretched (non-uniformly if needed) to the exact
    /// target resolution.
    Picture(PathBuf),
    /// Seeded choice from the preset palette; one choice per build, or one
    /// per page when `per_page` is set.
    Random { per_page: bool },
}

pub(crate) const FRAME_THICKNESS_MAX: u32 = 50;

// Preset gradient pairs for the random style, top color then bottom color.
const RANDOM_PRESETS: [(Rgb, Rgb); 8] = [
    (Rgb { r: 10, g: 10, b: 10 }, Rgb { r: 70, g: 70, b: 70 }),
    (Rgb { r: 6, g: 17, b: 60 }, Rgb { r: 28, g: 74, b: 140 }),
    (Rgb { r: 40, g: 8, b: 8 }, Rgb { r: 120, g: 32, b: 24 }),
    (Rgb { r: 8, g: 40, b: 20 }, Rgb { r: 24, g: 110, b: 62 }),
    (Rgb { r: 44, g: 18, b: 70 }, Rgb { r: 110, g: 54, b: 160 }),
    (Rgb { r: 60, g: 42, b: 6 }, Rgb { r: 150, g: 110, b: 30 }),
    (Rgb { r: 12, g: 48, b: 56 }, Rgb { r: 36, g: 120, b: 136 }),
    (Rgb { r: 30, g: 30, b: 46 }, Rgb { r: 88, g: 88, b: 126 }),
];

/// Renders the base image for `page_index`. For every style except
/// `Random { per_page: true }` the result is identical across pages of a
/// build, so callers render it once and reuse it.
pub(crate) fn render_background(
    style: &BackgroundStyle,
    resolution: Resolution,
    seed: u64,
    page_index: usize,
) -> Result<Pixmap, DocPressError> {
    let width = resolution.width();
    let height = resolution.height();
    match style {
        BackgroundStyle::Solid(color) => solid_pixmap(width, height, *color),
        BackgroundStyle::Gradient { start, end } => gradient_pixmap(width, height, *start, *end),
        BackgroundStyle::GradientFrame {
            start,
            end,
            frame,
            thickness,
        } => {
            let mut pixmap = gradient_pixmap(width, height, *start, *end)?;
            draw_frame(&mut pixmap, *frame, *thickness);
            Ok(pixmap)
        }
        BackgroundStyle::Picture(path) => picture_pixmap(path, width, height),
        BackgroundStyle::Random { per_page } => {
            let rng_seed = if *per_page {
                seed.wrapping_add(page_index as u64)
            } else {
                seed
            };
            let mut rng = StdRng::seed_from_u64(rng_seed);
            let (start, end) = RANDOM_PRESETS[rng.gen_range(0..RANDOM_PRESETS.len())];
            gradient_pixmap(width, height, start, end)
        }
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, DocPressError> {
    Pixmap::new(width, height).ok_or_else(|| {
        DocPressError::Asset(format!("invalid raster size {}x{}", width, height))
    })
}

pub(crate) fn to_sk_color(color: Rgb) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, 255)
}

fn solid_pixmap(width: u32, height: u32, color: Rgb) -> Result<Pixmap, DocPressError> {
    let mut pixmap = new_pixmap(width, height)?;
    pixmap.fill(to_sk_color(color));
    Ok(pixmap)
}

fn gradient_pixmap(width: u32, height: u32, start: Rgb, end: Rgb) -> Result<Pixmap, DocPressError> {
    let mut pixmap = solid_pixmap(width, height, start)?;
    let shader = LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(0.0, height as f32),
        vec![
            GradientStop::new(0.0, to_sk_color(start)),
            GradientStop::new(1.0, to_sk_color(end)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    )
    .unwrap_or(Shader::SolidColor(to_sk_color(start)));
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.anti_alias = false;
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, width as f32, height as f32) {
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
    Ok(pixmap)
}

fn draw_frame(pixmap: &mut Pixmap, color: Rgb, thickness: u32) {
    let width = pixmap.width() as f32;
    let height = pixmap.height() as f32;
    let t = thickness.clamp(1, FRAME_THICKNESS_MAX) as f32;
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = false;
    let edges = [
        Rect::from_xywh(0.0, 0.0, width, t),
        Rect::from_xywh(0.0, height - t, width, t),
        Rect::from_xywh(0.0, 0.0, t, height),
        Rect::from_xywh(width - t, 0.0, t, height),
    ];
    for edge in edges.into_iter().flatten() {
        pixmap.fill_rect(edge, &paint, Transform::identity(), None);
    }
}

fn picture_pixmap(path: &Path, width: u32, height: u32) -> Result<Pixmap, DocPressError> {
    let decoded = image::open(path).map_err(|err| {
        DocPressError::Asset(format!(
            "cannot load background picture {}: {}",
            path.display(),
            err
        ))
    })?;
    let rgba = decoded.to_rgba8();
    let scaled = if rgba.dimensions() == (width, height) {
        rgba
    } else {
        image::imageops::resize(&rgba, width, height, image::imageops::FilterType::Lanczos3)
    };
    let mut pixmap = new_pixmap(width, height)?;
    let src = scaled.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Ok(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}
