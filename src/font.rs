use crate::error::DocPressError;
use rustybuzz::{Direction as HbDirection, Face as HbFace, UnicodeBuffer};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tiny_skia::{Path as SkPath, PathBuilder};
use ttf_parser::{GlyphId, OutlineBuilder};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, f32>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&mut self, key: &TextWidthKey) -> Option<f32> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: f32) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

/// Vertical font metrics scaled to pixels for one build. Produced once and
/// shared read-only by the word-wrap and pagination stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent_px: f32,
    pub descent_px: f32,
    pub line_gap_px: f32,
    /// Full advance from one baseline row to the next, including the
    /// configured extra line spacing.
    pub line_height_px: u32,
}

/// A parsed TrueType/OpenType font plus a measurement cache.
pub struct LoadedFont {
    name: String,
    data: Vec<u8>,
    units_per_em: f32,
    ascent: i16,
    descent: i16,
    line_gap: i16,
    width_cache: Mutex<TextWidthCache>,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GlyphPlacement {
    pub glyph_id: u16,
    pub origin_x: f32,
    pub origin_y: f32,
    pub scale: f32,
}

impl LoadedFont {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocPressError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|err| DocPressError::Asset(format!("cannot read font {}: {}", path.display(), err)))?;
        let source = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("font");
        Self::from_bytes(data, Some(source))
    }

    pub fn from_bytes(data: Vec<u8>, source_name: Option<&str>) -> Result<Self, DocPressError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(DocPressError::Asset(format!(
                "invalid font data for {source}"
            )));
        };
        let mut name = None;
        for entry in face.names() {
            if entry.name_id == ttf_parser::name::name_id::FULL_NAME {
                if let Some(value) = entry.to_string() {
                    name = Some(value);
                    break;
                }
            }
        }
        let name = name.unwrap_or_else(|| source.to_string());
        let units_per_em = face.units_per_em().max(1) as f32;
        let ascent = face.ascender();
        let descent = face.descender();
        let line_gap = face.line_gap();
        Ok(Self {
            name,
            data,
            units_per_em,
            ascent,
            descent,
            line_gap,
            width_cache: Mutex::new(TextWidthCache::new(20_000)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pixel metrics at the given size. `line_spacing_px` is additional
    /// leading inserted between rows (the original tool exposes it as a
    /// separate knob from the font's own line gap).
    pub fn metrics(&self, font_size_px: f32, line_spacing_px: u32) -> FontMetrics {
        let scale = font_size_px / self.units_per_em;
        let ascent_px = self.ascent as f32 * scale;
        let descent_px = self.descent as f32 * scale;
        let line_gap_px = self.line_gap as f32 * scale;
        let natural = (ascent_px - descent_px + line_gap_px).ceil().max(1.0);
        FontMetrics {
            ascent_px,
            descent_px,
            line_gap_px,
            line_height_px: natural as u32 + line_spacing_px,
        }
    }

    /// Shaped advance width of `text` at `font_size_px`, in pixels.
    pub fn measure_width(&self, text: &str, font_size_px: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let cache_key = TextWidthKey {
            size_milli: (font_size_px as f64 * 1000.0).round() as i64,
            text: text.to_string(),
        };
        if let Ok(mut cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(&cache_key) {
                return value;
            }
        }
        let value = self.measure_width_uncached(text, font_size_px);
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(cache_key, value);
        }
        value
    }

    fn measure_width_uncached(&self, text: &str, font_size_px: f32) -> f32 {
        let Some(face) = HbFace::from_slice(&self.data, 0) else {
            return self.measure_width_unshaped(text, font_size_px);
        };
        let mut buffer = UnicodeBuffer::new();
        buffer.set_direction(detect_direction(text));
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        let positions = output.glyph_positions();
        if positions.is_empty() && !text.is_empty() {
            return self.measure_width_unshaped(text, font_size_px);
        }
        let advance_units: i64 = positions.iter().map(|pos| pos.x_advance as i64).sum();
        advance_units as f32 / self.units_per_em * font_size_px
    }

    fn measure_width_unshaped(&self, text: &str, font_size_px: f32) -> f32 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return font_size_px * 0.6 * text.chars().count() as f32;
        };
        let mut width = 0.0f32;
        for ch in text.chars() {
            match face.glyph_index(ch) {
                Some(gid) => {
                    let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32;
                    let mut px = advance / self.units_per_em * font_size_px;
                    if px <= 0.0 {
                        px = font_size_px * 0.5;
                    }
                    width += px;
                }
                None => width += font_size_px * 0.5,
            }
        }
        width
    }

    /// Glyph placements for one visual line, baseline at
    /// (`baseline_x`, `baseline_y`) in pixel space (y grows downward).
    pub(crate) fn layout_line(
        &self,
        text: &str,
        font_size_px: f32,
        baseline_x: f32,
        baseline_y: f32,
    ) -> Vec<GlyphPlacement> {
        let Some(face) = HbFace::from_slice(&self.data, 0) else {
            return self.layout_line_unshaped(text, font_size_px, baseline_x, baseline_y);
        };
        let scale = font_size_px / self.units_per_em;
        let mut buffer = UnicodeBuffer::new();
        buffer.set_direction(detect_direction(text));
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        let infos = output.glyph_infos();
        let positions = output.glyph_positions();
        if infos.is_empty() || infos.len() != positions.len() {
            return self.layout_line_unshaped(text, font_size_px, baseline_x, baseline_y);
        }

        let mut out = Vec::with_capacity(infos.len());
        let mut pen_x = 0.0f32;
        let mut pen_y = 0.0f32;
        for (info, pos) in infos.iter().zip(positions.iter()) {
            let gid = info.glyph_id as u16;
            if gid == 0 {
                pen_x += pos.x_advance as f32 * scale;
                pen_y += pos.y_advance as f32 * scale;
                continue;
            }
            let x_off = pos.x_offset as f32 * scale;
            let y_off = pos.y_offset as f32 * scale;
            out.push(GlyphPlacement {
                glyph_id: gid,
                origin_x: baseline_x + pen_x + x_off,
                origin_y: baseline_y - pen_y - y_off,
                scale,
            });
            pen_x += pos.x_advance as f32 * scale;
            pen_y += pos.y_advance as f32 * scale;
        }
        out
    }

    fn layout_line_unshaped(
        &self,
        text: &str,
        font_size_px: f32,
        baseline_x: f32,
        baseline_y: f32,
    ) -> Vec<GlyphPlacement> {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return Vec::new();
        };
        let scale = font_size_px / self.units_per_em;
        let mut out = Vec::new();
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
            if gid == 0 {
                pen_x += font_size_px * 0.5;
                continue;
            }
            out.push(GlyphPlacement {
                glyph_id: gid,
                origin_x: baseline_x + pen_x,
                origin_y: baseline_y,
                scale,
            });
            let advance_units = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32;
            let mut adv = advance_units * scale;
            if adv <= 0.0 {
                adv = font_size_px * 0.5;
            }
            pen_x += adv;
        }
        out
    }

    /// Outline of one placed glyph as a pixel-space path, or `None` for
    /// glyphs with no outline (e.g. space).
    pub(crate) fn glyph_outline(&self, placement: &GlyphPlacement) -> Option<SkPath> {
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        let mut builder =
            GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
        face.outline_glyph(GlyphId(placement.glyph_id), &mut builder)?;
        builder.finish()
    }
}

fn detect_direction(text: &str) -> HbDirection {
    for ch in text.chars() {
        let code = ch as u32;
        let rtl = matches!(
            code,
            0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x1EE00..=0x1EEFF
        );
        if rtl {
            return HbDirection::RightToLeft;
        }
    }
    HbDirection::LeftToRight
}

// Font outlines are y-up; page pixels are y-down. The flip happens here so
// the compositor can fill the path without a device transform.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<SkPath> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_bytes_are_an_asset_error() {
        let err = LoadedFont::from_bytes(vec![0u8; 16], Some("bogus")).unwrap_err();
        assert!(matches!(err, DocPressError::Asset(_)));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn missing_font_file_is_an_asset_error() {
        let err = LoadedFont::from_file("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, DocPressError::Asset(_)));
    }

    #[test]
    fn width_cache_evicts_oldest_entries() {
        let mut cache = TextWidthCache::new(2);
        let key = |text: &str| TextWidthKey {
            size_milli: 12_000,
            text: text.to_string(),
        };
        cache.insert(key("a"), 1.0);
        cache.insert(key("b"), 2.0);
        cache.insert(key("c"), 3.0);
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")), Some(2.0));
        assert_eq!(cache.get(&key("c")), Some(3.0));
    }

    #[test]
    fn width_cache_ignores_duplicate_keys() {
        let mut cache = TextWidthCache::new(4);
        let key = TextWidthKey {
            size_milli: 12_000,
            text: "a".to_string(),
        };
        cache.insert(key.clone(), 1.0);
        cache.insert(key.clone(), 9.0);
        assert_eq!(cache.get(&key), Some(1.0));
    }

    #[test]
    fn rtl_text_is_detected() {
        assert_eq!(detect_direction("hello"), HbDirection::LeftToRight);
        assert_eq!(detect_direction("שלום"), HbDirection::RightToLeft);
    }

    #[test]
    fn system_font_measures_and_lays_out() {
        let Some(path) = test_support::find_system_font() else {
            return;
        };
        let font = LoadedFont::from_file(&path).unwrap();

        let narrow = font.measure_width("i", 16.0);
        let wide = font.measure_width("www", 16.0);
        assert!(narrow > 0.0);
        assert!(wide > narrow);
        // Cache hit returns the same value.
        assert_eq!(font.measure_width("www", 16.0), wide);

        let metrics = font.metrics(16.0, 4);
        assert!(metrics.ascent_px > 0.0);
        assert!(metrics.descent_px <= 0.0);
        assert!(metrics.line_height_px >= 5);

        let placements = font.layout_line("Hi", 16.0, 10.0, 30.0);
        assert!(!placements.is_empty());
        assert!(placements.iter().any(|p| font.glyph_outline(p).is_some()));
    }

    #[test]
    fn empty_text_measures_zero() {
        // No font needed: short-circuits before touching the face.
        let font = LoadedFont {
            name: "stub".to_string(),
            data: Vec::new(),
            units_per_em: 1000.0,
            ascent: 800,
            descent: -200,
            line_gap: 0,
            width_cache: Mutex::new(TextWidthCache::new(4)),
        };
        assert_eq!(font.measure_width("", 12.0), 0.0);
    }
}
