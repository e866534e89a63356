mod background;
mod compose;
mod container;
mod debug;
mod encoding;
mod error;
mod font;
mod inspect;
mod paginate;
mod segment;
mod types;
mod wrap;

pub use background::BackgroundStyle;
pub use compose::RenderedPage;
pub use container::{CONTAINER_MAGIC, CONTAINER_VERSION, MAX_PAGES, pack};
pub use encoding::{AUTO_DETECT_ORDER, EncodingSelector, TextEncoding, decode};
pub use error::DocPressError;
pub use font::{FontMetrics, LoadedFont};
pub use inspect::{ContainerReport, PageRecordInfo, extract_pages, inspect_container};
pub use paginate::{Page, page_capacity, paginate};
pub use segment::{PAGE_BREAK_TAG, Segment, split_segments};
pub use types::{Insets, Resolution, Rgb};
pub use wrap::{VisualLine, wrap_segment};

use debug::DebugLogger;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// One build's validated, immutable configuration plus the loaded font.
/// Construct through [`DocPress::builder`]; every pipeline run reads this
/// snapshot and mutates nothing.
pub struct DocPress {
    resolution: Resolution,
    font: LoadedFont,
    font_size: f32,
    font_color: Rgb,
    insets: Insets,
    line_spacing: u32,
    word_wrap: bool,
    background: BackgroundStyle,
    background_seed: u64,
    debug: Option<Arc<DebugLogger>>,
}

enum FontSource {
    None,
    File(PathBuf),
    Bytes(Vec<u8>),
}

pub struct DocPressBuilder {
    resolution: Resolution,
    font_source: FontSource,
    font_size: f32,
    font_color: Rgb,
    insets: Insets,
    line_spacing: u32,
    word_wrap: bool,
    background: BackgroundStyle,
    background_seed: u64,
    debug_path: Option<PathBuf>,
}

impl DocPress {
    pub fn builder() -> DocPressBuilder {
        DocPressBuilder::new()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn font_name(&self) -> &str {
        self.font.name()
    }

    /// Stages 1-6: decode, split on page-break tags, wrap, paginate, and
    /// composite every page onto its background. Pages come back in global
    /// order, ready for [`DocPress::pack`].
    pub fn render_document(
        &self,
        raw: &[u8],
        selector: EncodingSelector,
    ) -> Result<Vec<RenderedPage>, DocPressError> {
        let started = Instant::now();
        let (text, used_encoding) = encoding::decode(raw, selector)?;
        self.span("decode", started);
        self.count(&format!("decode.{}", used_encoding.label()), 1);

        let started = Instant::now();
        let segments = split_segments(&text);
        self.span("segment", started);
        self.count("segments", segments.len() as u64);

        // Shared metrics for wrap and pagination; geometry is validated
        // here, before any raster work.
        let metrics = self.font.metrics(self.font_size, self.line_spacing);
        let writable_width = self.resolution.width() as i64 - 2 * self.insets.x as i64;
        if writable_width <= 0 {
            return Err(DocPressError::Layout(format!(
                "horizontal inset {}px leaves no writable width on a {}px page",
                self.insets.x,
                self.resolution.width()
            )));
        }
        let capacity = page_capacity(
            self.resolution.height(),
            metrics.line_height_px,
            self.insets.y,
        )?;

        let started = Instant::now();
        let mut pages: Vec<Page> = Vec::new();
        for seg in &segments {
            let lines = wrap_segment(
                &seg.text,
                writable_width as f32,
                |text| self.font.measure_width(text, self.font_size),
                self.word_wrap,
            );
            self.count("lines", lines.len() as u64);
            pages.extend(paginate(lines, capacity));
        }
        self.span("layout", started);
        self.count("pages", pages.len() as u64);
        if pages.len() > MAX_PAGES {
            return Err(DocPressError::Pack(format!(
                "{} pages exceed the {} page format limit",
                pages.len(),
                MAX_PAGES
            )));
        }

        let started = Instant::now();
        let per_page_random = matches!(self.background, BackgroundStyle::Random { per_page: true });
        let shared_base = if per_page_random {
            None
        } else {
            Some(background::render_background(
                &self.background,
                self.resolution,
                self.background_seed,
                0,
            )?)
        };
        self.span("background", started);

        // Pages are independent; composite in parallel, then restore input
        // order so the output stays deterministic.
        let started = Instant::now();
        let mut results: Vec<(usize, Result<RenderedPage, DocPressError>)> = pages
            .par_iter()
            .enumerate()
            .map(|(idx, page)| {
                let base = match &shared_base {
                    Some(pixmap) => Ok(pixmap.clone()),
                    None => background::render_background(
                        &self.background,
                        self.resolution,
                        self.background_seed,
                        idx,
                    ),
                };
                let rendered = base.and_then(|base| {
                    compose::composite_page(
                        base,
                        idx,
                        page,
                        &self.font,
                        self.font_size,
                        self.font_color,
                        self.insets,
                        &metrics,
                    )
                });
                (idx, rendered)
            })
            .collect();
        results.sort_by_key(|(idx, _)| *idx);
        let mut rendered = Vec::with_capacity(results.len());
        for (_, result) in results {
            rendered.push(result?);
        }
        self.span("compose", started);

        Ok(rendered)
    }

    /// Stage 7: serialize rendered pages into the container byte layout.
    pub fn pack(&self, pages: &[RenderedPage]) -> Result<Vec<u8>, DocPressError> {
        let started = Instant::now();
        let bytes = container::pack(pages, self.resolution)?;
        self.span("pack", started);
        self.count("container_bytes", bytes.len() as u64);
        if let Some(debug) = &self.debug {
            debug.emit_summary("build");
            debug.flush();
        }
        Ok(bytes)
    }

    /// Full pipeline to bytes: render, then pack.
    pub fn build_container(
        &self,
        raw: &[u8],
        selector: EncodingSelector,
    ) -> Result<Vec<u8>, DocPressError> {
        let pages = self.render_document(raw, selector)?;
        self.pack(&pages)
    }

    /// End-to-end convenience: reads the source file, builds the container
    /// in memory, and writes it in a single call. Any failure before the
    /// write leaves an existing output file untouched.
    pub fn build_file(
        &self,
        input: impl AsRef<Path>,
        selector: EncodingSelector,
        output: impl AsRef<Path>,
    ) -> Result<usize, DocPressError> {
        let raw = std::fs::read(input.as_ref())?;
        let bytes = self.build_container(&raw, selector)?;
        std::fs::write(output.as_ref(), &bytes)?;
        Ok(bytes.len())
    }

    fn span(&self, stage: &str, started: Instant) {
        if let Some(debug) = &self.debug {
            debug.log_span_ms(stage, started.elapsed().as_secs_f64() * 1000.0);
        }
    }

    fn count(&self, key: &str, amount: u64) {
        if let Some(debug) = &self.debug {
            debug.increment(key, amount);
        }
    }
}

impl DocPressBuilder {
    pub fn new() -> Self {
        Self {
            resolution: Resolution::R480x272,
            font_source: FontSource::None,
            font_size: 12.0,
            font_color: Rgb::WHITE,
            insets: Insets::all(14),
            line_spacing: 4,
            word_wrap: true,
            background: BackgroundStyle::Solid(Rgb::BLACK),
            background_seed: 0,
            debug_path: None,
        }
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_source = FontSource::File(path.into());
        self
    }

    pub fn font_bytes(mut self, data: Vec<u8>) -> Self {
        self.font_source = FontSource::Bytes(data);
        self
    }

    pub fn font_size(mut self, size_px: f32) -> Self {
        self.font_size = size_px;
        self
    }

    pub fn font_color(mut self, color: Rgb) -> Self {
        self.font_color = color;
        self
    }

    pub fn insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn inset_all(mut self, value: u32) -> Self {
        self.insets = Insets::all(value);
        self
    }

    /// Extra leading between baseline rows, on top of the font's own gap.
    pub fn line_spacing(mut self, px: u32) -> Self {
        self.line_spacing = px;
        self
    }

    pub fn word_wrap(mut self, enabled: bool) -> Self {
        self.word_wrap = enabled;
        self
    }

    pub fn background(mut self, style: BackgroundStyle) -> Self {
        self.background = style;
        self
    }

    /// Seed for the random background styles; the same seed reproduces the
    /// same bytes.
    pub fn background_seed(mut self, seed: u64) -> Self {
        self.background_seed = seed;
        self
    }

    /// Enables the JSON-lines build log at the given path.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<DocPress, DocPressError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(DocPressError::InvalidConfiguration(format!(
                "font_size must be positive, got {}",
                self.font_size
            )));
        }
        if let BackgroundStyle::GradientFrame { thickness, .. } = self.background {
            if thickness == 0 || thickness > background::FRAME_THICKNESS_MAX {
                return Err(DocPressError::InvalidConfiguration(format!(
                    "frame thickness must be 1..={}, got {}",
                    background::FRAME_THICKNESS_MAX,
                    thickness
                )));
            }
        }
        let font = match self.font_source {
            FontSource::None => {
                return Err(DocPressError::InvalidConfiguration(
                    "a font is required; set font_file or font_bytes".to_string(),
                ));
            }
            FontSource::File(path) => LoadedFont::from_file(path)?,
            FontSource::Bytes(data) => LoadedFont::from_bytes(data, None)?,
        };
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        Ok(DocPress {
            resolution: self.resolution,
            font,
            font_size: self.font_size,
            font_color: self.font_color,
            insets: self.insets,
            line_spacing: self.line_spacing,
            word_wrap: self.word_wrap,
            background: self.background,
            background_seed: self.background_seed,
            debug,
        })
    }
}

impl Default for DocPressBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::find_system_font;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "docpress_{tag}_{}_{}.{ext}",
            std::process::id(),
            nanos
        ))
    }

    fn press_with(configure: impl FnOnce(DocPressBuilder) -> DocPressBuilder) -> Option<DocPress> {
        let font = find_system_font()?;
        let builder = DocPress::builder()
            .resolution(Resolution::R480x272)
            .font_file(font)
            .font_size(16.0);
        Some(configure(builder).build().unwrap())
    }

    #[test]
    fn builder_requires_a_font() {
        let err = match DocPress::builder().build() {
            Ok(_) => panic!("build should fail without a font"),
            Err(err) => err,
        };
        assert!(matches!(err, DocPressError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("font"));
    }

    #[test]
    fn builder_rejects_nonpositive_font_size() {
        let err = match DocPress::builder().font_size(0.0).build() {
            Ok(_) => panic!("zero font size should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DocPressError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("font_size"));
    }

    #[test]
    fn builder_rejects_bad_frame_thickness() {
        for thickness in [0u32, 51] {
            let err = match DocPress::builder()
                .background(BackgroundStyle::GradientFrame {
                    start: Rgb::BLACK,
                    end: Rgb::WHITE,
                    frame: Rgb::WHITE,
                    thickness,
                })
                .build()
            {
                Ok(_) => panic!("thickness {thickness} should fail"),
                Err(err) => err,
            };
            assert!(matches!(err, DocPressError::InvalidConfiguration(_)));
            assert!(err.to_string().contains("thickness"));
        }
    }

    #[test]
    fn builder_rejects_missing_font_file() {
        let err = match DocPress::builder().font_file("/nonexistent/font.ttf").build() {
            Ok(_) => panic!("missing font should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DocPressError::Asset(_)));
    }

    #[test]
    fn page_break_tag_yields_one_page_per_segment() {
        let Some(press) = press_with(|b| b.word_wrap(false)) else {
            return;
        };
        let bytes = press
            .build_container(b"Hello world@pb@Bye", EncodingSelector::Auto)
            .unwrap();
        let report = inspect_container(&bytes).unwrap();
        assert_eq!(report.page_count, 2);
        assert_eq!(report.resolution, Resolution::R480x272);

        let blobs = extract_pages(&bytes).unwrap();
        assert_ne!(blobs[0], blobs[1], "pages should render different text");
    }

    #[test]
    fn empty_input_yields_one_background_only_page() {
        let Some(press) = press_with(|b| b) else {
            return;
        };
        let pages = press.render_document(b"", EncodingSelector::Auto).unwrap();
        assert_eq!(pages.len(), 1);

        // The single page carries no glyphs: it matches a background-only
        // render byte for byte.
        let background_only = press.render_document(b"\n", EncodingSelector::Auto).unwrap();
        assert_eq!(pages[0].png, background_only[0].png);

        let bytes = press.pack(&pages).unwrap();
        assert_eq!(inspect_container(&bytes).unwrap().page_count, 1);
    }

    #[test]
    fn missing_background_picture_fails_and_leaves_output_untouched() {
        let Some(press) = press_with(|b| {
            b.background(BackgroundStyle::Picture(PathBuf::from(
                "/nonexistent/background.png",
            )))
        }) else {
            return;
        };
        let input = temp_path("input", "txt");
        let output = temp_path("output", "dat");
        std::fs::write(&input, "some manual text").unwrap();
        std::fs::write(&output, b"previous complete container").unwrap();

        let err = press
            .build_file(&input, EncodingSelector::Auto, &output)
            .unwrap_err();
        assert!(matches!(err, DocPressError::Asset(_)));
        assert_eq!(
            std::fs::read(&output).unwrap(),
            b"previous complete container"
        );

        let _ = std::fs::remove_file(input);
        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn zero_capacity_is_a_layout_error() {
        let Some(press) = press_with(|b| b.insets(Insets::new(14, 140))) else {
            return;
        };
        let err = press
            .render_document(b"any text", EncodingSelector::Auto)
            .unwrap_err();
        assert!(matches!(err, DocPressError::Layout(_)));
    }

    #[test]
    fn oversized_line_height_is_a_layout_error() {
        let Some(press) = press_with(|b| b.font_size(400.0)) else {
            return;
        };
        let err = press
            .render_document(b"any text", EncodingSelector::Auto)
            .unwrap_err();
        assert!(matches!(err, DocPressError::Layout(_)));
        assert!(err.to_string().contains("line height"));
    }

    #[test]
    fn horizontal_inset_overflow_is_a_layout_error() {
        let Some(press) = press_with(|b| b.insets(Insets::new(240, 14))) else {
            return;
        };
        let err = press
            .render_document(b"any text", EncodingSelector::Auto)
            .unwrap_err();
        assert!(matches!(err, DocPressError::Layout(_)));
        assert!(err.to_string().contains("writable width"));
    }

    #[test]
    fn full_pipeline_is_byte_idempotent() {
        let Some(press) = press_with(|b| {
            b.background(BackgroundStyle::Random { per_page: true })
                .background_seed(1234)
        }) else {
            return;
        };
        let text = "Intro page@pb@Body text that wraps across lines\nand more@pb@Outro".as_bytes();
        let first = press.build_container(text, EncodingSelector::Auto).unwrap();
        let again = press.build_container(text, EncodingSelector::Auto).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn per_build_random_renders_every_page_identically() {
        let Some(press) = press_with(|b| {
            b.background(BackgroundStyle::Random { per_page: false })
                .background_seed(7)
        }) else {
            return;
        };
        let pages = press
            .render_document(b"@pb@@pb@", EncodingSelector::Auto)
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].png, pages[1].png);
        assert_eq!(pages[1].png, pages[2].png);
    }

    #[test]
    fn pages_come_back_in_global_order() {
        let Some(press) = press_with(|b| b.word_wrap(false)) else {
            return;
        };
        let text: String = (0..40).map(|i| format!("line {i}\n")).collect();
        let pages = press
            .render_document(text.as_bytes(), EncodingSelector::Auto)
            .unwrap();
        assert!(pages.len() > 1);
        for (expected, page) in pages.iter().enumerate() {
            assert_eq!(page.index, expected);
        }
    }

    #[test]
    fn debug_log_records_stages_and_summary() {
        let Some(font) = find_system_font() else {
            return;
        };
        let log = temp_path("buildlog", "jsonl");
        let press = DocPress::builder()
            .font_file(font)
            .font_size(16.0)
            .debug_log(&log)
            .build()
            .unwrap();
        press
            .build_container(b"a@pb@b", EncodingSelector::Auto)
            .unwrap();
        let content = std::fs::read_to_string(&log).unwrap();
        for stage in ["decode", "layout", "compose", "pack"] {
            assert!(
                content.contains(&format!("\"stage\":\"{stage}\"")),
                "missing {stage} span"
            );
        }
        assert!(content.contains("\"segments\":2"));
        assert!(content.contains("build.summary"));
        let _ = std::fs::remove_file(log);
    }

    #[test]
    fn legacy_encoded_input_renders_like_its_utf8_twin() {
        let Some(press) = press_with(|b| b) else {
            return;
        };
        // "café" in windows-1252 and in utf-8 must produce identical pages.
        let legacy = press
            .render_document(
                &[0x63, 0x61, 0x66, 0xE9],
                EncodingSelector::Declared(TextEncoding::Windows1252),
            )
            .unwrap();
        let utf8 = press
            .render_document("café".as_bytes(), EncodingSelector::Auto)
            .unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].png, utf8[0].png);
    }
}
