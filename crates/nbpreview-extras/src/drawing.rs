#![forbid(unsafe_code)]

//! Image to text drawing.
//!
//! A decoded bitmap is fitted into a cell grid and drawn with one of three
//! strategies:
//!
//! | Strategy | Glyphs | Pixels per cell | Needs |
//! |----------|--------|-----------------|-------|
//! | [`ImageDrawing::Block`] | `▀` | 1×2 | unicode, color |
//! | [`ImageDrawing::Character`] | gradient characters | 1×1 | nothing |
//! | [`ImageDrawing::Braille`] | U+2800..U+28FF | 2×4 | unicode |
//!
//! # Fitting
//!
//! Cells are roughly twice as tall as they are wide, so the pixel aspect
//! ratio is scaled by [`ASPECT_FACTOR`] before comparing it against the
//! available box. Whichever constraint binds first is the [`Bottleneck`];
//! the other dimension is derived from it.
//!
//! # Failure Modes
//!
//! | Failure | Result |
//! |---------|--------|
//! | Empty bytes | Fallback line |
//! | Undecodable bytes | Fallback line |
//! | Zero-sized fit | No lines |
//!
//! Drawing never fails from the caller's point of view: every error is
//! logged and replaced by a single line of fallback text.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::num::NonZeroUsize;
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::imageops::FilterType;
use lru::LruCache;
use nbpreview_core::ImageDrawing;
use nbpreview_render::{RenderContext, Renderable};
use nbpreview_style::{Color, Rgb, Style};
use nbpreview_text::{Line, Span, TextMeasurement};

/// Cell height divided by cell width.
pub const ASPECT_FACTOR: f64 = 2.125;

/// Default gradient for [`ImageDrawing::Character`], sparsest first.
pub const DEFAULT_CHARACTERS: &str = " :!?PG@";

/// Style of the line shown when an image cannot be drawn.
pub const FALLBACK_STYLE: Style = Style::new().fg(Color::rgb(0xBB, 0x86, 0xFC));

/// Default number of drawings kept by a [`DrawingEngine`].
pub const CACHE_CAPACITY: usize = 4096;

const BRAILLE_THRESHOLD: u8 = 128;
const BRAILLE_BASE: u32 = 0x2800;

/// `(dx, dy, bit)` for each of the eight braille dots.
const BRAILLE_DOTS: [(u32, u32, u32); 8] = [
    (0, 0, 0x01),
    (0, 1, 0x02),
    (0, 2, 0x04),
    (1, 0, 0x08),
    (1, 1, 0x10),
    (1, 2, 0x20),
    (0, 3, 0x40),
    (1, 3, 0x80),
];

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Which constraint determines the drawing size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bottleneck {
    /// Width binds; height follows the aspect ratio.
    Width,
    /// Height binds; width follows the aspect ratio.
    Height,
    /// Both constraints bind exactly.
    Neither,
    /// Unconstrained; native size.
    Both,
}

/// Aspect ratio of the image in cell units.
#[must_use]
pub fn image_ratio(pixel_width: u32, pixel_height: u32) -> f64 {
    ASPECT_FACTOR * f64::from(pixel_width) / f64::from(pixel_height.max(1))
}

#[must_use]
pub fn detect_bottleneck(
    pixel_width: u32,
    pixel_height: u32,
    max_width: Option<usize>,
    max_height: Option<usize>,
) -> Bottleneck {
    match (max_width, max_height) {
        (None, None) => Bottleneck::Both,
        (Some(_), None) => Bottleneck::Width,
        (None, Some(_)) => Bottleneck::Height,
        (Some(width), Some(height)) => {
            let image_ratio = image_ratio(pixel_width, pixel_height);
            let max_ratio = width as f64 / height as f64;
            if max_ratio < image_ratio {
                Bottleneck::Width
            } else if image_ratio < max_ratio {
                Bottleneck::Height
            } else {
                Bottleneck::Neither
            }
        }
    }
}

/// Size of a drawing in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingDimensions {
    pub bottleneck: Bottleneck,
    pub width: usize,
    pub height: usize,
}

impl DrawingDimensions {
    /// Fit an image of `pixel_width × pixel_height` into the constraints.
    ///
    /// A width bottleneck rounds the derived height; a height bottleneck
    /// truncates the derived width.
    #[must_use]
    pub fn fit(
        pixel_width: u32,
        pixel_height: u32,
        max_width: Option<usize>,
        max_height: Option<usize>,
    ) -> Self {
        let bottleneck = detect_bottleneck(pixel_width, pixel_height, max_width, max_height);
        let ratio = image_ratio(pixel_width, pixel_height);
        let (width, height) = match (bottleneck, max_width, max_height) {
            (Bottleneck::Width, Some(width), _) => (width, (width as f64 / ratio).round() as usize),
            (Bottleneck::Height, _, Some(height)) => ((height as f64 * ratio) as usize, height),
            (Bottleneck::Neither, Some(width), Some(height)) => (width, height),
            _ => (pixel_width as usize, pixel_height as usize),
        };
        Self {
            bottleneck,
            width,
            height,
        }
    }
}

/// Size request for the gradient and braille drawers.
///
/// Only the bottlenecked dimension is set; `0` means "derive from the
/// other one". Passing both would let the drawer correct the aspect ratio a
/// second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRequest {
    pub width: usize,
    pub height: usize,
}

impl CellRequest {
    #[must_use]
    pub fn for_bottleneck(
        bottleneck: Bottleneck,
        max_width: Option<usize>,
        max_height: Option<usize>,
    ) -> Self {
        let (width, height) = match bottleneck {
            Bottleneck::Width => (max_width.unwrap_or(0), 0),
            Bottleneck::Height => (0, max_height.unwrap_or(0)),
            Bottleneck::Neither | Bottleneck::Both => {
                (max_width.unwrap_or(0), max_height.unwrap_or(0))
            }
        };
        Self { width, height }
    }

    /// Fill in the unset dimension from the image's aspect ratio.
    #[must_use]
    pub fn resolve(self, pixel_width: u32, pixel_height: u32) -> (usize, usize) {
        let ratio = image_ratio(pixel_width, pixel_height);
        match (self.width, self.height) {
            (0, 0) => (pixel_width as usize, pixel_height as usize),
            (0, height) => ((height as f64 * ratio) as usize, height),
            (width, 0) => (width, (width as f64 / ratio).round() as usize),
            (width, height) => (width, height),
        }
    }
}

// ---------------------------------------------------------------------------
// Drawers
// ---------------------------------------------------------------------------

/// Errors raised while drawing. Never escape [`DrawingEngine::draw`].
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("image data is empty")]
    Empty,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

fn cells(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn draw_blocks(image: &DynamicImage, width: usize, height: usize) -> Vec<Line> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (width, height) = (cells(width), cells(height));
    let pixels = image
        .resize_exact(width, height.saturating_mul(2), FilterType::Triangle)
        .to_rgba8();
    let opaque = |x: u32, y: u32| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        (a > 0).then_some(Color::rgb(r, g, b))
    };

    (0..height)
        .map(|row| {
            let mut line = Line::new();
            for x in 0..width {
                let span = match (opaque(x, row * 2), opaque(x, row * 2 + 1)) {
                    (None, None) => Span::raw(" "),
                    (Some(top), bottom) => {
                        let style = Style::new().fg(top);
                        Span::styled("▀", bottom.map_or(style, |bg| style.bg(bg)))
                    }
                    (None, Some(bottom)) => Span::styled("▄", Style::new().fg(bottom)),
                };
                line.push_span(span);
            }
            line
        })
        .collect()
}

/// Map a luminance to a gradient glyph. With `negative_space` the last
/// (densest) glyph is the brightest pixel.
fn gradient_glyph(gradient: &[char], luminance: u8, negative_space: bool) -> char {
    let Some(last) = gradient.len().checked_sub(1) else {
        return ' ';
    };
    let level = if negative_space {
        luminance
    } else {
        u8::MAX - luminance
    };
    gradient[(usize::from(level) * last + 127) / 255]
}

fn draw_characters(
    image: &DynamicImage,
    (width, height): (usize, usize),
    gradient: &[char],
    color: bool,
    negative_space: bool,
) -> Vec<Line> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let pixels = image
        .resize_exact(cells(width), cells(height), FilterType::Triangle)
        .to_rgb8();
    pixels
        .rows()
        .map(|row| {
            let mut line = Line::new();
            for pixel in row {
                let [r, g, b] = pixel.0;
                let rgb = Rgb::new(r, g, b);
                let glyph = gradient_glyph(gradient, rgb.luminance_u8(), negative_space);
                line.push_span(if color {
                    Span::styled(glyph.to_string(), Style::new().fg(Color::Rgb(rgb)))
                } else {
                    Span::raw(glyph.to_string())
                });
            }
            line
        })
        .collect()
}

fn draw_braille(
    image: &DynamicImage,
    (width, height): (usize, usize),
    color: bool,
    negative_space: bool,
) -> Vec<Line> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (width, height) = (cells(width), cells(height));
    let pixels = image
        .resize_exact(
            width.saturating_mul(2),
            height.saturating_mul(4),
            FilterType::Triangle,
        )
        .to_rgb8();

    (0..height)
        .map(|cy| {
            let mut line = Line::new();
            for cx in 0..width {
                let mut bits = 0;
                let mut block = [Rgb::new(0, 0, 0); 8];
                for (slot, (dx, dy, bit)) in BRAILLE_DOTS.into_iter().enumerate() {
                    let [r, g, b] = pixels.get_pixel(cx * 2 + dx, cy * 4 + dy).0;
                    let rgb = Rgb::new(r, g, b);
                    if (rgb.luminance_u8() >= BRAILLE_THRESHOLD) == negative_space {
                        bits |= bit;
                    }
                    block[slot] = rgb;
                }
                let glyph = char::from_u32(BRAILLE_BASE + bits).unwrap_or(' ').to_string();
                line.push_span(if color {
                    Span::styled(glyph, Style::new().fg(Color::Rgb(Rgb::average(block))))
                } else {
                    Span::raw(glyph)
                });
            }
            line
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Requests and the engine
// ---------------------------------------------------------------------------

/// Everything that determines a drawing. Used as the cache key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DrawingRequest {
    pub image: Rc<[u8]>,
    pub strategy: ImageDrawing,
    pub max_width: Option<usize>,
    pub max_height: Option<usize>,
    pub color: bool,
    pub negative_space: bool,
    pub fallback_text: String,
    pub characters: Option<String>,
}

impl fmt::Debug for DrawingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingRequest")
            .field("image_len", &self.image.len())
            .field("strategy", &self.strategy)
            .field("max_width", &self.max_width)
            .field("max_height", &self.max_height)
            .field("color", &self.color)
            .field("negative_space", &self.negative_space)
            .field("fallback_text", &self.fallback_text)
            .field("characters", &self.characters)
            .finish()
    }
}

/// Draw without caching.
pub fn draw_image(request: &DrawingRequest) -> Result<Vec<Line>, DrawError> {
    if request.image.is_empty() {
        return Err(DrawError::Empty);
    }
    let image = image::load_from_memory(&request.image)?;
    let (pixel_width, pixel_height) = (image.width(), image.height());
    let dimensions =
        DrawingDimensions::fit(pixel_width, pixel_height, request.max_width, request.max_height);
    let cell_request =
        || CellRequest::for_bottleneck(dimensions.bottleneck, request.max_width, request.max_height);

    let lines = match request.strategy {
        ImageDrawing::Block => draw_blocks(&image, dimensions.width, dimensions.height),
        ImageDrawing::Character => {
            let gradient: Vec<char> = request
                .characters
                .as_deref()
                .filter(|characters| !characters.is_empty())
                .unwrap_or(DEFAULT_CHARACTERS)
                .chars()
                .collect();
            draw_characters(
                &image,
                cell_request().resolve(pixel_width, pixel_height),
                &gradient,
                request.color,
                request.negative_space,
            )
        }
        ImageDrawing::Braille => draw_braille(
            &image,
            cell_request().resolve(pixel_width, pixel_height),
            request.color,
            request.negative_space,
        ),
    };
    Ok(lines)
}

/// The single line shown in place of an image.
#[must_use]
pub fn fallback_line(text: &str) -> Line {
    Line::styled(text, FALLBACK_STYLE)
}

/// Memoizing drawer.
///
/// Results are keyed by the full [`DrawingRequest`] and evicted least
/// recently used first. A hit returns the stored lines unchanged.
pub struct DrawingEngine {
    cache: RefCell<LruCache<DrawingRequest, Rc<[Line]>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl DrawingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    /// If capacity is zero, defaults to 1.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Draw `request`, reusing a cached result when one exists.
    pub fn draw(&self, request: &DrawingRequest) -> Rc<[Line]> {
        if let Some(lines) = self.cache.borrow_mut().get(request) {
            self.hits.set(self.hits.get() + 1);
            tracing::trace!(strategy = %request.strategy, "drawing cache hit");
            return Rc::clone(lines);
        }
        self.misses.set(self.misses.get() + 1);
        tracing::trace!(strategy = %request.strategy, "drawing cache miss");

        let lines: Rc<[Line]> = match draw_image(request) {
            Ok(lines) => lines.into(),
            Err(error) => {
                tracing::debug!(%error, strategy = %request.strategy, "image drawing failed");
                Rc::from([fallback_line(&request.fallback_text)])
            }
        };
        self.cache
            .borrow_mut()
            .put(request.clone(), Rc::clone(&lines));
        lines
    }

    /// Number of cached drawings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.get(), self.misses.get())
    }
}

impl Default for DrawingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DrawingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingEngine")
            .field("len", &self.len())
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Renderable
// ---------------------------------------------------------------------------

/// Whether `strategy` can be used with the given terminal features.
#[must_use]
pub const fn strategy_applies(strategy: ImageDrawing, unicode: bool, color: bool) -> bool {
    match strategy {
        ImageDrawing::Block => unicode && color,
        ImageDrawing::Braille => unicode,
        ImageDrawing::Character => true,
    }
}

/// Decode base64 image data, ignoring embedded line breaks.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// An image drawn at whatever width the layout offers.
#[derive(Debug, Clone)]
pub struct Drawing {
    engine: Rc<DrawingEngine>,
    image: Rc<[u8]>,
    strategy: ImageDrawing,
    color: bool,
    negative_space: bool,
    fallback_text: String,
    characters: Option<String>,
}

impl Drawing {
    #[must_use]
    pub fn new(
        engine: Rc<DrawingEngine>,
        image: impl Into<Rc<[u8]>>,
        strategy: ImageDrawing,
        fallback_text: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            image: image.into(),
            strategy,
            color: true,
            negative_space: true,
            fallback_text: fallback_text.into(),
            characters: None,
        }
    }

    #[must_use]
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn negative_space(mut self, negative_space: bool) -> Self {
        self.negative_space = negative_space;
        self
    }

    #[must_use]
    pub fn characters(mut self, characters: Option<String>) -> Self {
        self.characters = characters;
        self
    }

    #[must_use]
    pub fn strategy(&self) -> ImageDrawing {
        self.strategy
    }

    /// The request this drawing makes under `ctx`.
    #[must_use]
    pub fn request(&self, ctx: &RenderContext) -> DrawingRequest {
        DrawingRequest {
            image: Rc::clone(&self.image),
            strategy: self.strategy,
            max_width: Some(ctx.width),
            max_height: ctx.height,
            color: self.color,
            negative_space: self.negative_space,
            fallback_text: self.fallback_text.clone(),
            characters: self.characters.clone(),
        }
    }
}

impl Renderable for Drawing {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.engine
            .draw(&self.request(ctx))
            .iter()
            .map(|line| line.truncated(ctx.width, None))
            .collect()
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let widest = self
            .engine
            .draw(&self.request(ctx))
            .iter()
            .map(Line::width)
            .max()
            .unwrap_or(0);
        TextMeasurement {
            minimum: widest.min(ctx.width),
            maximum: ctx.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};
    use proptest::prelude::*;

    use super::*;

    fn png(width: u32, height: u32, pixel: [u8; 4]) -> Rc<[u8]> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(pixel)));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner().into()
    }

    fn request(image: Rc<[u8]>, strategy: ImageDrawing, max_width: usize) -> DrawingRequest {
        DrawingRequest {
            image,
            strategy,
            max_width: Some(max_width),
            max_height: None,
            color: false,
            negative_space: true,
            fallback_text: "Image".to_string(),
            characters: None,
        }
    }

    fn plain(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::to_plain_text).collect()
    }

    #[test]
    fn width_bottleneck_rounds_height() {
        let dims = DrawingDimensions::fit(4, 4, Some(4), None);
        assert_eq!(dims.bottleneck, Bottleneck::Width);
        // 4 / 2.125 = 1.88
        assert_eq!((dims.width, dims.height), (4, 2));
    }

    #[test]
    fn height_bottleneck_truncates_width() {
        let dims = DrawingDimensions::fit(4, 4, None, Some(3));
        assert_eq!(dims.bottleneck, Bottleneck::Height);
        // 3 * 2.125 = 6.375
        assert_eq!((dims.width, dims.height), (6, 3));
    }

    #[test]
    fn both_constraints_pick_the_tighter_one() {
        assert_eq!(detect_bottleneck(100, 10, Some(20), Some(20)), Bottleneck::Width);
        assert_eq!(detect_bottleneck(10, 100, Some(20), Some(20)), Bottleneck::Height);
        assert_eq!(detect_bottleneck(8, 17, Some(1), Some(1)), Bottleneck::Neither);
        assert_eq!(
            DrawingDimensions::fit(8, 17, Some(1), Some(1)),
            DrawingDimensions {
                bottleneck: Bottleneck::Neither,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn cell_request_passes_only_the_bottleneck() {
        assert_eq!(
            CellRequest::for_bottleneck(Bottleneck::Width, Some(30), Some(10)),
            CellRequest {
                width: 30,
                height: 0
            }
        );
        assert_eq!(
            CellRequest::for_bottleneck(Bottleneck::Height, Some(30), Some(10)),
            CellRequest {
                width: 0,
                height: 10
            }
        );
        let request = CellRequest::for_bottleneck(Bottleneck::Width, Some(30), None);
        let dims = DrawingDimensions::fit(64, 48, Some(30), None);
        assert_eq!(request.resolve(64, 48), (dims.width, dims.height));
    }

    #[test]
    fn block_draws_half_blocks() {
        let engine = DrawingEngine::new();
        let image = png(4, 4, [255, 0, 0, 255]);
        let lines = engine.draw(&request(image, ImageDrawing::Block, 4));
        assert_eq!(plain(&lines), vec!["▀▀▀▀", "▀▀▀▀"]);
        let style = lines[0].spans()[0].style.expect("styled");
        assert_eq!(style.fg, Some(Color::rgb(255, 0, 0)));
        assert_eq!(style.bg, Some(Color::rgb(255, 0, 0)));
    }

    #[test]
    fn transparent_block_is_blank() {
        let engine = DrawingEngine::new();
        let lines = engine.draw(&request(png(2, 2, [0, 0, 0, 0]), ImageDrawing::Block, 2));
        assert!(lines.iter().all(|line| line.to_plain_text().trim().is_empty()));
    }

    #[test]
    fn characters_follow_negative_space() {
        let engine = DrawingEngine::new();
        let white = png(4, 4, [255, 255, 255, 255]);
        let dense = engine.draw(&request(Rc::clone(&white), ImageDrawing::Character, 4));
        assert_eq!(plain(&dense), vec!["@@@@", "@@@@"]);

        let mut positive = request(white, ImageDrawing::Character, 4);
        positive.negative_space = false;
        assert_eq!(plain(&engine.draw(&positive)), vec!["    ", "    "]);
    }

    #[test]
    fn custom_characters_and_color() {
        let engine = DrawingEngine::new();
        let mut req = request(png(4, 4, [255, 255, 255, 255]), ImageDrawing::Character, 2);
        req.characters = Some(".#".to_string());
        req.color = true;
        let lines = engine.draw(&req);
        assert_eq!(plain(&lines), vec!["##"]);
        let style = lines[0].spans()[0].style.expect("colored");
        assert_eq!(style.fg, Some(Color::rgb(255, 255, 255)));
    }

    #[test]
    fn braille_dots_invert_with_positive_space() {
        let engine = DrawingEngine::new();
        let white = png(4, 4, [255, 255, 255, 255]);
        let full = engine.draw(&request(Rc::clone(&white), ImageDrawing::Braille, 2));
        assert_eq!(plain(&full)[0], "⣿⣿");

        let mut positive = request(white, ImageDrawing::Braille, 2);
        positive.negative_space = false;
        assert_eq!(plain(&engine.draw(&positive))[0], "\u{2800}\u{2800}");
    }

    #[test]
    fn invalid_bytes_fall_back() {
        let engine = DrawingEngine::new();
        let req = request(Rc::from(&b"not-an-image"[..]), ImageDrawing::Character, 10);
        let lines = engine.draw(&req);
        assert_eq!(plain(&lines), vec!["Image"]);
        assert_eq!(lines[0].spans()[0].style, Some(FALLBACK_STYLE));
    }

    #[test]
    #[tracing_test::traced_test]
    fn empty_bytes_fall_back_and_log() {
        let engine = DrawingEngine::new();
        let lines = engine.draw(&request(Rc::from(Vec::<u8>::new()), ImageDrawing::Block, 10));
        assert_eq!(plain(&lines), vec!["Image"]);
        assert!(logs_contain("image drawing failed"));
    }

    #[test]
    fn cache_hits_reproduce_results() {
        let engine = DrawingEngine::new();
        let req = request(png(3, 5, [10, 200, 30, 255]), ImageDrawing::Character, 6);
        let first = engine.draw(&req);
        let second = engine.draw(&req.clone());
        assert_eq!(first, second);
        assert_eq!(engine.stats(), (1, 1));

        let mut colored = req.clone();
        colored.color = true;
        let _ = engine.draw(&colored);
        let mut charset = req;
        charset.characters = Some("ab".to_string());
        let _ = engine.draw(&charset);
        assert_eq!(engine.stats(), (1, 3));
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let engine = DrawingEngine::with_capacity(1);
        let a = request(png(1, 1, [0, 0, 0, 255]), ImageDrawing::Character, 1);
        let b = request(png(1, 1, [0, 0, 0, 255]), ImageDrawing::Braille, 1);
        let _ = engine.draw(&a);
        let _ = engine.draw(&b);
        let _ = engine.draw(&a);
        assert_eq!(engine.stats(), (0, 3));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn strategy_requirements() {
        assert!(strategy_applies(ImageDrawing::Block, true, true));
        assert!(!strategy_applies(ImageDrawing::Block, true, false));
        assert!(!strategy_applies(ImageDrawing::Braille, false, true));
        assert!(strategy_applies(ImageDrawing::Character, false, false));
    }

    #[test]
    fn base64_ignores_line_breaks() {
        assert_eq!(decode_base64("aGVs\nbG8=\n").as_deref(), Ok(&b"hello"[..]));
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn drawing_measures_its_widest_line() {
        let engine = Rc::new(DrawingEngine::new());
        let drawing = Drawing::new(
            Rc::clone(&engine),
            png(4, 4, [0, 0, 0, 255]),
            ImageDrawing::Character,
            "Image",
        );
        let ctx = RenderContext::new(8);
        let measurement = drawing.measure(&ctx);
        assert_eq!(measurement.minimum, 8);
        assert_eq!(measurement.maximum, 8);
        assert_eq!(drawing.render(&ctx).len(), 4);
        // measure and render share one cache entry
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn fallback_drawing_measures_its_text() {
        let drawing = Drawing::new(
            Rc::new(DrawingEngine::new()),
            Vec::<u8>::new(),
            ImageDrawing::Braille,
            "A chart",
        );
        let measurement = drawing.measure(&RenderContext::new(40));
        assert_eq!(measurement.minimum, 7);
        assert_eq!(measurement.maximum, 40);
    }

    proptest! {
        #[test]
        fn fit_never_exceeds_constraints(
            pixel_width in 1u32..2000,
            pixel_height in 1u32..2000,
            max_width in proptest::option::of(1usize..300),
            max_height in proptest::option::of(1usize..300),
        ) {
            let dims = DrawingDimensions::fit(pixel_width, pixel_height, max_width, max_height);
            if let Some(max_width) = max_width {
                prop_assert!(dims.width <= max_width);
            }
            if let Some(max_height) = max_height {
                prop_assert!(dims.height <= max_height);
            }
            if max_width.is_none() && max_height.is_none() {
                prop_assert_eq!((dims.width, dims.height), (pixel_width as usize, pixel_height as usize));
            }
        }

        #[test]
        fn single_constraints_mirror(
            pixel_width in 1u32..2000,
            pixel_height in 1u32..2000,
            limit in 1usize..300,
        ) {
            let by_width = DrawingDimensions::fit(pixel_width, pixel_height, Some(limit), None);
            let by_height = DrawingDimensions::fit(pixel_height, pixel_width, None, Some(limit));
            prop_assert_eq!(by_width.bottleneck, Bottleneck::Width);
            prop_assert_eq!(by_height.bottleneck, Bottleneck::Height);
            prop_assert_eq!(by_width.width, limit);
            prop_assert_eq!(by_height.height, limit);
        }
    }
}
