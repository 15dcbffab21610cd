//! The `Renderable` trait and the basic text renderables.

use nbpreview_style::Style;
use nbpreview_text::{Line, Text, TextMeasurement, WrapMode};

/// Constraints a renderable is drawn under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    /// Available width in cells.
    pub width: usize,
    /// Available height in rows, when known.
    pub height: Option<usize>,
    /// Restrict glyphs to ASCII (no box drawing, no bullets).
    pub ascii_only: bool,
}

impl RenderContext {
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self {
            width,
            height: None,
            ascii_only: false,
        }
    }

    /// The same context narrowed (or widened) to `width`.
    #[must_use]
    pub const fn with_width(self, width: usize) -> Self {
        Self { width, ..self }
    }

    #[must_use]
    pub const fn with_height(self, height: Option<usize>) -> Self {
        Self { height, ..self }
    }

    #[must_use]
    pub const fn ascii_only(self, ascii_only: bool) -> Self {
        Self { ascii_only, ..self }
    }
}

/// Anything that can be laid out into styled lines.
///
/// Implementations must return lines no wider than `ctx.width`. Lines may be
/// narrower; containers pad them to the space they allocated.
pub trait Renderable {
    /// Lay out into lines.
    fn render(&self, ctx: &RenderContext) -> Vec<Line>;

    /// Width bounds for layout negotiation. Defaults to taking all
    /// available width.
    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        TextMeasurement::exact(ctx.width)
    }
}

impl<T: Renderable + ?Sized> Renderable for Box<T> {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        (**self).render(ctx)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        (**self).measure(ctx)
    }
}

impl<T: Renderable + ?Sized> Renderable for &T {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        (**self).render(ctx)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        (**self).measure(ctx)
    }
}

impl<T: Renderable + ?Sized> Renderable for std::rc::Rc<T> {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        (**self).render(ctx)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        (**self).measure(ctx)
    }
}

/// Horizontal alignment within an allocated width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// Pad `line` to exactly `width` cells according to `justify`. Lines wider
/// than `width` are returned unchanged.
#[must_use]
pub fn align_line(line: Line, width: usize, justify: Justify, fill: Option<Style>) -> Line {
    let current = line.width();
    if current >= width {
        return line;
    }
    let slack = width - current;
    let left = match justify {
        Justify::Left => 0,
        Justify::Right => slack,
        Justify::Center => slack / 2,
    };
    let mut out = Line::blank(left, fill);
    out.extend(line);
    out.pad_to(width, fill);
    out
}

/// Text with a wrapping and alignment policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    text: Text,
    wrap: WrapMode,
    justify: Justify,
    ellipsis: bool,
}

impl Paragraph {
    #[must_use]
    pub fn new(text: impl Into<Text>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn wrap(mut self, mode: WrapMode) -> Self {
        self.wrap = mode;
        self
    }

    #[must_use]
    pub fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    /// Do not wrap; cut over-wide lines and mark the cut with `…`.
    #[must_use]
    pub fn ellipsis(mut self) -> Self {
        self.wrap = WrapMode::None;
        self.ellipsis = true;
        self
    }

    #[must_use]
    pub fn text(&self) -> &Text {
        &self.text
    }
}

impl Renderable for Paragraph {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let lines: Vec<Line> = if self.wrap == WrapMode::None {
            let ellipsis = self.ellipsis.then_some("…");
            self.text
                .iter()
                .map(|line| line.truncated(ctx.width, ellipsis))
                .collect()
        } else {
            self.text.wrapped(ctx.width, self.wrap).into_lines()
        };
        match self.justify {
            Justify::Left => lines,
            justify => lines
                .into_iter()
                .map(|line| align_line(line, ctx.width, justify, None))
                .collect(),
        }
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let measurement = if self.wrap == WrapMode::None {
            TextMeasurement::exact(self.text.width())
        } else {
            self.text.measurement()
        };
        measurement.clamp(None, Some(ctx.width))
    }
}

impl Renderable for Text {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.wrapped(ctx.width, WrapMode::WordChar).into_lines()
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        self.measurement().clamp(None, Some(ctx.width))
    }
}

impl Renderable for Line {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.wrap(ctx.width, WrapMode::WordChar)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        self.measurement().clamp(None, Some(ctx.width))
    }
}

/// Renderables drawn one after another, top to bottom.
#[derive(Default)]
pub struct Stack {
    items: Vec<Box<dyn Renderable>>,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Renderable + 'static) {
        self.items.push(Box::new(item));
    }

    pub fn push_boxed(&mut self, item: Box<dyn Renderable>) {
        self.items.push(item);
    }

    #[must_use]
    pub fn with(mut self, item: impl Renderable + 'static) -> Self {
        self.push(item);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("items", &self.items.len())
            .finish()
    }
}

impl Renderable for Stack {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.items.iter().flat_map(|item| item.render(ctx)).collect()
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        self.items
            .iter()
            .map(|item| item.measure(ctx))
            .fold(TextMeasurement::ZERO, TextMeasurement::union)
    }
}
