#![forbid(unsafe_code)]

//! Container renderables: padding, bordered panels and horizontal rules.
//!
//! All three are wrappers that shrink the width handed to a child and
//! decorate the lines it returns. They never inspect the child beyond its
//! [`Renderable`] surface.

use nbpreview_style::Style;
use nbpreview_text::{Line, Span, TextMeasurement};

use crate::border::BorderChars;
use crate::renderable::{RenderContext, Renderable};

/// Space around a block, in cells (left/right) and rows (top/bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sides {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl Sides {
    #[must_use]
    pub const fn new(top: usize, right: usize, bottom: usize, left: usize) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Left plus right.
    #[must_use]
    pub const fn horizontal(&self) -> usize {
        self.left + self.right
    }
}

impl From<(usize, usize, usize, usize)> for Sides {
    fn from((top, right, bottom, left): (usize, usize, usize, usize)) -> Self {
        Self::new(top, right, bottom, left)
    }
}

impl From<(usize, usize)> for Sides {
    /// `(vertical, horizontal)`.
    fn from((vertical, horizontal): (usize, usize)) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }
}

// ---------------------------------------------------------------------------
// Padding
// ---------------------------------------------------------------------------

/// Pads a child renderable, painting the padding (and the child's unstyled
/// cells) with an optional style.
#[derive(Debug, Clone)]
pub struct Padding<W> {
    inner: W,
    sides: Sides,
    style: Option<Style>,
    expand: bool,
}

impl<W> Padding<W> {
    /// Wrap `inner`. Padded blocks expand to the full available width.
    pub fn new(inner: W, sides: impl Into<Sides>) -> Self {
        Self {
            inner,
            sides: sides.into(),
            style: None,
            expand: true,
        }
    }

    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Size to the child's measured width instead of the full width.
    #[must_use]
    pub fn shrink(mut self) -> Self {
        self.expand = false;
        self
    }

    pub const fn sides(&self) -> Sides {
        self.sides
    }

    pub const fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: Renderable> Renderable for Padding<W> {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let extra = self.sides.horizontal();
        let width = if self.expand {
            ctx.width
        } else {
            self.measure(ctx).maximum
        };
        let inner_width = width.saturating_sub(extra);
        let child_ctx = ctx.with_width(inner_width);

        let blank = Line::blank(width, self.style);
        let mut lines = Vec::new();
        lines.extend(std::iter::repeat_n(blank.clone(), self.sides.top));
        for mut line in self.inner.render(&child_ctx) {
            if let Some(style) = self.style {
                line.apply_base_style(style);
            }
            line.pad_to(inner_width, self.style);
            let mut padded = Line::blank(self.sides.left, self.style);
            padded.extend(line);
            padded.pad_to(width, self.style);
            lines.push(padded);
        }
        lines.extend(std::iter::repeat_n(blank, self.sides.bottom));
        lines
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let extra = self.sides.horizontal();
        if ctx.width <= extra {
            return TextMeasurement::exact(ctx.width);
        }
        self.inner
            .measure(&ctx.with_width(ctx.width - extra))
            .grow(extra)
            .clamp(None, Some(ctx.width))
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// A child surrounded by a one-cell border and one column of horizontal
/// padding on each side.
///
/// The panel always fills the width it is given; containers that want a
/// tight box size the column from [`Renderable::measure`].
#[derive(Debug, Clone)]
pub struct Panel<W> {
    child: W,
    border: BorderChars,
    border_style: Option<Style>,
}

/// Border plus padding on one side.
const PANEL_CHROME: usize = 2;

impl<W> Panel<W> {
    pub fn new(child: W) -> Self {
        Self {
            child,
            border: BorderChars::ROUNDED,
            border_style: None,
        }
    }

    #[must_use]
    pub fn border(mut self, border: BorderChars) -> Self {
        self.border = border;
        self
    }

    #[must_use]
    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = Some(style);
        self
    }

    fn edge(&self, content: String) -> Span<'static> {
        match self.border_style {
            Some(style) => Span::styled(content, style),
            None => Span::raw(content),
        }
    }
}

impl<W: Renderable> Renderable for Panel<W> {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let border = self.border.or_ascii(ctx.ascii_only);
        let width = ctx.width.max(PANEL_CHROME * 2);
        let inner_width = width - PANEL_CHROME * 2;
        let run = border.horizontal_run(width - 2);

        let mut lines = Vec::new();
        lines.push(Line::from_spans([self.edge(format!(
            "{}{run}{}",
            border.top_left, border.top_right
        ))]));

        let left = self.edge(format!("{} ", border.vertical));
        let right = self.edge(format!(" {}", border.vertical));
        for line in self.child.render(&ctx.with_width(inner_width)) {
            let mut row = Line::from_spans([left.clone()]);
            let mut content = line.truncated(inner_width, None);
            content.pad_to(inner_width, None);
            row.extend(content);
            row.push_span(right.clone());
            lines.push(row);
        }

        lines.push(Line::from_spans([self.edge(format!(
            "{}{run}{}",
            border.bottom_left, border.bottom_right
        ))]));
        lines
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let chrome = PANEL_CHROME * 2;
        self.child
            .measure(&ctx.with_width(ctx.width.saturating_sub(chrome)))
            .grow(chrome)
            .clamp(None, Some(ctx.width))
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A full-width horizontal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rule {
    style: Option<Style>,
}

impl Rule {
    #[must_use]
    pub const fn new() -> Self {
        Self { style: None }
    }

    #[must_use]
    pub const fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// The rule as a single line of `width` cells.
    #[must_use]
    pub fn line(&self, width: usize, ascii_only: bool) -> Line {
        let run = BorderChars::SQUARE.or_ascii(ascii_only).horizontal_run(width);
        match self.style {
            Some(style) => Line::styled(run, style),
            None => Line::raw(run),
        }
    }
}

impl Renderable for Rule {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        vec![self.line(ctx.width, ctx.ascii_only)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbpreview_style::Color;
    use nbpreview_text::Text;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::to_plain_text).collect()
    }

    #[test]
    fn panel_boxes_content() {
        let panel = Panel::new(Text::raw("Lorep ipsum"));
        let ctx = RenderContext::new(15);
        assert_eq!(
            plain(&panel.render(&ctx)),
            vec!["╭─────────────╮", "│ Lorep ipsum │", "╰─────────────╯"]
        );
    }

    #[test]
    fn panel_measure_adds_chrome() {
        let panel = Panel::new(Text::raw("Lorep ipsum"));
        let m = panel.measure(&RenderContext::new(80));
        assert_eq!(m.maximum, 15);
        let m = panel.measure(&RenderContext::new(10));
        assert_eq!(m.maximum, 10);
    }

    #[test]
    fn panel_ascii_border() {
        let panel = Panel::new(Text::raw("x"));
        let ctx = RenderContext::new(5).ascii_only(true);
        assert_eq!(plain(&panel.render(&ctx)), vec!["+---+", "| x |", "+---+"]);
    }

    #[test]
    fn panel_crops_wide_lines() {
        let panel = Panel::new(crate::Paragraph::new("abcdefgh").wrap(nbpreview_text::WrapMode::None));
        let ctx = RenderContext::new(7);
        assert_eq!(plain(&panel.render(&ctx))[1], "│ abc │");
    }

    #[test]
    fn padding_paints_every_cell() {
        let bg = Style::new().bg(Color::indexed(174));
        let padded = Padding::new(Text::raw("err"), (1, 1, 0, 1)).style(bg);
        let lines = padded.render(&RenderContext::new(6));
        assert_eq!(plain(&lines), vec!["      ", " err  "]);
        for line in &lines {
            assert_eq!(line.width(), 6);
            assert!(line.iter().all(|span| span.style.and_then(|s| s.bg).is_some()));
        }
    }

    #[test]
    fn padding_measure_grows_and_clamps() {
        let padded = Padding::new(Text::raw("abcd"), (0, 0, 0, 1));
        assert_eq!(padded.measure(&RenderContext::new(80)).maximum, 5);
        assert_eq!(padded.measure(&RenderContext::new(3)).maximum, 3);
    }

    #[test]
    fn shrunk_padding_fits_content() {
        let padded = Padding::new(Text::raw("ab"), (0, 1)).shrink();
        let lines = padded.render(&RenderContext::new(20));
        assert_eq!(plain(&lines), vec![" ab "]);
    }

    #[test]
    fn rule_spans_width() {
        let ctx = RenderContext::new(4);
        assert_eq!(plain(&Rule::new().render(&ctx)), vec!["────"]);
        assert_eq!(
            plain(&Rule::new().render(&ctx.ascii_only(true))),
            vec!["----"]
        );
    }
}
