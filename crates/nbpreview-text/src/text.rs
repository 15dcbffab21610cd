#![forbid(unsafe_code)]

//! Styled text collections.
//!
//! A [`Span`] is a run of text with an optional [`Style`] and an optional
//! OSC 8 hyperlink target. A [`Line`] is a row of spans and a [`Text`] is a
//! block of lines.
//!
//! ```
//! use nbpreview_text::{Line, Span, Text};
//! use nbpreview_style::Style;
//!
//! let text = Text::from_lines([
//!     Line::raw("plain"),
//!     Line::from_spans([Span::raw("a "), Span::styled("bold", Style::new().bold())]),
//! ]);
//! assert_eq!(text.height(), 2);
//! assert_eq!(text.width(), 6);
//! ```

use crate::TextMeasurement;
use crate::wrap::{WrapMode, grapheme_width, graphemes, truncate_to_width};
use nbpreview_style::Style;
use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

/// A styled span of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span<'a> {
    /// The text content.
    pub content: Cow<'a, str>,
    /// Optional style for this span.
    pub style: Option<Style>,
    /// Optional hyperlink URL (OSC 8).
    pub link: Option<Cow<'a, str>>,
}

impl<'a> Span<'a> {
    /// Create an unstyled span.
    #[inline]
    #[must_use]
    pub fn raw(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            content: content.into(),
            style: None,
            link: None,
        }
    }

    /// Create a styled span.
    #[inline]
    #[must_use]
    pub fn styled(content: impl Into<Cow<'a, str>>, style: Style) -> Self {
        Self {
            content: content.into(),
            style: Some(style),
            link: None,
        }
    }

    /// Set the hyperlink URL for this span.
    #[inline]
    #[must_use]
    pub fn link(mut self, link: impl Into<Cow<'a, str>>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Get the text content.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Get the display width in cells.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        crate::display_width(&self.content)
    }

    /// Split the span at a cell position.
    ///
    /// Returns `(left, right)` where the split respects grapheme boundaries.
    #[must_use]
    fn split_at_cell(&self, cell_pos: usize) -> (Self, Self) {
        if self.content.is_empty() || cell_pos == 0 {
            return (self.with_content(String::new()), self.clone());
        }

        if cell_pos >= self.width() {
            return (self.clone(), self.with_content(String::new()));
        }

        let (byte_pos, _) = find_cell_boundary(&self.content, cell_pos);
        let (left, right) = self.content.split_at(byte_pos);
        (
            self.with_content(left.to_string()),
            self.with_content(right.to_string()),
        )
    }

    /// A span carrying this span's style and link with different content.
    #[must_use]
    fn with_content(&self, content: String) -> Self {
        Self {
            content: Cow::Owned(content),
            style: self.style,
            link: self.link.clone(),
        }
    }

    /// Check if the span is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Convert to an owned span.
    #[must_use]
    pub fn into_owned(self) -> Span<'static> {
        Span {
            content: Cow::Owned(self.content.into_owned()),
            style: self.style,
            link: self.link.map(|l| Cow::Owned(l.into_owned())),
        }
    }
}

impl<'a> From<&'a str> for Span<'a> {
    fn from(s: &'a str) -> Self {
        Self::raw(s)
    }
}

impl From<String> for Span<'static> {
    fn from(s: String) -> Self {
        Self::raw(s)
    }
}

impl Default for Span<'_> {
    fn default() -> Self {
        Self::raw("")
    }
}

/// A single line of styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Line {
    spans: Vec<Span<'static>>,
}

impl Line {
    /// Create an empty line.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Create a line from spans.
    #[must_use]
    pub fn from_spans<'a>(spans: impl IntoIterator<Item = Span<'a>>) -> Self {
        Self {
            spans: spans.into_iter().map(Span::into_owned).collect(),
        }
    }

    /// Create a line from a single raw string.
    #[inline]
    #[must_use]
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::raw(content.into())],
        }
    }

    /// Create a line from a single styled string.
    #[inline]
    #[must_use]
    pub fn styled(content: impl Into<String>, style: Style) -> Self {
        Self {
            spans: vec![Span::styled(content.into(), style)],
        }
    }

    /// A line of `width` spaces, optionally styled.
    #[must_use]
    pub fn blank(width: usize, style: Option<Style>) -> Self {
        if width == 0 {
            return Self::new();
        }
        Self {
            spans: vec![Span {
                content: Cow::Owned(" ".repeat(width)),
                style,
                link: None,
            }],
        }
    }

    /// Check if the line is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(Span::is_empty)
    }

    /// Get the display width in cells.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.spans.iter().map(Span::width).sum()
    }

    /// Return bounds-based measurement for this line.
    #[must_use]
    pub fn measurement(&self) -> TextMeasurement {
        let longest_word = self
            .to_plain_text()
            .split_whitespace()
            .map(crate::display_width)
            .max()
            .unwrap_or(0);
        TextMeasurement {
            minimum: longest_word,
            maximum: self.width(),
        }
    }

    /// Get the spans.
    #[inline]
    #[must_use]
    pub fn spans(&self) -> &[Span<'static>] {
        &self.spans
    }

    /// Add a span to the line.
    #[inline]
    pub fn push_span<'a>(&mut self, span: Span<'a>) {
        push_span_merged(self, span.into_owned());
    }

    /// Append every span of another line.
    pub fn extend(&mut self, other: Line) {
        for span in other.spans {
            push_span_merged(self, span);
        }
    }

    /// Apply a base style to all spans.
    ///
    /// The base style is merged with each span's style, with the span's
    /// style taking precedence for conflicting properties.
    pub fn apply_base_style(&mut self, base: Style) {
        for span in &mut self.spans {
            span.style = Some(match span.style {
                Some(existing) => existing.merge(&base),
                None => base,
            });
        }
    }

    /// Get the plain text content.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        self.spans.iter().map(Span::as_str).collect()
    }

    /// Wrap this line to the given width, preserving span styles.
    #[must_use]
    pub fn wrap(&self, width: usize, mode: WrapMode) -> Vec<Line> {
        if mode == WrapMode::None || width == 0 {
            return vec![self.clone()];
        }

        if self.is_empty() {
            return vec![Line::new()];
        }

        match mode {
            WrapMode::None => vec![self.clone()],
            WrapMode::Char => wrap_line_chars(self, width),
            WrapMode::Word => wrap_line_words(self, width, false),
            WrapMode::WordChar => wrap_line_words(self, width, true),
        }
    }

    /// Cut the line to at most `max_width` cells, ending in `ellipsis`
    /// when something was removed and the ellipsis fits.
    #[must_use]
    pub fn truncated(&self, max_width: usize, ellipsis: Option<&str>) -> Line {
        let line_width = self.width();
        if line_width <= max_width {
            return self.clone();
        }
        let ellipsis_width = ellipsis.map(crate::display_width).unwrap_or(0);
        let (content_width, ellipsis) = match ellipsis {
            Some(e) if max_width > ellipsis_width => (max_width - ellipsis_width, Some(e)),
            _ => (max_width, None),
        };

        let mut remaining = content_width;
        let mut out = Line::new();
        let mut last_style = None;
        for span in &self.spans {
            if remaining == 0 {
                break;
            }
            let span_width = span.width();
            last_style = span.style;
            if span_width <= remaining {
                out.spans.push(span.clone());
                remaining -= span_width;
            } else {
                let cut = truncate_to_width(&span.content, remaining);
                if !cut.is_empty() {
                    out.spans.push(span.with_content(cut));
                }
                remaining = 0;
            }
        }
        if let Some(e) = ellipsis {
            push_span_merged(
                &mut out,
                Span {
                    content: Cow::Owned(e.to_string()),
                    style: last_style,
                    link: None,
                },
            );
        }
        out
    }

    /// Pad with styled spaces on the right up to `width` cells.
    pub fn pad_to(&mut self, width: usize, style: Option<Style>) {
        let current = self.width();
        if current < width {
            push_span_merged(
                self,
                Span {
                    content: Cow::Owned(" ".repeat(width - current)),
                    style,
                    link: None,
                },
            );
        }
    }

    /// Iterate over spans.
    pub fn iter(&self) -> impl Iterator<Item = &Span<'static>> {
        self.spans.iter()
    }
}

impl<'a> From<Span<'a>> for Line {
    fn from(span: Span<'a>) -> Self {
        Self {
            spans: vec![span.into_owned()],
        }
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Self::raw(s)
    }
}

impl From<String> for Line {
    fn from(s: String) -> Self {
        Self::raw(s)
    }
}

impl IntoIterator for Line {
    type Item = Span<'static>;
    type IntoIter = std::vec::IntoIter<Span<'static>>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.into_iter()
    }
}

impl<'a> IntoIterator for &'a Line {
    type Item = &'a Span<'static>;
    type IntoIter = std::slice::Iter<'a, Span<'static>>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}

/// A block of styled lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Text {
    lines: Vec<Line>,
}

impl Text {
    /// Create an empty text.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Create text from a raw string (may contain newlines).
    #[must_use]
    pub fn raw(content: impl AsRef<str>) -> Self {
        let content = content.as_ref();
        if content.is_empty() {
            return Self::new();
        }
        Self {
            lines: content.split('\n').map(Line::raw).collect(),
        }
    }

    /// Create styled text from a string (may contain newlines).
    #[must_use]
    pub fn styled(content: impl AsRef<str>, style: Style) -> Self {
        let content = content.as_ref();
        if content.is_empty() {
            return Self::new();
        }
        Self {
            lines: content
                .split('\n')
                .map(|s| Line::styled(s, style))
                .collect(),
        }
    }

    /// Create text from a single line.
    #[inline]
    #[must_use]
    pub fn from_line(line: Line) -> Self {
        Self { lines: vec![line] }
    }

    /// Create text from multiple lines.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = Line>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
        }
    }

    /// Check if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Line::is_empty)
    }

    /// Get the number of lines.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Get the maximum width across all lines.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.lines.iter().map(Line::width).max().unwrap_or(0)
    }

    /// Minimum is the widest unbreakable word, maximum the widest line.
    #[must_use]
    pub fn measurement(&self) -> TextMeasurement {
        self.lines
            .iter()
            .map(Line::measurement)
            .fold(TextMeasurement::ZERO, TextMeasurement::union)
    }

    /// Get the lines.
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Consume into the underlying lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }

    /// Add a line.
    #[inline]
    pub fn push_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Add a span to the last line (or create new line if empty).
    pub fn push_span<'a>(&mut self, span: Span<'a>) {
        if self.lines.is_empty() {
            self.lines.push(Line::new());
        }
        if let Some(last) = self.lines.last_mut() {
            last.push_span(span);
        }
    }

    /// Append all lines of another text.
    pub fn append(&mut self, other: Text) {
        self.lines.extend(other.lines);
    }

    /// Apply a base style to all lines and spans.
    ///
    /// The base style is merged with each span's style, with the span's
    /// style taking precedence for conflicting properties.
    pub fn apply_base_style(&mut self, base: Style) {
        for line in &mut self.lines {
            line.apply_base_style(base);
        }
    }

    /// Get the plain text content (lines joined with newlines).
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::to_plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate over lines.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Wrap every line to `width` cells.
    #[must_use]
    pub fn wrapped(&self, width: usize, mode: WrapMode) -> Text {
        Text {
            lines: self
                .lines
                .iter()
                .flat_map(|line| line.wrap(width, mode))
                .collect(),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::raw(s)
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self::raw(s)
    }
}

impl From<Line> for Text {
    fn from(line: Line) -> Self {
        Self::from_line(line)
    }
}

impl FromIterator<Line> for Text {
    fn from_iter<I: IntoIterator<Item = Line>>(iter: I) -> Self {
        Self::from_lines(iter)
    }
}

// ---------------------------------------------------------------------------
// Wrap Helpers (style-preserving)
// ---------------------------------------------------------------------------

fn find_cell_boundary(text: &str, target_cells: usize) -> (usize, usize) {
    let mut current_cells = 0;
    let mut byte_pos = 0;

    for grapheme in graphemes(text) {
        let width = grapheme_width(grapheme);
        if current_cells + width > target_cells {
            break;
        }
        current_cells += width;
        byte_pos += grapheme.len();
        if current_cells >= target_cells {
            break;
        }
    }

    (byte_pos, current_cells)
}

fn span_is_whitespace(span: &Span<'static>) -> bool {
    span.as_str().chars().all(char::is_whitespace)
}

fn trim_span_start(span: Span<'static>) -> Span<'static> {
    let trimmed = span.as_str().trim_start().to_string();
    span.with_content(trimmed)
}

fn trim_line_trailing(mut line: Line) -> Line {
    while let Some(last) = line.spans.last_mut() {
        let trimmed = last.as_str().trim_end();
        if trimmed.is_empty() {
            line.spans.pop();
            continue;
        }
        if trimmed.len() != last.content.len() {
            last.content = Cow::Owned(trimmed.to_string());
        }
        break;
    }
    line
}

fn push_span_merged(line: &mut Line, span: Span<'static>) {
    if span.is_empty() {
        return;
    }

    if let Some(last) = line.spans.last_mut()
        && last.style == span.style
        && last.link == span.link
    {
        let mut merged = String::with_capacity(last.as_str().len() + span.as_str().len());
        merged.push_str(last.as_str());
        merged.push_str(span.as_str());
        last.content = Cow::Owned(merged);
        return;
    }

    line.spans.push(span);
}

fn split_span_words(span: &Span<'static>) -> Vec<Span<'static>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_whitespace = false;

    for grapheme in span.as_str().graphemes(true) {
        let is_ws = grapheme.chars().all(char::is_whitespace);
        if is_ws != in_whitespace && !current.is_empty() {
            segments.push(span.with_content(std::mem::take(&mut current)));
        }
        current.push_str(grapheme);
        in_whitespace = is_ws;
    }

    if !current.is_empty() {
        segments.push(span.with_content(current));
    }

    segments
}

/// Split a span that is wider than the line into chunks, forcing progress
/// when a single grapheme is wider than `available`.
fn split_forced(remaining: &Span<'static>, available: usize) -> (Span<'static>, Span<'static>) {
    let (left, right) = remaining.split_at_cell(available);
    if left.is_empty() && !remaining.is_empty() {
        let first_w = remaining
            .as_str()
            .graphemes(true)
            .next()
            .map(grapheme_width)
            .unwrap_or(1);
        return remaining.split_at_cell(first_w.max(1));
    }
    (left, right)
}

fn wrap_line_chars(line: &Line, width: usize) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::new();
    let mut current_width = 0;

    for span in line.spans.iter().cloned() {
        let mut remaining = span;
        while !remaining.is_empty() {
            if current_width >= width && !current.is_empty() {
                lines.push(trim_line_trailing(current));
                current = Line::new();
                current_width = 0;
            }

            let available = width.saturating_sub(current_width).max(1);
            if remaining.width() <= available {
                current_width += remaining.width();
                push_span_merged(&mut current, remaining);
                break;
            }

            let (left, right) = if current.is_empty() {
                split_forced(&remaining, available)
            } else {
                remaining.split_at_cell(available)
            };
            push_span_merged(&mut current, left);
            lines.push(trim_line_trailing(current));
            current = Line::new();
            current_width = 0;
            remaining = right;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(trim_line_trailing(current));
    }

    lines
}

fn wrap_line_words(line: &Line, width: usize, char_fallback: bool) -> Vec<Line> {
    let pieces: Vec<Span<'static>> = line.spans.iter().flat_map(split_span_words).collect();

    let mut lines = Vec::new();
    let mut current = Line::new();
    let mut current_width = 0;
    let mut first_line = true;

    for piece in pieces {
        let piece_width = piece.width();
        let is_ws = span_is_whitespace(&piece);

        if current_width + piece_width <= width {
            if current_width == 0 && !first_line && is_ws {
                continue;
            }
            current_width += piece_width;
            push_span_merged(&mut current, piece);
            continue;
        }

        if !current.is_empty() {
            lines.push(trim_line_trailing(current));
            current = Line::new();
            current_width = 0;
            first_line = false;
        }

        if is_ws {
            continue;
        }

        if piece_width > width && char_fallback {
            let mut remaining = piece;
            while !remaining.is_empty() {
                let available = width.saturating_sub(current_width).max(1);
                if remaining.width() <= available {
                    current_width += remaining.width();
                    push_span_merged(&mut current, remaining);
                    break;
                }
                let (left, right) = split_forced(&remaining, available);
                push_span_merged(&mut current, left);
                lines.push(trim_line_trailing(current));
                current = Line::new();
                current_width = 0;
                first_line = false;
                remaining = right;
            }
            continue;
        }

        let trimmed = if first_line {
            piece
        } else {
            trim_span_start(piece)
        };
        current_width += trimmed.width();
        push_span_merged(&mut current, trimmed);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(trim_line_trailing(current));
    }

    lines
}
