#![forbid(unsafe_code)]

//! Markdown rendering for markdown cells and converted HTML.
//!
//! [`MarkdownRenderer`] parses with pulldown-cmark and folds the event stream
//! into a tree of blocks. The tree is laid out lazily, so one parsed document
//! reflows to whatever width its grid column ends up with.
//!
//! # Layout
//!
//! | Element        | Rendering                                              |
//! |----------------|--------------------------------------------------------|
//! | `# h1`         | padded white-on-violet bar followed by a dim rule      |
//! | `## h2`        | blank line, `## ` prefix, teal, dim rule               |
//! | `### h3`       | blank line, `### ` prefix                              |
//! | `####`+        | prefix only                                            |
//! | fenced code    | highlighted, indented four columns                     |
//! | block quote    | dim, behind a `▌ ` bar                                 |
//! | list           | ` • ` bullets or right-aligned numbers, hanging indent |
//! | `---`          | plain full-width rule                                  |
//! | `![alt](src)`  | image link row, then the drawing when images are on    |
//! | `$x^2$`        | unicode transliteration when unicode is on             |
//!
//! Top-level blocks are separated by one blank line. Tables are not parsed
//! here; [`crate::splice`] cuts them out before markdown rendering.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use nbpreview_core::RenderFeatureFlags;
use nbpreview_render::{Padding, RenderContext, Renderable, Rule, Sides};
use nbpreview_style::{Ansi16, Color, Style};
use nbpreview_text::{Line, Span, Text, WrapMode};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::drawing::{Drawing, DrawingEngine, strategy_applies};
use crate::fetch::{Fetch, is_url};
use crate::latex::latex_to_unicode;
use crate::link::{LINK_STYLE, LinkKind, hint_message};
use crate::syntax::{CodeBlock, Highlighter};

const H1_COLOR: Color = Color::rgb(0x60, 0x02, 0xEE);
const HEADING_COLOR: Color = Color::rgb(0x03, 0xDA, 0xC5);

/// Top-level heading bar.
pub const H1_STYLE: Style = Style::new()
    .fg(Color::rgb(0xFF, 0xFF, 0xFF))
    .bg(H1_COLOR)
    .bold();

/// Every other heading level.
pub const HEADING_STYLE: Style = Style::new().fg(HEADING_COLOR).bold();

/// Inline `code` spans.
pub const INLINE_CODE_STYLE: Style = Style::new()
    .fg(Color::Ansi16(Ansi16::Cyan))
    .bg(Color::Ansi16(Ansi16::Black))
    .bold();

/// Bullets and list numbers.
pub const LIST_MARKER_STYLE: Style = Style::new().fg(Color::Ansi16(Ansi16::Yellow)).bold();

const QUOTE_STYLE: Style = Style::new().dim();

/// Columns fenced and indented code is shifted right by.
pub const CODE_INDENT: usize = 4;

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

enum Block {
    Paragraph(Text),
    Heading { level: usize, content: Line },
    Code(CodeBlock),
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Item>,
    },
    Rule,
    Image {
        link: Line,
        drawing: Option<Drawing>,
    },
}

impl Block {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        match self {
            Self::Paragraph(text) => text.wrapped(ctx.width, WrapMode::WordChar).into_lines(),
            Self::Heading { level, content } => render_heading(*level, content, ctx),
            Self::Code(code) => Padding::new(code, Sides::new(0, 0, 0, CODE_INDENT)).render(ctx),
            Self::Quote(blocks) => {
                let marker = if ctx.ascii_only { "| " } else { "▌ " };
                hang(blocks, true, ctx, &Line::styled(marker, QUOTE_STYLE), true)
                    .into_iter()
                    .map(|mut line| {
                        line.apply_base_style(QUOTE_STYLE);
                        line
                    })
                    .collect()
            }
            Self::List { start, items } => render_list(*start, items, ctx),
            Self::Rule => vec![Rule::new().line(ctx.width, ctx.ascii_only)],
            Self::Image { link, drawing } => {
                let mut lines = fit(link.clone(), ctx.width);
                if let Some(drawing) = drawing {
                    lines.push(Line::new());
                    lines.extend(drawing.render(ctx));
                }
                lines
            }
        }
    }
}

/// A list item. Tight items stack their blocks without blank lines.
struct Item {
    blocks: Vec<Block>,
    loose: bool,
}

fn render_blocks(blocks: &[Block], gap: bool, ctx: &RenderContext) -> Vec<Line> {
    let mut lines = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        if gap && index > 0 {
            lines.push(Line::new());
        }
        lines.extend(block.render(ctx));
    }
    lines
}

fn render_heading(level: usize, content: &Line, ctx: &RenderContext) -> Vec<Line> {
    let mut body = content.clone();
    let mut lines = Vec::new();
    let rule_color = if level == 1 {
        body.apply_base_style(H1_STYLE);
        let mut bar = Line::new();
        if body.width() < ctx.width {
            bar.push_span(Span::styled(" ", H1_STYLE));
        }
        bar.extend(body);
        if bar.width() < ctx.width {
            bar.push_span(Span::styled(" ", H1_STYLE));
        }
        lines.extend(fit(bar, ctx.width));
        H1_COLOR
    } else {
        if level <= 3 {
            lines.push(Line::new());
        }
        body.apply_base_style(HEADING_STYLE);
        let mut heading = Line::styled(format!("{} ", "#".repeat(level)), HEADING_STYLE);
        heading.extend(body);
        lines.extend(fit(heading, ctx.width));
        HEADING_COLOR
    };
    if level < 3 {
        let rule = Rule::new().style(Style::new().fg(rule_color).dim());
        lines.push(rule.line(ctx.width, ctx.ascii_only));
    }
    lines
}

/// The line as-is when it fits, word-wrapped otherwise.
fn fit(line: Line, width: usize) -> Vec<Line> {
    if line.width() <= width {
        vec![line]
    } else {
        line.wrap(width.max(1), WrapMode::WordChar)
    }
}

fn render_list(start: Option<u64>, items: &[Item], ctx: &RenderContext) -> Vec<Line> {
    let count = u64::try_from(items.len()).unwrap_or(u64::MAX);
    let number_width = start.map(|first| {
        let last = first.saturating_add(count.saturating_sub(1));
        last.to_string().len() + 2
    });
    let bullet = if ctx.ascii_only { " * " } else { " • " };
    let mut lines = Vec::new();
    for (offset, item) in (0u64..).zip(items) {
        let marker = match (start, number_width) {
            (Some(first), Some(width)) => {
                format!("{:>pad$} ", first.saturating_add(offset), pad = width - 1)
            }
            _ => bullet.to_string(),
        };
        let marker = Line::styled(marker, LIST_MARKER_STYLE);
        lines.extend(hang(&item.blocks, item.loose, ctx, &marker, false));
    }
    lines
}

/// Render `blocks` beside `marker`. Continuation lines are indented to the
/// marker's width, or repeat the marker when `repeat` is set.
fn hang(
    blocks: &[Block],
    gap: bool,
    ctx: &RenderContext,
    marker: &Line,
    repeat: bool,
) -> Vec<Line> {
    let indent = marker.width();
    let inner = ctx.with_width(ctx.width.saturating_sub(indent).max(1));
    let body = render_blocks(blocks, gap, &inner);
    if body.is_empty() {
        return vec![marker.truncated(ctx.width, None)];
    }
    body.into_iter()
        .enumerate()
        .map(|(index, line)| {
            let mut row = if index == 0 || repeat {
                marker.clone()
            } else {
                Line::blank(indent, None)
            };
            row.extend(line);
            row.truncated(ctx.width, None)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A parsed markdown document.
pub struct Markdown {
    blocks: Vec<Block>,
}

impl Markdown {
    /// True when the source produced nothing visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of top-level blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

impl fmt::Debug for Markdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Markdown")
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl Renderable for Markdown {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        render_blocks(&self.blocks, true, ctx)
            .into_iter()
            .map(|line| line.truncated(ctx.width, None))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Turns markdown source into a [`Markdown`] document.
pub struct MarkdownRenderer<'a> {
    flags: &'a RenderFeatureFlags,
    highlighter: &'a Highlighter,
    engine: Rc<DrawingEngine>,
    fetcher: &'a dyn Fetch,
    default_lexer: String,
}

impl<'a> MarkdownRenderer<'a> {
    #[must_use]
    pub fn new(
        flags: &'a RenderFeatureFlags,
        highlighter: &'a Highlighter,
        engine: Rc<DrawingEngine>,
        fetcher: &'a dyn Fetch,
    ) -> Self {
        Self {
            flags,
            highlighter,
            engine,
            fetcher,
            default_lexer: "python".to_string(),
        }
    }

    #[must_use]
    pub fn flags(&self) -> &RenderFeatureFlags {
        self.flags
    }

    /// Lexer for code blocks without a fence language.
    #[must_use]
    pub fn default_lexer(mut self, lexer: impl Into<String>) -> Self {
        self.default_lexer = lexer.into();
        self
    }

    #[must_use]
    pub fn render(&self, source: &str) -> Markdown {
        let mut options = Options::ENABLE_STRIKETHROUGH;
        if self.flags.unicode {
            options |= Options::ENABLE_MATH;
        }
        let mut builder = Builder::new(self);
        for event in Parser::new_ext(source, options) {
            builder.event(event);
        }
        Markdown {
            blocks: builder.finish(),
        }
    }

    fn code_block(&self, lexer: &str, source: &str) -> Block {
        let code = source.strip_suffix('\n').unwrap_or(source);
        let text = self.highlighter.highlight_or_plain(code, lexer);
        Block::Code(CodeBlock::new(text).wrap(self.flags.code_wrap))
    }

    fn image_block(&self, destination: &str, alt: &str) -> Block {
        let flags = self.flags;
        let source = self.image_source(destination);
        let target = source.target();
        let subject = if alt.is_empty() { destination } else { alt };
        let icon = LinkKind::Image.icon(flags.nerd_font, flags.unicode);
        let link = if flags.hyperlinks {
            let message = hint_message(subject, flags.hide_hyperlink_hints, &icon);
            Line::from(Span::styled(format!("{icon}{message}"), LINK_STYLE).link(target))
        } else {
            Line::raw(format!("{icon}{target}"))
        };

        let drawing = flags
            .image_drawing
            .filter(|&strategy| {
                flags.images && strategy_applies(strategy, flags.unicode, flags.color)
            })
            .map(|strategy| {
                let fallback = if alt.is_empty() {
                    destination.rsplit('/').next().unwrap_or(destination)
                } else {
                    alt
                };
                Drawing::new(Rc::clone(&self.engine), self.load_image(&source), strategy, fallback)
                    .color(flags.color)
                    .negative_space(flags.negative_space)
                    .characters(flags.characters.clone())
            });
        Block::Image { link, drawing }
    }

    /// Where an image destination points, relative to the notebook.
    fn image_source(&self, destination: &str) -> ImageSource {
        if is_url(destination) {
            return ImageSource::Url(destination.to_string());
        }
        let local = destination.strip_prefix("file://").unwrap_or(destination);
        ImageSource::Path(
            self.flags
                .relative_dir
                .join(PathBuf::from(shellexpand::tilde(local).as_ref())),
        )
    }

    /// Image bytes. Unreadable sources give no bytes.
    fn load_image(&self, source: &ImageSource) -> Vec<u8> {
        match source {
            ImageSource::Url(url) => self.fetcher.fetch_or_empty(url),
            ImageSource::Path(path) => std::fs::read(path).unwrap_or_else(|error| {
                tracing::debug!(path = %path.display(), %error, "markdown image is unreadable");
                Vec::new()
            }),
        }
    }
}

enum ImageSource {
    Url(String),
    Path(PathBuf),
}

impl ImageSource {
    fn target(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => format!("file://{}", path.display()),
        }
    }
}

impl fmt::Debug for MarkdownRenderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("default_lexer", &self.default_lexer)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Event folding
// ---------------------------------------------------------------------------

enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    Item(Item),
    List {
        start: Option<u64>,
        items: Vec<Item>,
    },
}

struct PendingImage {
    destination: String,
    alt: String,
}

struct Builder<'r, 'a> {
    renderer: &'r MarkdownRenderer<'a>,
    frames: Vec<Frame>,
    inline: Text,
    styles: Vec<Style>,
    links: Vec<String>,
    heading: Option<usize>,
    code: Option<(String, String)>,
    image: Option<PendingImage>,
}

impl<'r, 'a> Builder<'r, 'a> {
    fn new(renderer: &'r MarkdownRenderer<'a>) -> Self {
        Self {
            renderer,
            frames: vec![Frame::Root(Vec::new())],
            inline: Text::new(),
            styles: Vec::new(),
            links: Vec::new(),
            heading: None,
            code: None,
            image: None,
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        while self.frames.len() > 1 {
            self.close_frame();
        }
        match self.frames.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(image) = self.image.as_mut() {
                    image.alt.push_str(&code);
                } else {
                    self.styles.push(INLINE_CODE_STYLE);
                    self.push_text(&code);
                    self.styles.pop();
                }
            }
            Event::InlineMath(latex) => self.push_text(&latex_to_unicode(&latex)),
            Event::DisplayMath(latex) => {
                if !self.inline.is_empty() {
                    self.inline.push_line(Line::new());
                }
                self.push_multiline(&latex_to_unicode(&latex));
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.inline.push_line(Line::new()),
            Event::Rule => {
                self.flush();
                self.push_block(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush();
                if let Some(Frame::Item(item)) = self.frames.last_mut() {
                    item.loose = true;
                }
            }
            Tag::Heading { level, .. } => {
                self.flush();
                self.heading = Some(level as usize);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.frames.push(Frame::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let lexer = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string)
                        .unwrap_or_else(|| self.renderer.default_lexer.clone()),
                    CodeBlockKind::Indented => self.renderer.default_lexer.clone(),
                };
                self.code = Some((lexer, String::new()));
            }
            Tag::List(start) => {
                self.flush();
                self.frames.push(Frame::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.flush();
                self.frames.push(Frame::Item(Item {
                    blocks: Vec::new(),
                    loose: false,
                }));
            }
            Tag::Emphasis => self.styles.push(Style::new().italic()),
            Tag::Strong => self.styles.push(Style::new().bold()),
            Tag::Strikethrough => self.styles.push(Style::new().strikethrough()),
            Tag::Link { dest_url, .. } => {
                self.styles.push(LINK_STYLE);
                self.links.push(dest_url.to_string());
            }
            Tag::Image { dest_url, .. } => {
                self.flush();
                self.image = Some(PendingImage {
                    destination: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush(),
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let mut content = Line::new();
                for line in std::mem::take(&mut self.inline).into_lines() {
                    if !content.is_empty() && !line.is_empty() {
                        content.push_span(Span::raw(" "));
                    }
                    content.extend(line);
                }
                self.push_block(Block::Heading { level, content });
            }
            TagEnd::CodeBlock => {
                if let Some((lexer, source)) = self.code.take() {
                    let block = self.renderer.code_block(&lexer, &source);
                    self.push_block(block);
                }
            }
            TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item => {
                self.flush();
                self.close_frame();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.links.pop()
                    && !self.renderer.flags.hyperlinks
                {
                    self.push_text(&format!(" ({url})"));
                }
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    let block = self.renderer.image_block(&image.destination, &image.alt);
                    self.push_block(block);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, source)) = self.code.as_mut() {
            source.push_str(text);
        } else if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
        } else {
            self.push_text(text);
        }
    }

    fn current_style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::new(), |outer, inner| inner.merge(&outer))
    }

    fn push_text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let style = self.current_style();
        let mut span = if style.is_empty() {
            Span::raw(content.to_string())
        } else {
            Span::styled(content.to_string(), style)
        };
        if self.renderer.flags.hyperlinks
            && let Some(url) = self.links.last()
        {
            span = span.link(url.clone());
        }
        self.inline.push_span(span);
    }

    fn push_multiline(&mut self, content: &str) {
        for (index, piece) in content.split('\n').enumerate() {
            if index > 0 {
                self.inline.push_line(Line::new());
            }
            self.push_text(piece);
        }
    }

    /// Move pending inline text into a paragraph block.
    fn flush(&mut self) {
        if self.heading.is_some() {
            return;
        }
        let inline = std::mem::take(&mut self.inline);
        if !inline.is_empty() {
            self.push_block(Block::Paragraph(inline));
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.frames.last_mut() {
            Some(Frame::Root(blocks) | Frame::Quote(blocks)) => blocks.push(block),
            Some(Frame::Item(item)) => item.blocks.push(block),
            Some(Frame::List { items, .. }) => items.push(Item {
                blocks: vec![block],
                loose: false,
            }),
            None => {}
        }
    }

    fn close_frame(&mut self) {
        let block = match self.frames.pop() {
            Some(Frame::Quote(blocks)) => Block::Quote(blocks),
            Some(Frame::List { start, items }) => Block::List { start, items },
            Some(Frame::Item(item)) => {
                if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                    items.push(item);
                }
                return;
            }
            Some(root @ Frame::Root(_)) => {
                self.frames.push(root);
                return;
            }
            None => return,
        };
        self.push_block(block);
    }
}
