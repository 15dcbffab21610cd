#![forbid(unsafe_code)]

//! Markdown extension splicing.
//!
//! The markdown renderer knows nothing about tables or display math. This
//! module finds top-level tables (always) and paragraphs made only of
//! `$$ ... $$` math (when unicode is on), and cuts the source at their line
//! boundaries. Every source line lands in exactly one [`Segment`]; the text
//! between special regions is handed to the markdown renderer verbatim.
//!
//! ```
//! use nbpreview_extras::splice::{SegmentKind, splice};
//!
//! let segments = splice("intro\n\n| a |\n|---|\n| 1 |\n", false);
//! assert_eq!(segments.len(), 2);
//! assert!(matches!(segments[1].kind, SegmentKind::Table(_)));
//! assert_eq!(segments[1].lines, 2..5);
//! ```

use std::fmt;
use std::ops::Range;

use nbpreview_render::{Column, Justify, Paragraph, RenderContext, Renderable, Row, Table};
use nbpreview_style::Style;
use nbpreview_text::{Line, Span, Text};
use pulldown_cmark::{Alignment, Event, Options, Parser, Tag, TagEnd};

use crate::latex::latex_to_unicode;
use crate::markdown::{INLINE_CODE_STYLE, MarkdownRenderer};

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// A parsed markdown table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkdownTable {
    alignments: Vec<Justify>,
    header: Vec<Line>,
    rows: Vec<Vec<Line>>,
}

impl MarkdownTable {
    #[must_use]
    pub fn header(&self) -> &[Line] {
        &self.header
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Line>] {
        &self.rows
    }

    /// Lay out as a [`Table`]: bold header closing a section, one column
    /// per alignment. A header-only table gets one blank body row.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        for &justify in &self.alignments {
            table.add_column(Column::new().justify(justify));
        }
        let header = self.header.iter().cloned().map(Text::from_line);
        table.add_row(Row::new(header).end_section(true));
        for row in &self.rows {
            table.add_row(Row::new(row.iter().cloned().map(Text::from_line)));
        }
        if self.rows.is_empty() {
            table.add_row(Row::new([Text::new()]));
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Plain markdown, verbatim from the source.
    Markdown(String),
    Table(MarkdownTable),
    /// The LaTeX inside a display-math paragraph.
    Math(String),
}

/// A run of source lines and what renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Zero-based, end-exclusive source line range.
    pub lines: Range<usize>,
}

/// Cut `markup` into segments covering every line exactly once, in order.
#[must_use]
pub fn splice(markup: &str, unicode: bool) -> Vec<Segment> {
    let lines: Vec<&str> = markup.split_inclusive('\n').collect();
    let mut segments = Vec::new();
    let mut cursor = 0;
    for (kind, range) in special_regions(markup, unicode) {
        let start = range.start.clamp(cursor, lines.len());
        let end = range.end.clamp(start, lines.len());
        if start > cursor {
            segments.push(Segment {
                kind: SegmentKind::Markdown(lines[cursor..start].concat()),
                lines: cursor..start,
            });
        }
        segments.push(Segment {
            kind,
            lines: start..end,
        });
        cursor = end;
    }
    if cursor < lines.len() {
        segments.push(Segment {
            kind: SegmentKind::Markdown(lines[cursor..].concat()),
            lines: cursor..lines.len(),
        });
    }
    segments
}

/// Source lines touched by the byte range `span`.
fn line_range(markup: &str, span: Range<usize>) -> Range<usize> {
    let start = markup[..span.start].matches('\n').count();
    let body = markup[span].trim_end_matches(['\n', '\r']);
    start..start + body.matches('\n').count() + 1
}

fn special_regions(markup: &str, unicode: bool) -> Vec<(SegmentKind, Range<usize>)> {
    let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    if unicode {
        options |= Options::ENABLE_MATH;
    }
    let mut regions = Vec::new();
    let mut depth = 0usize;
    let mut table: Option<(TableBuilder, Range<usize>)> = None;
    let mut math: Option<(MathProbe, Range<usize>)> = None;

    for (event, span) in Parser::new_ext(markup, options).into_offset_iter() {
        if let Some((builder, _)) = table.as_mut() {
            if matches!(event, Event::End(TagEnd::Table)) {
                if let Some((builder, span)) = table.take() {
                    regions.push((SegmentKind::Table(builder.finish()), line_range(markup, span)));
                }
            } else {
                builder.event(event, unicode);
            }
            continue;
        }
        if let Some((probe, _)) = math.as_mut() {
            if matches!(event, Event::End(TagEnd::Paragraph)) {
                if let Some((probe, span)) = math.take()
                    && let Some(latex) = probe.finish()
                {
                    regions.push((SegmentKind::Math(latex), line_range(markup, span)));
                }
            } else {
                probe.event(&event);
            }
            continue;
        }
        match event {
            Event::Start(Tag::Table(alignments)) if depth == 0 => {
                table = Some((TableBuilder::new(&alignments), span));
            }
            Event::Start(Tag::Paragraph) if depth == 0 && unicode => {
                math = Some((MathProbe::default(), span));
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    regions
}

/// Watches a paragraph for display math and nothing else.
#[derive(Default)]
struct MathProbe {
    latex: Vec<String>,
    other: bool,
}

impl MathProbe {
    fn event(&mut self, event: &Event<'_>) {
        match event {
            Event::DisplayMath(latex) => self.latex.push(latex.to_string()),
            Event::SoftBreak | Event::HardBreak => {}
            Event::Text(text) if text.trim().is_empty() => {}
            _ => self.other = true,
        }
    }

    fn finish(self) -> Option<String> {
        (!self.other && !self.latex.is_empty()).then(|| self.latex.join("\n"))
    }
}

struct TableBuilder {
    table: MarkdownTable,
    in_head: bool,
    row: Vec<Line>,
    cell: Line,
    styles: Vec<Style>,
}

impl TableBuilder {
    fn new(alignments: &[Alignment]) -> Self {
        let alignments = alignments
            .iter()
            .map(|alignment| match alignment {
                Alignment::Center => Justify::Center,
                Alignment::Right => Justify::Right,
                Alignment::Left | Alignment::None => Justify::Left,
            })
            .collect();
        Self {
            table: MarkdownTable {
                alignments,
                ..MarkdownTable::default()
            },
            in_head: false,
            row: Vec::new(),
            cell: Line::new(),
            styles: Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>, unicode: bool) {
        match event {
            Event::Start(Tag::TableHead) => self.in_head = true,
            Event::End(TagEnd::TableHead) => {
                self.in_head = false;
                self.table.header = std::mem::take(&mut self.row);
            }
            Event::Start(Tag::TableRow) => self.row.clear(),
            Event::End(TagEnd::TableRow) => {
                let row = std::mem::take(&mut self.row);
                self.table.rows.push(row);
            }
            Event::Start(Tag::TableCell) => self.cell = Line::new(),
            Event::End(TagEnd::TableCell) => {
                let cell = std::mem::take(&mut self.cell);
                self.row.push(cell);
            }
            Event::Start(Tag::Emphasis) => self.styles.push(Style::new().italic()),
            Event::Start(Tag::Strong) => self.styles.push(Style::new().bold()),
            Event::Start(Tag::Strikethrough) => self.styles.push(Style::new().strikethrough()),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {
                self.styles.pop();
            }
            Event::Text(text) => self.push(&text, None),
            Event::Code(code) => self.push(&code, Some(INLINE_CODE_STYLE)),
            Event::InlineMath(latex) | Event::DisplayMath(latex) if unicode => {
                self.push(&latex_to_unicode(&latex), None);
            }
            Event::SoftBreak | Event::HardBreak => self.push(" ", None),
            _ => {}
        }
    }

    fn push(&mut self, content: &str, extra: Option<Style>) {
        let mut style = self
            .styles
            .iter()
            .chain(extra.as_ref())
            .fold(Style::new(), |outer, inner| inner.merge(&outer));
        if self.in_head && !content.trim().is_empty() {
            style = style.bold();
        }
        let span = if style.is_empty() {
            Span::raw(content.to_string())
        } else {
            Span::styled(content.to_string(), style)
        };
        self.cell.push_span(span);
    }

    fn finish(mut self) -> MarkdownTable {
        if !self.row.is_empty() {
            let row = std::mem::take(&mut self.row);
            self.table.rows.push(row);
        }
        self.table
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Spliced markdown: segments drawn top to bottom with one blank line
/// between non-empty ones.
pub struct SplicedMarkdown {
    parts: Vec<Box<dyn Renderable>>,
}

impl SplicedMarkdown {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Debug for SplicedMarkdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplicedMarkdown")
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl Renderable for SplicedMarkdown {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let mut lines = Vec::new();
        for part in &self.parts {
            let rendered = part.render(ctx);
            if rendered.is_empty() {
                continue;
            }
            if !lines.is_empty() {
                lines.push(Line::new());
            }
            lines.extend(rendered);
        }
        lines
    }
}

/// Splice `markup` and render every segment.
#[must_use]
pub fn render_markdown(markup: &str, renderer: &MarkdownRenderer<'_>) -> SplicedMarkdown {
    let unicode = renderer.flags().unicode;
    let mut parts: Vec<Box<dyn Renderable>> = Vec::new();
    for segment in splice(markup, unicode) {
        match segment.kind {
            SegmentKind::Markdown(source) => {
                let markdown = renderer.render(&source);
                if !markdown.is_empty() {
                    parts.push(Box::new(markdown));
                }
            }
            SegmentKind::Table(table) => parts.push(Box::new(table.to_table())),
            SegmentKind::Math(latex) => {
                let text = Text::raw(latex_to_unicode(&latex));
                parts.push(Box::new(Paragraph::new(text)));
            }
        }
    }
    tracing::trace!(parts = parts.len(), "spliced markdown");
    SplicedMarkdown { parts }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use nbpreview_core::RenderFeatureFlags;
    use nbpreview_style::StyleFlags;
    use proptest::prelude::*;

    use super::*;
    use crate::drawing::DrawingEngine;
    use crate::fetch::OfflineFetcher;
    use crate::syntax::Highlighter;

    const DOCUMENT: &str = "intro\n\n| a | b |\n|---|--:|\n| 1 | 22 |\n\n$$x^2$$\n\noutro";

    fn kinds(segments: &[Segment]) -> Vec<(&'static str, Range<usize>)> {
        segments
            .iter()
            .map(|segment| {
                let kind = match segment.kind {
                    SegmentKind::Markdown(_) => "markdown",
                    SegmentKind::Table(_) => "table",
                    SegmentKind::Math(_) => "math",
                };
                (kind, segment.lines.clone())
            })
            .collect()
    }

    fn rendered(markup: &str, unicode: bool, width: usize) -> Vec<String> {
        let mut flags = RenderFeatureFlags::plain_text(width);
        flags.unicode = unicode;
        flags.images = false;
        let highlighter = Highlighter::new(flags.theme);
        let renderer = MarkdownRenderer::new(
            &flags,
            &highlighter,
            Rc::new(DrawingEngine::new()),
            &OfflineFetcher,
        );
        let ctx = RenderContext::new(width).ascii_only(!unicode);
        render_markdown(markup, &renderer)
            .render(&ctx)
            .iter()
            .map(|line| line.to_plain_text().trim_end().to_string())
            .collect()
    }

    #[test]
    fn tables_and_math_become_regions() {
        let segments = splice(DOCUMENT, true);
        assert_eq!(
            kinds(&segments),
            vec![
                ("markdown", 0..2),
                ("table", 2..5),
                ("markdown", 5..6),
                ("math", 6..7),
                ("markdown", 7..9),
            ]
        );
        assert_eq!(segments[0].kind, SegmentKind::Markdown("intro\n\n".to_string()));
        assert_eq!(segments[3].kind, SegmentKind::Math("x^2".to_string()));
    }

    #[test]
    fn math_stays_markdown_without_unicode() {
        let segments = splice(DOCUMENT, false);
        assert_eq!(
            kinds(&segments),
            vec![("markdown", 0..2), ("table", 2..5), ("markdown", 5..9)]
        );
    }

    #[test]
    fn inline_display_math_is_not_a_region() {
        let segments = splice("see $$x$$ here", true);
        assert_eq!(kinds(&segments), vec![("markdown", 0..1)]);
    }

    #[test]
    fn nested_tables_are_left_alone() {
        let segments = splice("> | a |\n> |---|\n> | 1 |\n", true);
        assert_eq!(kinds(&segments), vec![("markdown", 0..3)]);
    }

    #[test]
    fn empty_markup_has_no_segments() {
        assert!(splice("", true).is_empty());
    }

    #[test]
    fn table_cells_are_parsed() {
        let segments = splice(DOCUMENT, false);
        let SegmentKind::Table(table) = &segments[1].kind else {
            panic!("expected a table segment");
        };
        let header: Vec<_> = table.header().iter().map(Line::to_plain_text).collect();
        assert_eq!(header, vec!["a", "b"]);
        let style = table.header()[0].spans()[0].style.expect("bold header");
        assert!(style.has_attr(StyleFlags::BOLD));
        let rows: Vec<Vec<_>> = table
            .rows()
            .iter()
            .map(|row| row.iter().map(Line::to_plain_text).collect())
            .collect();
        assert_eq!(rows, vec![vec!["1", "22"]]);
    }

    #[test]
    fn renders_segments_with_gaps() {
        assert_eq!(
            rendered(DOCUMENT, true, 30),
            vec![
                "intro",
                "",
                " a    b",
                "────────",
                " 1   22",
                "",
                "x²",
                "",
                "outro",
            ]
        );
    }

    #[test]
    fn header_only_tables_keep_a_body_row() {
        assert_eq!(rendered("| a |\n|---|", true, 20), vec![" a", "───", ""]);
    }

    proptest! {
        #[test]
        fn segments_cover_every_line_once(
            picks in prop::collection::vec(0usize..10, 0..24),
            unicode in any::<bool>(),
        ) {
            const PIECES: [&str; 10] = [
                "text", "", "| a | b |", "|---|---|", "| 1 | 2 |",
                "$$x$$", "- item", "> quote", "```", "# heading",
            ];
            let markup = picks.iter().map(|&pick| PIECES[pick]).collect::<Vec<_>>().join("\n");
            let total = markup.split_inclusive('\n').count();
            let segments = splice(&markup, unicode);
            let mut cursor = 0;
            for segment in &segments {
                prop_assert_eq!(segment.lines.start, cursor);
                prop_assert!(segment.lines.end >= segment.lines.start);
                cursor = segment.lines.end;
            }
            prop_assert_eq!(cursor, total);
        }
    }
}
