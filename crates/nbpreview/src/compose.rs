#![forbid(unsafe_code)]

//! Cell to row composition.
//!
//! Every cell becomes zero or more [`CellRow`]s: an execution indicator and
//! a content renderable. The orchestrator lays rows out in a grid; in plain
//! mode the indicator is dropped and only content is shown.
//!
//! | Cell | Rows |
//! |------|------|
//! | code | input panel, then link and main rows per output |
//! | markdown | spliced markdown, no indicator |
//! | raw | unhighlighted panel, no indicator |
//! | unknown | none |

use std::path::PathBuf;
use std::rc::Rc;

use nbpreview_core::{Cell, Output, RenderFeatureFlags};
use nbpreview_extras::drawing::{Drawing, DrawingEngine};
use nbpreview_extras::fetch::Fetch;
use nbpreview_extras::latex::latex_to_unicode;
use nbpreview_extras::link::{LinkKind, LinkOptions};
use nbpreview_extras::markdown::MarkdownRenderer;
use nbpreview_extras::splice::render_markdown;
use nbpreview_extras::syntax::{CodeBlock, Highlighter, default_lexer_name};
use nbpreview_render::{
    BorderChars, Padding, Panel, Paragraph, RenderContext, Renderable, Sides,
};
use nbpreview_style::{Color, Style};
use nbpreview_text::{Line, Text, TextMeasurement, WrapMode, decode_ansi};

use crate::resolve::{MainVariant, resolve};

/// Execution indicator color.
pub const INDICATOR_STYLE: Style = Style::new().fg(Color::indexed(247));

/// Standard error block colors.
pub const STDERR_STYLE: Style = Style::new()
    .fg(Color::indexed(237))
    .bg(Color::indexed(174));

/// Padding around standard error text (top, right, bottom, left).
const STDERR_PADDING: Sides = Sides::new(1, 1, 0, 1);

/// Left padding of output and markdown content.
const CONTENT_PADDING: Sides = Sides::new(0, 0, 0, 1);

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One grid row.
pub struct CellRow {
    /// Indicator column text; empty for markdown, raw and plain rows.
    pub indicator: Text,
    pub content: Box<dyn Renderable>,
}

impl CellRow {
    fn new(indicator: Text, content: impl Renderable + 'static) -> Self {
        Self {
            indicator,
            content: Box::new(content),
        }
    }
}

impl std::fmt::Debug for CellRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRow")
            .field("indicator", &self.indicator.to_plain_text())
            .finish_non_exhaustive()
    }
}

/// `[N]:`, or `[ ]:` for a cell that never ran.
#[must_use]
pub fn indicator_label(execution_count: Option<i64>) -> String {
    match execution_count {
        Some(count) => format!("[{count}]:"),
        None => "[ ]:".to_string(),
    }
}

/// Indicator column renderable: never wrapped, so it measures its own width.
#[derive(Debug, Clone)]
pub struct Indicator(Paragraph);

impl Indicator {
    #[must_use]
    pub fn new(text: Text) -> Self {
        Self(Paragraph::new(text).wrap(WrapMode::None))
    }
}

impl Renderable for Indicator {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.0.render(ctx)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        self.0.measure(ctx)
    }
}

/// Content that takes whatever width the grid leaves it.
#[derive(Debug, Clone)]
pub struct Fill<W>(pub W);

impl<W: Renderable> Renderable for Fill<W> {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.0.render(ctx)
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        TextMeasurement {
            minimum: ctx.width.min(1),
            maximum: ctx.width,
        }
    }
}

/// A decoded traceback. Lines are never wrapped; the widest one is the
/// minimum width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traceback {
    text: Text,
}

impl Traceback {
    /// Decode traceback entries, which carry ANSI color and may span lines.
    #[must_use]
    pub fn new(entries: &[String]) -> Self {
        Self {
            text: decode_ansi(&entries.join("\n")),
        }
    }
}

impl Renderable for Traceback {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        self.text
            .iter()
            .map(|line| line.truncated(ctx.width, None))
            .collect()
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        TextMeasurement::exact(self.text.width()).clamp(None, Some(ctx.width))
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Turns cells into rows under one set of flags.
pub struct Composer<'a> {
    flags: &'a RenderFeatureFlags,
    highlighter: &'a Highlighter,
    engine: Rc<DrawingEngine>,
    fetcher: &'a dyn Fetch,
    default_lexer: String,
    temp_dir: Option<PathBuf>,
}

impl<'a> Composer<'a> {
    /// `language` is the notebook kernel language.
    #[must_use]
    pub fn new(
        flags: &'a RenderFeatureFlags,
        highlighter: &'a Highlighter,
        engine: Rc<DrawingEngine>,
        fetcher: &'a dyn Fetch,
        language: &str,
    ) -> Self {
        Self {
            flags,
            highlighter,
            engine,
            fetcher,
            default_lexer: default_lexer_name(language).to_string(),
            temp_dir: None,
        }
    }

    /// Directory for link target files; the system temp dir when `None`.
    #[must_use]
    pub fn temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    #[must_use]
    pub fn default_lexer(&self) -> &str {
        &self.default_lexer
    }

    /// All rows of `cell`, in display order.
    #[must_use]
    pub fn cell_rows(&self, cell: &Cell) -> Vec<CellRow> {
        match cell {
            Cell::Code {
                source,
                execution_count,
                outputs,
            } => {
                let mut rows = vec![self.code_row(source, *execution_count)];
                if !self.flags.hide_output {
                    for output in outputs {
                        rows.extend(self.output_rows(output));
                    }
                }
                rows
            }
            Cell::Markdown { source } => {
                let markdown = render_markdown(source, &self.markdown_renderer());
                vec![CellRow::new(Text::new(), self.pad(markdown))]
            }
            Cell::Raw { source } => {
                vec![CellRow::new(Text::new(), self.boxed(Text::raw(source)))]
            }
            Cell::Unknown => Vec::new(),
        }
    }

    fn code_row(&self, source: &str, execution_count: Option<i64>) -> CellRow {
        let text = self.highlighter.highlight_cell(source, &self.default_lexer);
        let code = CodeBlock::new(text)
            .line_numbers(self.flags.line_numbers, self.highlighter.theme().line_number)
            .wrap(self.flags.code_wrap);
        CellRow::new(self.input_indicator(execution_count), self.boxed(code))
    }

    /// Rows for one output: the link row first, then the main row.
    #[must_use]
    pub fn output_rows(&self, output: &Output) -> Vec<CellRow> {
        let indicator = self.output_indicator(output.execution_count());
        match output {
            Output::Stream { name, text } => {
                let text = text.strip_suffix('\n').unwrap_or(text);
                if text.is_empty() {
                    return Vec::new();
                }
                let content: Box<dyn Renderable> = if name == "stderr" {
                    Box::new(Padding::new(Text::raw(text), STDERR_PADDING).style(STDERR_STYLE))
                } else {
                    Box::new(Text::raw(text))
                };
                vec![CellRow::new(indicator, self.pad(content))]
            }
            Output::Error { traceback } => {
                if traceback.is_empty() {
                    return Vec::new();
                }
                vec![CellRow::new(indicator, self.pad_tight(Traceback::new(traceback)))]
            }
            Output::DisplayData { data } | Output::ExecuteResult { data, .. } => {
                let label = output
                    .execution_count()
                    .map(|count| indicator_label(Some(count)))
                    .unwrap_or_default();
                let mut link_options = LinkOptions::from(self.flags);
                link_options.temp_dir.clone_from(&self.temp_dir);
                let resolved = resolve(data, self.flags, link_options, self.fetcher, &label);

                let mut rows = Vec::new();
                if let Some(link) = resolved.link {
                    rows.push(CellRow::new(indicator.clone(), self.pad(link.into_line())));
                }
                if let Some(main) = resolved.main {
                    rows.push(CellRow::new(indicator, self.pad(self.main_content(main))));
                }
                rows
            }
            Output::Unknown => Vec::new(),
        }
    }

    fn main_content(&self, main: MainVariant) -> Box<dyn Renderable> {
        match main {
            MainVariant::Drawing {
                image,
                strategy,
                fallback,
                ..
            } => Box::new(
                Drawing::new(Rc::clone(&self.engine), image, strategy, fallback)
                    .color(self.flags.color)
                    .negative_space(self.flags.negative_space)
                    .characters(self.flags.characters.clone()),
            ),
            MainVariant::DataFrame(table) => Box::new(table),
            MainVariant::Html(markdown) | MainVariant::Markdown(markdown) => {
                Box::new(render_markdown(&markdown, &self.markdown_renderer()))
            }
            MainVariant::Latex(latex) => Box::new(Paragraph::new(latex_to_unicode(&latex))),
            MainVariant::Json(json) => Box::new(
                CodeBlock::new(self.highlighter.highlight_or_plain(&json, "json"))
                    .wrap(self.flags.code_wrap),
            ),
            MainVariant::Pdf => {
                let icon = LinkKind::Pdf.icon(self.flags.nerd_font, self.flags.unicode);
                Box::new(Line::raw(icon.trim_end().to_string()))
            }
            MainVariant::PlainText(text) => Box::new(Text::raw(text)),
        }
    }

    fn markdown_renderer(&self) -> MarkdownRenderer<'_> {
        MarkdownRenderer::new(
            self.flags,
            self.highlighter,
            Rc::clone(&self.engine),
            self.fetcher,
        )
        .default_lexer(self.default_lexer.clone())
    }

    fn input_indicator(&self, execution_count: Option<i64>) -> Text {
        if self.flags.plain {
            return Text::new();
        }
        Text::from_lines([
            Line::new(),
            Line::styled(indicator_label(execution_count), INDICATOR_STYLE),
        ])
    }

    fn output_indicator(&self, execution_count: Option<i64>) -> Text {
        match execution_count {
            Some(count) if !self.flags.plain => {
                Text::from_line(Line::styled(indicator_label(Some(count)), INDICATOR_STYLE))
            }
            _ => Text::new(),
        }
    }

    fn boxed(&self, content: impl Renderable + 'static) -> Box<dyn Renderable> {
        if self.flags.plain {
            return Box::new(Fill(content));
        }
        let border = BorderChars::ROUNDED.or_ascii(!self.flags.unicode);
        Box::new(Fill(Panel::new(content).border(border)))
    }

    fn pad(&self, content: impl Renderable + 'static) -> Box<dyn Renderable> {
        if self.flags.plain {
            Box::new(Fill(content))
        } else {
            Box::new(Fill(Padding::new(content, CONTENT_PADDING)))
        }
    }

    /// Like [`pad`](Self::pad) but keeps the content's own width bounds.
    fn pad_tight(&self, content: impl Renderable + 'static) -> Box<dyn Renderable> {
        if self.flags.plain {
            Box::new(content)
        } else {
            Box::new(Padding::new(content, CONTENT_PADDING).shrink())
        }
    }
}
