#![forbid(unsafe_code)]

//! Console: state-tracked ANSI emission of rendered lines.
//!
//! The console lays a [`Renderable`] out at its configured width and writes
//! the resulting lines, emitting SGR and OSC 8 sequences only when the style
//! or link changes between spans.
//!
//! # Design Principles
//!
//! - **State tracking**: the active style and link are remembered, so runs of
//!   identically styled spans cost one escape sequence
//! - **Clean line ends**: style and link are closed before every newline;
//!   a background color never bleeds into the next row
//! - **Profile aware**: colors are downgraded to the console's
//!   [`ColorProfile`]; the monochrome profile writes no SGR at all
//!
//! # Usage
//!
//! ```
//! use nbpreview_render::{Console, ConsoleOptions};
//! use nbpreview_text::Text;
//!
//! let mut console = Console::new(Vec::new(), ConsoleOptions::new(20));
//! console.print(&Text::raw("hello")).unwrap();
//! let bytes = console.into_inner().unwrap();
//! assert_eq!(bytes, b"hello\n");
//! ```

use std::io::{self, BufWriter, Write};

use nbpreview_style::{ColorProfile, Style};
use nbpreview_text::{Line, Span};

use crate::ansi;
use crate::renderable::{RenderContext, Renderable};

/// Size of the internal write buffer (64KB).
const BUFFER_CAPACITY: usize = 64 * 1024;

/// Output settings for a [`Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    /// Render width in cells.
    pub width: usize,
    /// Terminal height in rows, when known.
    pub height: Option<usize>,
    /// Color depth to downgrade to.
    pub profile: ColorProfile,
    /// Emit OSC 8 hyperlinks for linked spans.
    pub hyperlinks: bool,
    /// Restrict box drawing to ASCII.
    pub ascii_only: bool,
}

impl ConsoleOptions {
    /// Plain defaults: no color, no hyperlinks, unicode allowed.
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self {
            width,
            height: None,
            profile: ColorProfile::Mono,
            hyperlinks: false,
            ascii_only: false,
        }
    }

    #[must_use]
    pub const fn profile(mut self, profile: ColorProfile) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub const fn hyperlinks(mut self, enabled: bool) -> Self {
        self.hyperlinks = enabled;
        self
    }

    #[must_use]
    pub const fn ascii_only(mut self, ascii_only: bool) -> Self {
        self.ascii_only = ascii_only;
        self
    }

    #[must_use]
    pub const fn height(mut self, height: Option<usize>) -> Self {
        self.height = height;
        self
    }

    /// The layout context renderables are drawn under.
    #[must_use]
    pub const fn context(&self) -> RenderContext {
        RenderContext {
            width: self.width,
            height: self.height,
            ascii_only: self.ascii_only,
        }
    }
}

/// Writes renderables to an output stream.
pub struct Console<W: Write> {
    writer: BufWriter<W>,
    options: ConsoleOptions,
    /// Style currently open on the stream (None = reset).
    current_style: Option<Style>,
    /// Hyperlink currently open on the stream.
    current_link: Option<String>,
}

impl<W: Write> Console<W> {
    pub fn new(writer: W, options: ConsoleOptions) -> Self {
        Self {
            writer: BufWriter::with_capacity(BUFFER_CAPACITY, writer),
            options,
            current_style: None,
            current_link: None,
        }
    }

    #[inline]
    pub fn options(&self) -> &ConsoleOptions {
        &self.options
    }

    /// Lay out `renderable` at the console width and write it.
    pub fn print(&mut self, renderable: &dyn Renderable) -> io::Result<()> {
        let lines = renderable.render(&self.options.context());
        #[cfg(feature = "tracing")]
        tracing::trace!(line_count = lines.len(), width = self.options.width, "printing");
        self.write_lines(&lines)?;
        self.writer.flush()
    }

    /// Write already laid out lines, one per row.
    pub fn write_lines(&mut self, lines: &[Line]) -> io::Result<()> {
        for line in lines {
            for span in line.iter() {
                self.write_span(span)?;
            }
            self.close()?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(io::IntoInnerError::into_error)
    }

    fn write_span(&mut self, span: &Span<'static>) -> io::Result<()> {
        if self.options.hyperlinks {
            let link = span.link.as_deref();
            if link != self.current_link.as_deref() {
                self.close_style()?;
                if self.current_link.take().is_some() {
                    ansi::hyperlink_end(&mut self.writer)?;
                }
                if let Some(url) = link {
                    ansi::hyperlink_start(&mut self.writer, url)?;
                    self.current_link = Some(url.to_string());
                }
            }
        }

        let style = span.style.filter(|style| !style.is_empty());
        if style != self.current_style {
            self.close_style()?;
            if let Some(style) = style
                && ansi::sgr_open(&mut self.writer, &style, self.options.profile)?
            {
                self.current_style = Some(style);
            }
        }
        self.writer.write_all(span.as_str().as_bytes())
    }

    fn close_style(&mut self) -> io::Result<()> {
        if self.current_style.take().is_some() {
            ansi::sgr_reset(&mut self.writer)?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.close_style()?;
        if self.current_link.take().is_some() {
            ansi::hyperlink_end(&mut self.writer)?;
        }
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for Console<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbpreview_style::Color;
    use nbpreview_text::Text;

    fn emit(options: ConsoleOptions, renderable: &dyn Renderable) -> String {
        let mut console = Console::new(Vec::new(), options);
        console.print(renderable).unwrap();
        String::from_utf8(console.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn mono_writes_plain_text() {
        let text = Text::styled("bold", Style::new().bold());
        assert_eq!(emit(ConsoleOptions::new(10), &text), "bold\n");
    }

    #[test]
    fn styled_span_is_reset_before_newline() {
        let text = Text::styled("a\nb", Style::new().fg(Color::indexed(247)));
        let out = emit(
            ConsoleOptions::new(10).profile(ColorProfile::TrueColor),
            &text,
        );
        assert_eq!(out, "\x1b[38;5;247ma\x1b[0m\n\x1b[38;5;247mb\x1b[0m\n");
    }

    #[test]
    fn identical_styles_share_one_sequence() {
        let bold = Style::new().bold();
        let line = Line::from_spans([Span::styled("a", bold), Span::raw("-"), Span::styled("b", bold)]);
        let mut console = Console::new(
            Vec::new(),
            ConsoleOptions::new(10).profile(ColorProfile::Ansi256),
        );
        console.write_lines(&[line]).unwrap();
        let out = String::from_utf8(console.into_inner().unwrap()).unwrap();
        assert_eq!(out, "\x1b[1ma\x1b[0m-\x1b[1mb\x1b[0m\n");
    }

    #[test]
    fn hyperlinks_wrap_linked_spans() {
        let line = Line::from_spans([
            Span::raw("open").link("file:///tmp/x.html"),
            Span::raw(" now"),
        ]);
        let mut console = Console::new(Vec::new(), ConsoleOptions::new(20).hyperlinks(true));
        console.write_lines(&[line]).unwrap();
        let out = String::from_utf8(console.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "\x1b]8;;file:///tmp/x.html\x1b\\open\x1b]8;;\x1b\\ now\n"
        );
    }

    #[test]
    fn hyperlinks_disabled_drop_targets() {
        let line = Line::from_spans([Span::raw("open").link("file:///tmp/x.html")]);
        let mut console = Console::new(Vec::new(), ConsoleOptions::new(20));
        console.write_lines(&[line]).unwrap();
        assert_eq!(console.into_inner().unwrap(), b"open\n");
    }

    #[test]
    fn print_wraps_to_width() {
        let out = emit(ConsoleOptions::new(5), &Text::raw("hello world"));
        assert_eq!(out, "hello\nworld\n");
    }
}
