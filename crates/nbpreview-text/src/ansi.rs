//! Decoding of ANSI-colored strings into styled [`Text`].
//!
//! Tracebacks and terminal output captured in notebooks carry SGR escape
//! sequences. The decoder feeds the input through a `vte` parser, tracks the
//! active style, and emits one [`Line`] per `\n`.
//!
//! # Failure Modes
//!
//! | Input | Behavior |
//! |-------|----------|
//! | Unknown CSI (cursor motion, erase) | Ignored |
//! | Malformed SGR parameter list | Remaining parameters ignored |
//! | OSC 8 hyperlink | Target attached to the enclosed spans |
//! | Invalid UTF-8 | Replacement character |

use crate::text::{Line, Span, Text};
use nbpreview_style::{Ansi16, Color, Style, StyleFlags};
use vte::{Params, Parser, Perform};

/// A single SGR attribute change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SgrChange {
    Reset,
    Set(StyleFlags),
    Clear(StyleFlags),
    Fg(Option<Color>),
    Bg(Option<Color>),
}

/// Walks an SGR parameter list, consuming extended color arguments.
struct SgrIterator<'a> {
    params: &'a [i64],
    index: usize,
}

impl<'a> SgrIterator<'a> {
    fn new(params: &'a [i64]) -> Self {
        Self { params, index: 0 }
    }

    fn next_param(&mut self) -> Option<i64> {
        let value = self.params.get(self.index).copied();
        self.index += 1;
        value
    }

    /// `5;N` or `2;R;G;B` following a 38/48 introducer.
    fn extended_color(&mut self) -> Option<Color> {
        match self.next_param()? {
            5 => Some(Color::indexed(self.next_param()?.clamp(0, 255) as u8)),
            2 => {
                let r = self.next_param()?.clamp(0, 255) as u8;
                let g = self.next_param()?.clamp(0, 255) as u8;
                let b = self.next_param()?.clamp(0, 255) as u8;
                Some(Color::rgb(r, g, b))
            }
            _ => None,
        }
    }
}

fn ansi(index: i64) -> Option<Color> {
    Ansi16::from_u8(index as u8).map(Color::Ansi16)
}

impl Iterator for SgrIterator<'_> {
    type Item = SgrChange;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let param = self.next_param()?;
            let change = match param {
                0 => SgrChange::Reset,
                1 => SgrChange::Set(StyleFlags::BOLD),
                2 => SgrChange::Set(StyleFlags::DIM),
                3 => SgrChange::Set(StyleFlags::ITALIC),
                4 => SgrChange::Set(StyleFlags::UNDERLINE),
                5 | 6 => SgrChange::Set(StyleFlags::BLINK),
                7 => SgrChange::Set(StyleFlags::REVERSE),
                8 => SgrChange::Set(StyleFlags::HIDDEN),
                9 => SgrChange::Set(StyleFlags::STRIKETHROUGH),
                22 => SgrChange::Clear(StyleFlags::BOLD | StyleFlags::DIM),
                23 => SgrChange::Clear(StyleFlags::ITALIC),
                24 => SgrChange::Clear(StyleFlags::UNDERLINE),
                25 => SgrChange::Clear(StyleFlags::BLINK),
                27 => SgrChange::Clear(StyleFlags::REVERSE),
                28 => SgrChange::Clear(StyleFlags::HIDDEN),
                29 => SgrChange::Clear(StyleFlags::STRIKETHROUGH),
                30..=37 => SgrChange::Fg(ansi(param - 30)),
                38 => match self.extended_color() {
                    Some(color) => SgrChange::Fg(Some(color)),
                    None => return None,
                },
                39 => SgrChange::Fg(None),
                40..=47 => SgrChange::Bg(ansi(param - 40)),
                48 => match self.extended_color() {
                    Some(color) => SgrChange::Bg(Some(color)),
                    None => return None,
                },
                49 => SgrChange::Bg(None),
                90..=97 => SgrChange::Fg(ansi(param - 90 + 8)),
                100..=107 => SgrChange::Bg(ansi(param - 100 + 8)),
                _ => continue,
            };
            return Some(change);
        }
    }
}

/// Stateful ANSI-to-[`Text`] decoder.
///
/// ```
/// use nbpreview_text::AnsiDecoder;
///
/// let text = AnsiDecoder::new().decode("\x1b[1;31mError\x1b[0m: boom");
/// assert_eq!(text.to_plain_text(), "Error: boom");
/// ```
#[derive(Debug, Default)]
pub struct AnsiDecoder {
    style: Style,
    link: Option<String>,
    current: Line,
    pending: String,
    lines: Vec<Line>,
}

impl AnsiDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a whole string. The decoder is reset first, so one decoder
    /// can be reused across inputs.
    #[must_use]
    pub fn decode(&mut self, input: &str) -> Text {
        *self = Self::default();
        let mut parser = Parser::new();
        parser.advance(self, input.as_bytes());
        self.flush_pending();
        let last = std::mem::take(&mut self.current);
        self.lines.push(last);
        Text::from_lines(std::mem::take(&mut self.lines))
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.pending);
        let mut span = if self.style.is_empty() {
            Span::raw(content)
        } else {
            Span::styled(content, self.style)
        };
        if let Some(link) = &self.link {
            span = span.link(link.clone());
        }
        self.current.push_span(span);
    }

    fn apply_sgr(&mut self, params: &[i64]) {
        self.flush_pending();
        if params.is_empty() {
            self.style = Style::new();
            return;
        }
        for change in SgrIterator::new(params) {
            match change {
                SgrChange::Reset => self.style = Style::new(),
                SgrChange::Set(flags) => self.style.attrs |= flags,
                SgrChange::Clear(flags) => self.style.attrs &= !flags,
                SgrChange::Fg(color) => self.style.fg = color,
                SgrChange::Bg(color) => self.style.bg = color,
            }
        }
    }
}

impl Perform for AnsiDecoder {
    fn print(&mut self, c: char) {
        self.pending.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.flush_pending();
                let line = std::mem::take(&mut self.current);
                self.lines.push(line);
            }
            b'\t' => self.pending.push_str("    "),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, c: char) {
        if c != 'm' || !intermediates.is_empty() {
            return;
        }
        let params: Vec<i64> = params
            .iter()
            .map(|subparams| subparams.first().copied().map(i64::from).unwrap_or(0))
            .collect();
        self.apply_sgr(&params);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        // OSC 8 ; params ; uri
        if params.first() != Some(&&b"8"[..]) {
            return;
        }
        self.flush_pending();
        let uri = params
            .get(2)
            .map(|uri| String::from_utf8_lossy(uri).into_owned())
            .unwrap_or_default();
        self.link = (!uri.is_empty()).then_some(uri);
    }
}

/// Decode ANSI escapes in `input` into styled text.
#[must_use]
pub fn decode_ansi(input: &str) -> Text {
    AnsiDecoder::new().decode(input)
}

/// Remove every escape sequence, keeping only printable text.
#[must_use]
pub fn strip_ansi(input: &str) -> String {
    decode_ansi(input).to_plain_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = decode_ansi("hello\nworld");
        assert_eq!(text.height(), 2);
        assert_eq!(text.to_plain_text(), "hello\nworld");
    }

    #[test]
    fn sgr_bold_red_then_reset() {
        let text = decode_ansi("\x1b[1;31mError\x1b[0m: boom");
        let spans = text.lines()[0].spans();
        assert_eq!(spans[0].as_str(), "Error");
        let style = spans[0].style.unwrap();
        assert!(style.has_attr(StyleFlags::BOLD));
        assert_eq!(style.fg, Some(Color::Ansi16(Ansi16::Red)));
        assert_eq!(spans[1].as_str(), ": boom");
        assert_eq!(spans[1].style, None);
    }

    #[test]
    fn extended_colors() {
        let text = decode_ansi("\x1b[38;5;208ma\x1b[48;2;1;2;3mb");
        let spans = text.lines()[0].spans();
        assert_eq!(spans[0].style.unwrap().fg, Some(Color::Ansi256(208)));
        assert_eq!(spans[1].style.unwrap().bg, Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn bright_colors_map_to_upper_palette() {
        let text = decode_ansi("\x1b[94mlink");
        assert_eq!(
            text.lines()[0].spans()[0].style.unwrap().fg,
            Some(Color::Ansi16(Ansi16::BrightBlue))
        );
    }

    #[test]
    fn style_survives_newlines() {
        let text = decode_ansi("\x1b[32mone\ntwo\x1b[0m");
        assert_eq!(text.height(), 2);
        assert!(text.lines()[1].spans()[0].style.is_some());
    }

    #[test]
    fn cursor_sequences_are_ignored() {
        assert_eq!(strip_ansi("a\x1b[2Kb\x1b[1Ac"), "abc");
    }

    #[test]
    fn osc8_hyperlink_attaches_target() {
        let text = decode_ansi("\x1b]8;;https://example.com\x1b\\site\x1b]8;;\x1b\\ after");
        let spans = text.lines()[0].spans();
        assert_eq!(spans[0].as_str(), "site");
        assert_eq!(spans[0].link.as_deref(), Some("https://example.com"));
        assert_eq!(spans[1].link, None);
    }

    #[test]
    fn decoder_is_reusable() {
        let mut decoder = AnsiDecoder::new();
        let _ = decoder.decode("\x1b[1mbold");
        let second = decoder.decode("plain");
        assert_eq!(second.lines()[0].spans()[0].style, None);
    }
}
