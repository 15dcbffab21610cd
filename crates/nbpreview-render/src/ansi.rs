#![forbid(unsafe_code)]

//! ANSI escape sequence generation helpers.
//!
//! Pure byte-generation functions; the [`Console`](crate::Console) decides
//! when to call them.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ a;b;c m` | SGR (Select Graphic Rendition), attributes then fg then bg |
//! | CSI | `ESC [ 0 m` | SGR reset |
//! | OSC | `ESC ] 8 ; ; url ST` | Hyperlink open (OSC 8) |
//! | OSC | `ESC ] 8 ; ; ST` | Hyperlink close |

use std::io::{self, Write};

use nbpreview_style::{Color, ColorProfile, Style, StyleFlags};

/// SGR reset: `CSI 0 m`
pub const SGR_RESET: &[u8] = b"\x1b[0m";

/// SGR attribute codes for style flags.
#[derive(Debug, Clone, Copy)]
pub struct SgrCodes {
    /// Enable code
    pub on: u8,
    /// Disable code
    pub off: u8,
}

pub const SGR_BOLD: SgrCodes = SgrCodes { on: 1, off: 22 };
pub const SGR_DIM: SgrCodes = SgrCodes { on: 2, off: 22 };
pub const SGR_ITALIC: SgrCodes = SgrCodes { on: 3, off: 23 };
pub const SGR_UNDERLINE: SgrCodes = SgrCodes { on: 4, off: 24 };
pub const SGR_BLINK: SgrCodes = SgrCodes { on: 5, off: 25 };
pub const SGR_REVERSE: SgrCodes = SgrCodes { on: 7, off: 27 };
pub const SGR_HIDDEN: SgrCodes = SgrCodes { on: 8, off: 28 };
pub const SGR_STRIKETHROUGH: SgrCodes = SgrCodes { on: 9, off: 29 };

/// Flags in emission order.
pub const FLAG_TABLE: [(StyleFlags, SgrCodes); 8] = [
    (StyleFlags::BOLD, SGR_BOLD),
    (StyleFlags::DIM, SGR_DIM),
    (StyleFlags::ITALIC, SGR_ITALIC),
    (StyleFlags::UNDERLINE, SGR_UNDERLINE),
    (StyleFlags::BLINK, SGR_BLINK),
    (StyleFlags::REVERSE, SGR_REVERSE),
    (StyleFlags::HIDDEN, SGR_HIDDEN),
    (StyleFlags::STRIKETHROUGH, SGR_STRIKETHROUGH),
];

fn push_color_params(params: &mut Vec<String>, color: Color, background: bool) {
    match color {
        Color::Rgb(rgb) => {
            let lead = if background { 48 } else { 38 };
            params.push(format!("{lead};2;{};{};{}", rgb.r, rgb.g, rgb.b));
        }
        Color::Ansi256(index) => {
            let lead = if background { 48 } else { 38 };
            params.push(format!("{lead};5;{index}"));
        }
        Color::Ansi16(color) => {
            let index = color.as_u8();
            let code = match (background, index < 8) {
                (false, true) => 30 + index,
                (false, false) => 90 + index - 8,
                (true, true) => 40 + index,
                (true, false) => 100 + index - 8,
            };
            params.push(code.to_string());
        }
    }
}

/// The SGR parameter list for `style` under `profile`, or `None` when the
/// style emits nothing (empty style or monochrome output).
#[must_use]
pub fn sgr_params(style: &Style, profile: ColorProfile) -> Option<String> {
    if !profile.has_color() {
        return None;
    }
    let mut params = Vec::new();
    for (flag, codes) in FLAG_TABLE {
        if style.attrs.contains(flag) {
            params.push(codes.on.to_string());
        }
    }
    if let Some(fg) = style.fg.and_then(|c| c.downgrade(profile)) {
        push_color_params(&mut params, fg, false);
    }
    if let Some(bg) = style.bg.and_then(|c| c.downgrade(profile)) {
        push_color_params(&mut params, bg, true);
    }
    (!params.is_empty()).then(|| params.join(";"))
}

/// Write the opening SGR sequence for `style`. Returns whether anything was
/// written, so the caller knows to reset afterwards.
pub fn sgr_open<W: Write>(w: &mut W, style: &Style, profile: ColorProfile) -> io::Result<bool> {
    match sgr_params(style, profile) {
        Some(params) => {
            write!(w, "\x1b[{params}m")?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Write SGR reset sequence.
#[inline]
pub fn sgr_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SGR_RESET)
}

/// Open an OSC 8 hyperlink.
///
/// Format: `OSC 8 ; params ; uri ST` with ST = `ESC \`.
pub fn hyperlink_start<W: Write>(w: &mut W, url: &str) -> io::Result<()> {
    write!(w, "\x1b]8;;{url}\x1b\\")
}

/// Close an OSC 8 hyperlink.
pub fn hyperlink_end<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]8;;\x1b\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbpreview_style::Ansi16;

    fn open(style: Style, profile: ColorProfile) -> String {
        let mut buf = Vec::new();
        sgr_open(&mut buf, &style, profile).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn bold_only() {
        assert_eq!(open(Style::new().bold(), ColorProfile::TrueColor), "\x1b[1m");
    }

    #[test]
    fn attrs_then_fg_then_bg() {
        let style = Style::new()
            .bold()
            .fg(Color::rgb(1, 2, 3))
            .bg(Color::Ansi256(174));
        assert_eq!(
            open(style, ColorProfile::TrueColor),
            "\x1b[1;38;2;1;2;3;48;5;174m"
        );
    }

    #[test]
    fn bright_ansi16_codes() {
        let style = Style::new().fg(Color::Ansi16(Ansi16::BrightBlue));
        assert_eq!(open(style, ColorProfile::Ansi16), "\x1b[94m");
        let style = Style::new().bg(Color::Ansi16(Ansi16::Red));
        assert_eq!(open(style, ColorProfile::Ansi16), "\x1b[41m");
    }

    #[test]
    fn rgb_downgrades_to_256() {
        let style = Style::new().fg(Color::rgb(255, 255, 255));
        assert_eq!(open(style, ColorProfile::Ansi256), "\x1b[38;5;231m");
    }

    #[test]
    fn mono_writes_nothing() {
        let mut buf = Vec::new();
        let wrote = sgr_open(&mut buf, &Style::new().bold(), ColorProfile::Mono).unwrap();
        assert!(!wrote);
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_style_writes_nothing() {
        assert_eq!(sgr_params(&Style::new(), ColorProfile::TrueColor), None);
    }

    #[test]
    fn hyperlink_sequences() {
        let mut buf = Vec::new();
        hyperlink_start(&mut buf, "file:///tmp/a.html").unwrap();
        hyperlink_end(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\x1b]8;;file:///tmp/a.html\x1b\\\x1b]8;;\x1b\\"
        );
    }
}
