//! Text style: optional foreground/background plus attribute flags.

use crate::color::Color;

bitflags::bitflags! {
    /// Text attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        /// Bold / increased intensity.
        const BOLD          = 0b0000_0001;
        /// Dim / decreased intensity.
        const DIM           = 0b0000_0010;
        /// Italic text.
        const ITALIC        = 0b0000_0100;
        /// Underlined text.
        const UNDERLINE     = 0b0000_1000;
        /// Blinking text.
        const BLINK         = 0b0001_0000;
        /// Reverse video (swap fg/bg).
        const REVERSE       = 0b0010_0000;
        /// Strikethrough text.
        const STRIKETHROUGH = 0b0100_0000;
        /// Hidden / invisible text.
        const HIDDEN        = 0b1000_0000;
    }
}

/// A composable text style.
///
/// Unset colors inherit from whatever style they are merged onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color.
    pub fg: Option<Color>,
    /// Background color.
    pub bg: Option<Color>,
    /// Attribute flags.
    pub attrs: StyleFlags,
}

impl Style {
    /// An empty style.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            attrs: StyleFlags::empty(),
        }
    }

    #[must_use]
    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub const fn attrs(mut self, flags: StyleFlags) -> Self {
        self.attrs = self.attrs.union(flags);
        self
    }

    #[must_use]
    pub const fn bold(self) -> Self {
        self.attrs(StyleFlags::BOLD)
    }

    #[must_use]
    pub const fn dim(self) -> Self {
        self.attrs(StyleFlags::DIM)
    }

    #[must_use]
    pub const fn italic(self) -> Self {
        self.attrs(StyleFlags::ITALIC)
    }

    #[must_use]
    pub const fn underline(self) -> Self {
        self.attrs(StyleFlags::UNDERLINE)
    }

    #[must_use]
    pub const fn reverse(self) -> Self {
        self.attrs(StyleFlags::REVERSE)
    }

    #[must_use]
    pub const fn strikethrough(self) -> Self {
        self.attrs(StyleFlags::STRIKETHROUGH)
    }

    /// Check whether an attribute flag is set.
    #[must_use]
    pub const fn has_attr(&self, flag: StyleFlags) -> bool {
        self.attrs.contains(flag)
    }

    /// True when the style changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.attrs.is_empty()
    }

    /// Combine with a base style. Colors set on `self` win; attributes union.
    #[must_use]
    pub fn merge(&self, base: &Style) -> Style {
        Style {
            fg: self.fg.or(base.fg),
            bg: self.bg.or(base.bg),
            attrs: self.attrs | base.attrs,
        }
    }

    /// The same style with colors removed.
    #[must_use]
    pub const fn without_color(mut self) -> Self {
        self.fg = None;
        self.bg = None;
        self
    }
}
