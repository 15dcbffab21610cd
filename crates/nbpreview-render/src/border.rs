//! Box-drawing character sets.

/// Characters used to draw a border around a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderChars {
    /// Rounded corners.
    pub const ROUNDED: Self = Self {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        horizontal: '─',
        vertical: '│',
    };

    /// Square corners.
    pub const SQUARE: Self = Self {
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        horizontal: '─',
        vertical: '│',
    };

    /// ASCII-only border for terminals without box-drawing glyphs.
    pub const ASCII: Self = Self {
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        horizontal: '-',
        vertical: '|',
    };

    /// Pick `self` when unicode is allowed, [`ASCII`](Self::ASCII) otherwise.
    #[must_use]
    pub const fn or_ascii(self, ascii_only: bool) -> Self {
        if ascii_only { Self::ASCII } else { self }
    }

    /// A horizontal run of `width` border characters.
    #[must_use]
    pub fn horizontal_run(&self, width: usize) -> String {
        std::iter::repeat_n(self.horizontal, width).collect()
    }
}
