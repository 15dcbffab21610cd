#![forbid(unsafe_code)]

//! Text: styled spans and lines, width-correct wrapping and truncation,
//! and decoding of ANSI-colored strings into styled text.

pub mod ansi;
pub mod text;
pub mod wrap;

/// Bounds-based text measurement for layout negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMeasurement {
    /// Minimum possible width.
    pub minimum: usize,
    /// Maximum possible width.
    pub maximum: usize,
}

impl TextMeasurement {
    /// Zero-width measurement.
    pub const ZERO: Self = Self {
        minimum: 0,
        maximum: 0,
    };

    /// A measurement whose bounds coincide.
    #[must_use]
    pub const fn exact(width: usize) -> Self {
        Self {
            minimum: width,
            maximum: width,
        }
    }

    /// Union: take max of both bounds (vertical stacking of blocks).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            minimum: self.minimum.max(other.minimum),
            maximum: self.maximum.max(other.maximum),
        }
    }

    /// Add both bounds (side-by-side layout).
    #[must_use]
    pub fn stack(self, other: Self) -> Self {
        Self {
            minimum: self.minimum.saturating_add(other.minimum),
            maximum: self.maximum.saturating_add(other.maximum),
        }
    }

    /// Widen both bounds by a fixed amount (padding, borders).
    #[must_use]
    pub fn grow(self, extra: usize) -> Self {
        self.stack(Self::exact(extra))
    }

    /// Clamp bounds to optional min/max constraints.
    #[must_use]
    pub fn clamp(self, min_width: Option<usize>, max_width: Option<usize>) -> Self {
        let mut result = self;
        if let Some(min_w) = min_width {
            result.minimum = result.minimum.max(min_w);
            result.maximum = result.maximum.max(min_w);
        }
        if let Some(max_w) = max_width {
            result.minimum = result.minimum.min(max_w);
            result.maximum = result.maximum.min(max_w);
        }
        result
    }
}

pub use ansi::{AnsiDecoder, decode_ansi, strip_ansi};
pub use text::{Line, Span, Text};
pub use wrap::{
    WrapMode, display_width, grapheme_width, graphemes, truncate_to_width,
    truncate_with_ellipsis, wrap_text,
};
