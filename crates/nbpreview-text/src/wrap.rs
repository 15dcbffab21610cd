//! Width-correct wrapping and truncation of plain strings.
//!
//! Widths are measured in terminal cells and breaks never split a grapheme
//! cluster:
//!
//! ```
//! use nbpreview_text::wrap::{wrap_text, WrapMode};
//!
//! let lines = wrap_text("Hello world foo bar", 10, WrapMode::Word);
//! assert_eq!(lines, vec!["Hello", "world foo", "bar"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Text wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No wrapping; lines may exceed width and are cropped by the layout.
    None,
    /// Wrap at word boundaries when possible.
    Word,
    /// Wrap at character (grapheme) boundaries.
    Char,
    /// Word wrap with character fallback for long words.
    #[default]
    WordChar,
}

/// Iterate over the extended grapheme clusters of `text`.
pub fn graphemes(text: &str) -> impl Iterator<Item = &str> {
    text.graphemes(true)
}

/// Cell width of a single grapheme cluster.
#[inline]
#[must_use]
pub fn grapheme_width(grapheme: &str) -> usize {
    grapheme.width()
}

/// Calculate the display width of text in cells.
#[inline]
#[must_use]
pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Wrap every line of `text` to `width` cells.
#[must_use]
pub fn wrap_text(text: &str, width: usize, mode: WrapMode) -> Vec<String> {
    if width == 0 || mode == WrapMode::None {
        return text.split('\n').map(str::to_string).collect();
    }
    let mut out = Vec::new();
    for line in text.split('\n') {
        match mode {
            WrapMode::Char => out.extend(wrap_chars(line, width)),
            WrapMode::Word => out.extend(wrap_words(line, width, false)),
            WrapMode::WordChar | WrapMode::None => out.extend(wrap_words(line, width, true)),
        }
    }
    out
}

fn wrap_chars(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for grapheme in line.graphemes(true) {
        let w = grapheme.width();
        if current_width + w > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push_str(grapheme);
        current_width += w;
    }
    lines.push(current);
    lines
}

fn wrap_words(line: &str, width: usize, char_fallback: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split_word_bounds() {
        let w = word.width();
        let is_ws = word.chars().all(char::is_whitespace);
        if current_width + w <= width {
            if !(is_ws && current.is_empty() && !lines.is_empty()) {
                current.push_str(word);
                current_width += w;
            }
            continue;
        }
        if !current.is_empty() {
            lines.push(current.trim_end().to_string());
            current.clear();
            current_width = 0;
        }
        if is_ws {
            continue;
        }
        if w > width && char_fallback {
            let mut pieces = wrap_chars(word, width);
            if let Some(last) = pieces.pop() {
                lines.extend(pieces);
                current_width = last.width();
                current = last;
            }
        } else {
            current.push_str(word);
            current_width = w;
        }
    }
    lines.push(current.trim_end().to_string());
    lines
}

/// Truncate text to fit within a width, adding ellipsis if needed.
///
/// Grapheme boundaries are respected.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_width: usize, ellipsis: &str) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let ellipsis_width = ellipsis.width();
    if ellipsis_width >= max_width {
        return truncate_to_width(text, max_width);
    }

    let mut result = truncate_to_width(text, max_width - ellipsis_width);
    result.push_str(ellipsis);
    result
}

/// Truncate text to exactly fit within a width (no ellipsis).
#[must_use]
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for grapheme in text.graphemes(true) {
        let grapheme_width = grapheme.width();
        if current_width + grapheme_width > max_width {
            break;
        }
        result.push_str(grapheme);
        current_width += grapheme_width;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn word_wrap_breaks_on_spaces() {
        assert_eq!(
            wrap_text("hello world foo bar", 11, WrapMode::Word),
            vec!["hello world", "foo bar"]
        );
    }

    #[test]
    fn wrap_preserves_newlines() {
        assert_eq!(
            wrap_text("line1\nline2", 20, WrapMode::Word),
            vec!["line1", "line2"]
        );
    }

    #[test]
    fn word_char_splits_long_words() {
        let lines = wrap_text("Supercalifragilistic", 10, WrapMode::WordChar);
        assert_eq!(lines, vec!["Supercalif", "ragilistic"]);
    }

    #[test]
    fn word_mode_keeps_long_words_whole() {
        let lines = wrap_text("a Supercalifragilistic", 10, WrapMode::Word);
        assert_eq!(lines, vec!["a", "Supercalifragilistic"]);
    }

    #[test]
    fn char_wrap_respects_wide_glyphs() {
        let lines = wrap_text("日本語テキスト", 4, WrapMode::Char);
        assert!(lines.iter().all(|l| display_width(l) <= 4));
        assert_eq!(lines.concat(), "日本語テキスト");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_with_ellipsis("column", 4, "…"), "col…");
        assert_eq!(truncate_with_ellipsis("col", 4, "…"), "col");
        assert_eq!(truncate_with_ellipsis("column", 1, "…"), "c");
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit(text in "[a-z ]{0,80}", width in 1usize..30) {
            for line in wrap_text(&text, width, WrapMode::WordChar) {
                prop_assert!(display_width(&line) <= width);
            }
        }
    }
}
