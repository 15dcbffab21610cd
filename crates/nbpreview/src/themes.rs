#![forbid(unsafe_code)]

//! `--list-themes`: one highlighted sample per theme.

use nbpreview_core::Theme;
use nbpreview_extras::syntax::{CodeBlock, Highlighter};
use nbpreview_render::{BorderChars, Padding, Panel, Sides, Stack};
use nbpreview_style::Style;
use nbpreview_text::Line;

/// Widest a sample panel gets.
pub const MAX_SAMPLE_WIDTH: usize = 88;

const SAMPLE: &str = r#""""Example syntax highlighting."""
from typing import Iterator

class Math:
    """An example class."""

    @staticmethod
    def fib(n: int) -> Iterator[int]:
        """Fibonacci series up to n."""
        a, b = 0, 1  # Manually set first two terms
        while a < n:
            yield a
            a, b = b, a + b

result = sum(Math.fib(42))
print(f"The answer is {result}")"#;

/// `dark / ansi_dark`, or the bare name for themes without an alias.
#[must_use]
pub fn theme_title(theme: Theme) -> String {
    match theme.alias() {
        Some(alias) => format!("{} / {alias}", theme.name()),
        None => theme.name().to_string(),
    }
}

/// Every theme, as a titled sample panel or, when `samples` is off, just
/// the titles.
#[must_use]
pub fn theme_gallery(samples: bool, unicode: bool) -> Stack {
    let mut stack = Stack::new();
    for theme in Theme::ALL {
        let title = theme_title(theme);
        if !samples {
            stack.push(Line::raw(title));
            continue;
        }
        let highlighter = Highlighter::new(theme);
        let code = CodeBlock::new(highlighter.highlight_or_plain(SAMPLE, "python"));
        stack.push(Line::styled(title, Style::new().bold()));
        stack.push(
            Panel::new(Padding::new(code, Sides::new(1, 1, 1, 1)))
                .border(BorderChars::ROUNDED.or_ascii(!unicode)),
        );
    }
    stack
}
