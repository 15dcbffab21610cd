#![forbid(unsafe_code)]

//! LaTeX to Unicode transliteration.
//!
//! Math is rendered as plain text: math delimiters are stripped, structural
//! commands (`\frac`, `\sqrt`, `\text`, `\mathcal`, spacing, `\left`/`\right`)
//! are rewritten into linear form, symbols and scripts go through
//! [`unicodeit`], and what is left is cleaned up by a few fallbacks.
//!
//! Malformed input never fails: anything that cannot be converted is passed
//! through as written.
//!
//! ```
//! use nbpreview_extras::latex::latex_to_unicode;
//!
//! assert_eq!(latex_to_unicode(r"$\alpha$"), "α");
//! assert_eq!(latex_to_unicode(r"\frac{a+b}{2}"), "(a+b)/2");
//! ```

/// Environments whose wrapper is dropped, content kept.
const ENVIRONMENTS: &[&str] = &[
    "equation", "equation*", "align", "align*", "gather", "gather*", "displaymath", "math",
];

/// Commands whose single argument is kept verbatim.
const TEXT_COMMANDS: &[&str] = &[
    "text", "textrm", "textit", "textbf", "textsf", "texttt", "mbox", "mathrm", "operatorname",
];

const FRACTION_COMMANDS: &[&str] = &["frac", "dfrac", "tfrac", "cfrac"];

const SIZING_COMMANDS: &[&str] = &[
    "left", "right", "big", "Big", "bigg", "Bigg", "bigl", "bigr", "Bigl", "Bigr",
];

const SCRIPT_CAPITALS: [char; 26] = [
    '𝒜', 'ℬ', '𝒞', '𝒟', 'ℰ', 'ℱ', '𝒢', 'ℋ', 'ℐ', '𝒥', '𝒦', 'ℒ', 'ℳ', '𝒩', '𝒪', '𝒫', '𝒬', 'ℛ', '𝒮',
    '𝒯', '𝒰', '𝒱', '𝒲', '𝒳', '𝒴', '𝒵',
];

/// Symbols applied after `unicodeit`, for commands it leaves alone.
const SYMBOL_FALLBACKS: &[(&str, &str)] = &[
    (r"\ldots", "…"),
    (r"\cdots", "⋯"),
    (r"\dots", "…"),
    (r"\implies", "⟹"),
    (r"\iff", "⟺"),
    (r"\mapsto", "↦"),
    (r"\to", "→"),
    (r"\infty", "∞"),
    (r"\lvert", "|"),
    (r"\rvert", "|"),
    (r"\lVert", "‖"),
    (r"\rVert", "‖"),
    (r"\langle", "⟨"),
    (r"\rangle", "⟩"),
    (r"\{", "{"),
    (r"\}", "}"),
    (r"\%", "%"),
    (r"\$", "$"),
    (r"\&", "&"),
    (r"\_", "_"),
];

/// Transliterate a LaTeX fragment into Unicode text.
#[must_use]
pub fn latex_to_unicode(source: &str) -> String {
    let body = strip_math_delimiters(source);
    let linear = rewrite_structures(body);
    let replaced = unicodeit::replace(&linear);
    let scripted = parenthesize_leftover_scripts(&replaced);
    let unbraced = strip_grouping_braces(&scripted);
    let mut out = unbraced;
    for (command, symbol) in SYMBOL_FALLBACKS {
        if out.contains(command) {
            out = out.replace(command, symbol);
        }
    }
    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Remove one layer of `$…$`, `$$…$$`, `\[…\]`, `\(…\)` or
/// `\begin{env}…\end{env}` around the fragment.
#[must_use]
pub fn strip_math_delimiters(source: &str) -> &str {
    let trimmed = source.trim();
    for (open, close) in [("$$", "$$"), ("\\[", "\\]"), ("\\(", "\\)"), ("$", "$")] {
        if trimmed.len() >= open.len() + close.len()
            && let Some(inner) = trimmed
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    for env in ENVIRONMENTS {
        let open = format!("\\begin{{{env}}}");
        let close = format!("\\end{{{env}}}");
        if let Some(inner) = trimmed
            .strip_prefix(open.as_str())
            .and_then(|rest| rest.strip_suffix(close.as_str()))
        {
            return inner.trim();
        }
    }
    trimmed
}

// ---------------------------------------------------------------------------
// Structural rewriting
// ---------------------------------------------------------------------------

/// Byte offset just past the brace group opening at `open`, plus the inner
/// text. `None` when `open` is not `{` or the group never closes.
fn brace_group(source: &str, open: usize) -> Option<(usize, &str)> {
    if source.as_bytes().get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut escaped = false;
    for (offset, ch) in source[open..].char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = open + offset;
                    return Some((end + 1, &source[open + 1..end]));
                }
            }
            _ => {}
        }
    }
    None
}

/// A single-token argument: a brace group, or one character.
fn argument(source: &str, at: usize) -> Option<(usize, &str)> {
    let at = at + source[at..].len() - source[at..].trim_start().len();
    if let Some(group) = brace_group(source, at) {
        return Some(group);
    }
    let ch = source[at..].chars().next()?;
    if matches!(ch, '{' | '}' | '\\') {
        return None;
    }
    Some((at + ch.len_utf8(), &source[at..at + ch.len_utf8()]))
}

fn is_simple(expr: &str) -> bool {
    expr.chars().count() <= 1 || expr.chars().all(char::is_alphanumeric)
}

fn parenthesize(expr: &str) -> String {
    if is_simple(expr) {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}

/// Rewrite commands that take arguments into linear text. Unknown commands
/// are copied unchanged.
#[must_use]
pub fn rewrite_structures(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    while pos < source.len() {
        let rest = &source[pos..];
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch == '&' {
            pos += 1;
            continue;
        }
        if ch != '\\' {
            out.push(ch);
            pos += ch.len_utf8();
            continue;
        }

        let after = &rest[1..];
        let name_len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        if name_len == 0 {
            // control symbols
            match after.chars().next() {
                Some('\\') => out.push('\n'),
                Some(',' | ':' | ';' | ' ') => out.push(' '),
                Some('!') => {}
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
            pos += 1 + after.chars().next().map_or(0, char::len_utf8);
            continue;
        }

        let name = &after[..name_len];
        let args_at = pos + 1 + name_len;
        match name {
            "quad" => {
                out.push_str("  ");
                pos = args_at;
            }
            "qquad" => {
                out.push_str("    ");
                pos = args_at;
            }
            _ if SIZING_COMMANDS.contains(&name) => {
                pos = args_at;
                if source[pos..].starts_with('.') {
                    pos += 1;
                }
            }
            _ if TEXT_COMMANDS.contains(&name) => match brace_group(source, args_at) {
                Some((end, inner)) => {
                    out.push_str(inner);
                    pos = end;
                }
                None => {
                    out.push_str(&source[pos..args_at]);
                    pos = args_at;
                }
            },
            "mathcal" => match brace_group(source, args_at) {
                Some((end, inner)) => {
                    out.extend(inner.chars().map(|c| {
                        if c.is_ascii_uppercase() {
                            SCRIPT_CAPITALS[usize::from(c as u8 - b'A')]
                        } else {
                            c
                        }
                    }));
                    pos = end;
                }
                None => {
                    out.push_str(&source[pos..args_at]);
                    pos = args_at;
                }
            },
            _ if FRACTION_COMMANDS.contains(&name) => {
                let numerator = argument(source, args_at);
                let denominator = numerator.and_then(|(end, _)| argument(source, end));
                match (numerator, denominator) {
                    (Some((_, num)), Some((end, den))) => {
                        let num = rewrite_structures(num);
                        let den = rewrite_structures(den);
                        out.push_str(&parenthesize(&num));
                        out.push('/');
                        out.push_str(&parenthesize(&den));
                        pos = end;
                    }
                    _ => {
                        out.push_str(&source[pos..args_at]);
                        pos = args_at;
                    }
                }
            }
            "sqrt" => {
                let mut at = args_at;
                let mut index = None;
                if source[at..].starts_with('[')
                    && let Some(close) = source[at..].find(']')
                {
                    index = Some(source[at + 1..at + close].trim());
                    at += close + 1;
                }
                let radical = match index {
                    Some("3") => "∛",
                    Some("4") => "∜",
                    _ => "√",
                };
                match argument(source, at) {
                    Some((end, radicand)) => {
                        if let Some(index) = index.filter(|index| !matches!(*index, "3" | "4")) {
                            out.push_str(&unicodeit::replace(&format!("^{{{index}}}")));
                        }
                        out.push_str(radical);
                        out.push_str(&parenthesize(&rewrite_structures(radicand)));
                        pos = end;
                    }
                    None => {
                        out.push_str(radical);
                        pos = at;
                    }
                }
            }
            _ => {
                out.push_str(&source[pos..args_at]);
                pos = args_at;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Fallbacks
// ---------------------------------------------------------------------------

/// `x^{ab}` groups that had no Unicode superscripts become `x^(ab)`.
fn parenthesize_leftover_scripts(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    while pos < source.len() {
        let rest = &source[pos..];
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if (ch == '^' || ch == '_')
            && let Some((end, inner)) = brace_group(source, pos + 1)
        {
            out.push(ch);
            if inner.chars().count() == 1 {
                out.push_str(inner);
            } else {
                out.push('(');
                out.push_str(inner);
                out.push(')');
            }
            pos = end;
            continue;
        }
        out.push(ch);
        pos += ch.len_utf8();
    }
    out
}

/// Drop grouping braces, keeping the braces of arguments to commands that
/// are still unconverted and escaped `\{`/`\}`.
#[must_use]
pub fn strip_grouping_braces(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut keep_stack: Vec<bool> = Vec::new();
    let mut after_command = false;
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push(ch);
                match chars.peek().copied() {
                    Some(next) if next.is_ascii_alphabetic() => {
                        while let Some(&next) = chars.peek() {
                            if !next.is_ascii_alphabetic() {
                                break;
                            }
                            out.push(next);
                            chars.next();
                        }
                        after_command = true;
                        continue;
                    }
                    Some(next) => {
                        out.push(next);
                        chars.next();
                    }
                    None => {}
                }
            }
            '{' => {
                keep_stack.push(after_command);
                if after_command {
                    out.push(ch);
                }
            }
            '}' => {
                let kept = keep_stack.pop();
                // unbalanced closers are kept as written
                if kept != Some(false) {
                    out.push(ch);
                }
                // a command keeps consuming consecutive groups
                if kept == Some(true) && chars.peek() == Some(&'{') {
                    after_command = true;
                    continue;
                }
            }
            other => out.push(other),
        }
        after_command = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delimiters_are_stripped() {
        assert_eq!(strip_math_delimiters("$$x$$"), "x");
        assert_eq!(strip_math_delimiters("  $x$ "), "x");
        assert_eq!(strip_math_delimiters(r"\[ x \]"), "x");
        assert_eq!(strip_math_delimiters(r"\begin{equation}x\end{equation}"), "x");
        assert_eq!(strip_math_delimiters("$"), "$");
        assert_eq!(strip_math_delimiters("x"), "x");
    }

    #[test]
    fn greek_and_superscripts() {
        assert_eq!(latex_to_unicode(r"\alpha"), "α");
        assert_eq!(latex_to_unicode("$x^2$"), "x²");
    }

    #[test]
    fn fractions_are_linear() {
        assert_eq!(latex_to_unicode(r"\frac{a+b}{c}"), "(a+b)/c");
        assert_eq!(rewrite_structures(r"\frac12"), "1/2");
        assert_eq!(rewrite_structures(r"\dfrac{x}{\frac{1}{y}}"), "x/(1/y)");
    }

    #[test]
    fn roots() {
        assert_eq!(rewrite_structures(r"\sqrt{x+1}"), "√(x+1)");
        assert_eq!(rewrite_structures(r"\sqrt[3]{8}"), "∛8");
        assert_eq!(rewrite_structures(r"\sqrt x"), "√x");
    }

    #[test]
    fn text_and_calligraphic() {
        assert_eq!(latex_to_unicode(r"\text{area}=x"), "area=x");
        assert_eq!(rewrite_structures(r"\mathcal{AB}"), "𝒜ℬ");
    }

    #[test]
    fn spacing_and_alignment() {
        assert_eq!(rewrite_structures(r"a\,b\quad c"), "a b   c");
        assert_eq!(rewrite_structures(r"a &= b \\ c &= d"), "a = b \n c = d");
        assert_eq!(rewrite_structures(r"\left( x \right."), "( x ");
    }

    #[test]
    fn unknown_commands_pass_through() {
        assert_eq!(latex_to_unicode(r"\zzz{x}"), r"\zzz{x}");
    }

    #[test]
    fn grouping_braces_are_dropped() {
        assert_eq!(strip_grouping_braces("{a}+{b}"), "a+b");
        assert_eq!(strip_grouping_braces(r"\zzz{a}{b}"), r"\zzz{a}{b}");
        assert_eq!(strip_grouping_braces(r"\{a\}"), r"\{a\}");
        assert_eq!(strip_grouping_braces("a}"), "a}");
    }

    #[test]
    fn leftover_scripts_get_parentheses() {
        assert_eq!(parenthesize_leftover_scripts("x_{qq}"), "x_(qq)");
        assert_eq!(parenthesize_leftover_scripts("x_{q}"), "x_q");
    }

    #[test]
    fn malformed_input_degrades() {
        assert!(latex_to_unicode(r"\frac{a").contains('a'));
        assert!(latex_to_unicode(r"\sqrt[").contains('√'));
        assert_eq!(latex_to_unicode("}}{"), "}}");
    }

    proptest! {
        #[test]
        fn rewriting_never_panics(source in r"[a-z0-9 \\{}\[\]^_&$.]{0,32}") {
            let rewritten = rewrite_structures(&source);
            let _ = strip_grouping_braces(&rewritten);
            let _ = parenthesize_leftover_scripts(&rewritten);
            let _ = strip_math_delimiters(&source);
        }
    }
}
