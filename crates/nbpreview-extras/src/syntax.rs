#![forbid(unsafe_code)]

//! Syntax highlighting.
//!
//! A [`Lexer`] turns one source line into [`Token`]s; state that spans
//! lines (triple-quoted strings, block comments) is threaded through
//! [`LineState`]. Most languages share the configurable [`GenericLexer`].
//! Lexers are found by name or alias, case-insensitively, through the
//! [`LexerRegistry`], and [`Highlighter`] maps tokens to the styles of a
//! [`Theme`].
//!
//! # Cell magics
//!
//! A cell starting with `%%name` is highlighted in two parts: the magic line
//! with the notebook's default lexer and the body with the lexer registered
//! as `name`. An unknown `name` highlights the whole cell with the default
//! lexer.

use std::collections::HashMap;
use std::ops::Range;

use nbpreview_core::Theme;
use nbpreview_render::{RenderContext, Renderable};
use nbpreview_style::{Ansi16, Color, Style};
use nbpreview_text::{Line, Span, Text, TextMeasurement, WrapMode};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Builtin,
    /// Literal names such as `True`, `null`, `NA`.
    Constant,
    String,
    Number,
    Comment,
    Operator,
    Punctuation,
    /// IPython `%magic`, `%%cell_magic` and `!shell` prefixes.
    Magic,
    /// Shell `$VAR` references.
    Variable,
    Decorator,
    /// Object keys in JSON.
    Key,
    /// Markup tags.
    Tag,
    Heading,
    Identifier,
    Whitespace,
    Text,
}

/// A token kind and its byte range within the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end, "token range must be ordered");
        Self { kind, range }
    }
}

/// Lexical state carried from one line to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    #[default]
    Normal,
    InString {
        quote: u8,
        triple: bool,
    },
    InComment,
}

pub trait Lexer {
    /// Canonical name, e.g. `"python"`.
    fn name(&self) -> &'static str;

    /// Other names this lexer answers to.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Tokenize one line (without its line ending).
    fn tokenize_line(&self, line: &str, state: LineState) -> (Vec<Token>, LineState);
}

// ---------------------------------------------------------------------------
// GenericLexer
// ---------------------------------------------------------------------------

/// Configuration for a [`GenericLexer`].
pub struct LexerConfig {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub builtins: &'static [&'static str],
    pub constants: &'static [&'static str],
    /// Empty when the language has none.
    pub line_comment: &'static str,
    pub block_comment: Option<(&'static str, &'static str)>,
    pub quotes: &'static [u8],
    /// `'''` and `"""` strings that may span lines.
    pub triple_quotes: bool,
    pub case_insensitive: bool,
    /// `@name` decorators.
    pub decorators: bool,
    /// `$name` and `${...}` variables.
    pub variables: bool,
    /// IPython magics and shell escapes at line start.
    pub magics: bool,
    /// Strings followed by `:` are keys.
    pub string_keys: bool,
}

impl LexerConfig {
    const fn base(name: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            keywords: &[],
            builtins: &[],
            constants: &[],
            line_comment: "",
            block_comment: None,
            quotes: b"\"'",
            triple_quotes: false,
            case_insensitive: false,
            decorators: false,
            variables: false,
            magics: false,
            string_keys: false,
        }
    }
}

/// Keyword, string, number and comment scanner shared by most languages.
pub struct GenericLexer {
    config: LexerConfig,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Length of the UTF-8 sequence introduced by `lead`.
fn utf8_len(lead: u8) -> usize {
    match lead {
        0xF0.. => 4,
        0xE0.. => 3,
        0xC0.. => 2,
        _ => 1,
    }
}

fn is_operator_byte(b: u8) -> bool {
    matches!(
        b,
        b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'!' | b'<' | b'>' | b'&' | b'|' | b'^' | b'~'
    )
}

impl GenericLexer {
    pub const fn new(config: LexerConfig) -> Self {
        Self { config }
    }

    fn word_kind(&self, word: &str) -> TokenKind {
        let matches = |list: &[&str]| {
            if self.config.case_insensitive {
                list.iter().any(|candidate| candidate.eq_ignore_ascii_case(word))
            } else {
                list.contains(&word)
            }
        };
        if matches(self.config.keywords) {
            TokenKind::Keyword
        } else if matches(self.config.constants) {
            TokenKind::Constant
        } else if matches(self.config.builtins) {
            TokenKind::Builtin
        } else {
            TokenKind::Identifier
        }
    }

    fn scan_number(bytes: &[u8], pos: usize) -> usize {
        let mut end = pos;
        if bytes.get(end) == Some(&b'0') && bytes.get(end + 1).is_some_and(|b| (b | 0x20) == b'x') {
            end += 2;
            while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
                end += 1;
            }
            return end;
        }
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        if bytes.get(end).is_some_and(|b| (b | 0x20) == b'e')
            && bytes
                .get(end + 1)
                .is_some_and(|b| b.is_ascii_digit() || *b == b'-' || *b == b'+')
        {
            end += 2;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        // suffixes such as `j`, `L`, `u32`
        while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
            end += 1;
        }
        end
    }

    /// Scan to the closing delimiter starting at `pos` (just after the
    /// opening one). Returns the end offset and whether it closed.
    fn scan_string(bytes: &[u8], pos: usize, quote: u8, triple: bool) -> (usize, bool) {
        let mut end = pos;
        while end < bytes.len() {
            if bytes[end] == b'\\' {
                end += 1;
                if end < bytes.len() {
                    end += utf8_len(bytes[end]);
                }
                end = end.min(bytes.len());
            } else if bytes[end] == quote {
                if !triple {
                    return (end + 1, true);
                }
                if bytes.get(end + 1) == Some(&quote) && bytes.get(end + 2) == Some(&quote) {
                    return (end + 3, true);
                }
                end += 1;
            } else {
                end += 1;
            }
        }
        (end, false)
    }

    fn tokenize_from(
        &self,
        line: &str,
        mut pos: usize,
        mut tokens: Vec<Token>,
    ) -> (Vec<Token>, LineState) {
        let bytes = line.as_bytes();
        let first_non_space = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());

        while pos < bytes.len() {
            let ch = bytes[pos];
            let rest = &line[pos..];

            if ch.is_ascii_whitespace() {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                tokens.push(Token::new(TokenKind::Whitespace, start..pos));
                continue;
            }

            if self.config.magics && pos == first_non_space && (ch == b'%' || ch == b'!') {
                let start = pos;
                while pos < bytes.len() && (bytes[pos] == b'%' || bytes[pos] == b'!') {
                    pos += 1;
                }
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
                tokens.push(Token::new(TokenKind::Magic, start..pos));
                continue;
            }

            if let Some((open, close)) = self.config.block_comment
                && rest.starts_with(open)
            {
                let start = pos;
                let after_open = pos + open.len();
                match line[after_open..].find(close) {
                    Some(offset) => {
                        pos = after_open + offset + close.len();
                        tokens.push(Token::new(TokenKind::Comment, start..pos));
                    }
                    None => {
                        tokens.push(Token::new(TokenKind::Comment, start..bytes.len()));
                        return (tokens, LineState::InComment);
                    }
                }
                continue;
            }

            if !self.config.line_comment.is_empty() && rest.starts_with(self.config.line_comment) {
                tokens.push(Token::new(TokenKind::Comment, pos..bytes.len()));
                return (tokens, LineState::Normal);
            }

            if self.config.quotes.contains(&ch) {
                let start = pos;
                let triple = self.config.triple_quotes
                    && bytes.get(pos + 1) == Some(&ch)
                    && bytes.get(pos + 2) == Some(&ch);
                let open_len = if triple { 3 } else { 1 };
                let (end, closed) = Self::scan_string(bytes, pos + open_len, ch, triple);
                let is_key = self.config.string_keys
                    && line[end..].trim_start().starts_with(':');
                let kind = if is_key {
                    TokenKind::Key
                } else {
                    TokenKind::String
                };
                tokens.push(Token::new(kind, start..end));
                if !closed {
                    return (tokens, LineState::InString { quote: ch, triple });
                }
                pos = end;
                continue;
            }

            if ch.is_ascii_digit() {
                let start = pos;
                pos = Self::scan_number(bytes, pos);
                tokens.push(Token::new(TokenKind::Number, start..pos));
                continue;
            }

            if ch.is_ascii_alphabetic() || ch == b'_' {
                let start = pos;
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
                tokens.push(Token::new(self.word_kind(&line[start..pos]), start..pos));
                continue;
            }

            if (self.config.decorators && ch == b'@' && pos == first_non_space)
                || (self.config.variables && ch == b'$')
            {
                let start = pos;
                pos += 1;
                if self.config.variables && bytes.get(pos) == Some(&b'{') {
                    while pos < bytes.len() && bytes[pos] != b'}' {
                        pos += 1;
                    }
                    pos = (pos + 1).min(bytes.len());
                } else {
                    while pos < bytes.len() && (is_word_byte(bytes[pos]) || bytes[pos] == b'.') {
                        pos += 1;
                    }
                }
                let kind = if ch == b'$' {
                    TokenKind::Variable
                } else {
                    TokenKind::Decorator
                };
                tokens.push(Token::new(kind, start..pos));
                continue;
            }

            if is_operator_byte(ch) {
                let start = pos;
                while pos < bytes.len() && is_operator_byte(bytes[pos]) {
                    pos += 1;
                }
                tokens.push(Token::new(TokenKind::Operator, start..pos));
                continue;
            }

            let len = rest.chars().next().map_or(1, char::len_utf8);
            tokens.push(Token::new(TokenKind::Punctuation, pos..pos + len));
            pos += len;
        }

        (tokens, LineState::Normal)
    }
}

impl Lexer for GenericLexer {
    fn name(&self) -> &'static str {
        self.config.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.config.aliases
    }

    fn tokenize_line(&self, line: &str, state: LineState) -> (Vec<Token>, LineState) {
        match state {
            LineState::Normal => self.tokenize_from(line, 0, Vec::new()),
            LineState::InString { quote, triple } => {
                let (end, closed) = Self::scan_string(line.as_bytes(), 0, quote, triple);
                let tokens = vec![Token::new(TokenKind::String, 0..end)];
                if closed {
                    self.tokenize_from(line, end, tokens)
                } else {
                    (tokens, state)
                }
            }
            LineState::InComment => {
                let Some((_, close)) = self.config.block_comment else {
                    return self.tokenize_from(line, 0, Vec::new());
                };
                match line.find(close) {
                    Some(offset) => {
                        let end = offset + close.len();
                        self.tokenize_from(line, end, vec![Token::new(TokenKind::Comment, 0..end)])
                    }
                    None => (
                        vec![Token::new(TokenKind::Comment, 0..line.len())],
                        LineState::InComment,
                    ),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Markup and plain lexers
// ---------------------------------------------------------------------------

/// HTML: tags, attribute strings and comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLexer;

impl Lexer for HtmlLexer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["htm", "xml"]
    }

    fn tokenize_line(&self, line: &str, state: LineState) -> (Vec<Token>, LineState) {
        let mut tokens = Vec::new();
        let mut pos = 0;
        if state == LineState::InComment {
            match line.find("-->") {
                Some(offset) => {
                    pos = offset + 3;
                    tokens.push(Token::new(TokenKind::Comment, 0..pos));
                }
                None => {
                    tokens.push(Token::new(TokenKind::Comment, 0..line.len()));
                    return (tokens, LineState::InComment);
                }
            }
        }
        while pos < line.len() {
            let rest = &line[pos..];
            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(offset) => {
                        tokens.push(Token::new(TokenKind::Comment, pos..pos + offset + 3));
                        pos += offset + 3;
                    }
                    None => {
                        tokens.push(Token::new(TokenKind::Comment, pos..line.len()));
                        return (tokens, LineState::InComment);
                    }
                }
            } else if rest.starts_with('<') {
                let end = rest.find('>').map_or(line.len(), |offset| pos + offset + 1);
                let bytes = line.as_bytes();
                let mut cursor = pos;
                // quoted attribute values inside the tag are strings
                while cursor < end {
                    let start = cursor;
                    if bytes[cursor] == b'"' {
                        cursor += 1;
                        while cursor < end && bytes[cursor] != b'"' {
                            cursor += 1;
                        }
                        cursor = (cursor + 1).min(end);
                        tokens.push(Token::new(TokenKind::String, start..cursor));
                    } else {
                        while cursor < end && bytes[cursor] != b'"' {
                            cursor += 1;
                        }
                        tokens.push(Token::new(TokenKind::Tag, start..cursor));
                    }
                }
                pos = end;
            } else {
                let end = rest.find('<').map_or(line.len(), |offset| pos + offset);
                tokens.push(Token::new(TokenKind::Text, pos..end));
                pos = end;
            }
        }
        (tokens, LineState::Normal)
    }
}

/// Markdown source: headings, quotes, list markers, fences and code spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownLexer;

impl Lexer for MarkdownLexer {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["md"]
    }

    fn tokenize_line(&self, line: &str, state: LineState) -> (Vec<Token>, LineState) {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        let whole = |kind| vec![Token::new(kind, 0..line.len())];

        if trimmed.starts_with("```") {
            let next = if state == LineState::Normal {
                LineState::InString {
                    quote: b'`',
                    triple: true,
                }
            } else {
                LineState::Normal
            };
            return (whole(TokenKind::String), next);
        }
        if state != LineState::Normal {
            return (whole(TokenKind::String), state);
        }
        if trimmed.starts_with('#') {
            return (whole(TokenKind::Heading), state);
        }
        if trimmed.starts_with('>') {
            return (whole(TokenKind::Comment), state);
        }

        let mut tokens = Vec::new();
        let mut pos = indent;
        let marker_len = trimmed
            .split_once(' ')
            .map(|(marker, _)| marker)
            .filter(|marker| {
                matches!(*marker, "-" | "*" | "+")
                    || (marker.ends_with('.')
                        && marker.len() > 1
                        && marker[..marker.len() - 1].bytes().all(|b| b.is_ascii_digit()))
            })
            .map_or(0, str::len);
        if marker_len > 0 {
            tokens.push(Token::new(TokenKind::Keyword, pos..pos + marker_len));
            pos += marker_len;
        }
        while pos < line.len() {
            let rest = &line[pos..];
            if let Some(after) = rest.strip_prefix('`')
                && let Some(close) = after.find('`')
            {
                tokens.push(Token::new(TokenKind::String, pos..pos + close + 2));
                pos += close + 2;
                continue;
            }
            let skip = utf8_len(rest.as_bytes()[0]);
            let end = rest[skip..]
                .find('`')
                .map_or(line.len(), |offset| pos + skip + offset);
            tokens.push(Token::new(TokenKind::Text, pos..end));
            pos = end;
        }
        (tokens, state)
    }
}

/// Every line is one text token.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLexer;

impl Lexer for PlainLexer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["plain", "txt"]
    }

    fn tokenize_line(&self, line: &str, state: LineState) -> (Vec<Token>, LineState) {
        if line.is_empty() {
            return (Vec::new(), state);
        }
        (vec![Token::new(TokenKind::Text, 0..line.len())], state)
    }
}

// ---------------------------------------------------------------------------
// Built-in languages
// ---------------------------------------------------------------------------

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "case", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "match", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];
const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "dict", "enumerate", "filter", "float", "int", "isinstance",
    "len", "list", "map", "max", "min", "object", "open", "print", "range", "repr", "reversed",
    "self", "set", "sorted", "str", "sum", "super", "tuple", "type", "zip",
];

/// IPython: Python plus magics and shell escapes.
pub fn ipython_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["ipython3"],
        keywords: PYTHON_KEYWORDS,
        builtins: PYTHON_BUILTINS,
        constants: &["True", "False", "None"],
        line_comment: "#",
        triple_quotes: true,
        decorators: true,
        magics: true,
        ..LexerConfig::base("ipython")
    })
}

pub fn python_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["py", "python3"],
        keywords: PYTHON_KEYWORDS,
        builtins: PYTHON_BUILTINS,
        constants: &["True", "False", "None"],
        line_comment: "#",
        triple_quotes: true,
        decorators: true,
        ..LexerConfig::base("python")
    })
}

pub fn bash_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["sh", "shell", "zsh"],
        keywords: &[
            "case", "do", "done", "elif", "else", "esac", "export", "fi", "for", "function", "if",
            "in", "local", "return", "select", "then", "until", "while",
        ],
        builtins: &[
            "cat", "cd", "echo", "exit", "grep", "ls", "printf", "pwd", "read", "set", "source",
            "unset",
        ],
        line_comment: "#",
        variables: true,
        ..LexerConfig::base("bash")
    })
}

pub fn json_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        constants: &["true", "false", "null"],
        quotes: b"\"",
        string_keys: true,
        ..LexerConfig::base("json")
    })
}

pub fn r_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        keywords: &[
            "break", "else", "for", "function", "if", "in", "next", "repeat", "return", "while",
        ],
        builtins: &["c", "library", "list", "print", "require", "paste", "data.frame"],
        constants: &["TRUE", "FALSE", "NULL", "NA", "Inf", "NaN"],
        line_comment: "#",
        ..LexerConfig::base("r")
    })
}

pub fn julia_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["jl"],
        keywords: &[
            "begin", "catch", "const", "do", "else", "elseif", "end", "finally", "for",
            "function", "global", "if", "import", "let", "local", "macro", "module", "mutable",
            "return", "struct", "try", "using", "while",
        ],
        builtins: &["println", "print", "length", "push!", "map", "collect"],
        constants: &["true", "false", "nothing", "missing"],
        line_comment: "#",
        block_comment: Some(("#=", "=#")),
        triple_quotes: true,
        decorators: true,
        ..LexerConfig::base("julia")
    })
}

pub fn javascript_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["js"],
        keywords: &[
            "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
            "do", "else", "export", "extends", "finally", "for", "from", "function", "if",
            "import", "in", "instanceof", "let", "new", "of", "return", "switch", "this", "throw",
            "try", "typeof", "var", "while", "yield",
        ],
        builtins: &["console", "document", "window", "Math", "JSON", "Promise"],
        constants: &["true", "false", "null", "undefined"],
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
        quotes: b"\"'`",
        ..LexerConfig::base("javascript")
    })
}

pub fn sql_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        keywords: &[
            "and", "as", "by", "create", "delete", "desc", "distinct", "drop", "from", "group",
            "having", "insert", "into", "join", "left", "limit", "not", "on", "or", "order",
            "select", "set", "table", "update", "values", "where",
        ],
        builtins: &["avg", "count", "max", "min", "sum"],
        constants: &["null", "true", "false"],
        line_comment: "--",
        block_comment: Some(("/*", "*/")),
        case_insensitive: true,
        ..LexerConfig::base("sql")
    })
}

pub fn rust_lexer() -> GenericLexer {
    GenericLexer::new(LexerConfig {
        aliases: &["rs"],
        keywords: &[
            "as", "break", "const", "continue", "crate", "else", "enum", "fn", "for", "if",
            "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
            "self", "static", "struct", "trait", "type", "use", "where", "while",
        ],
        builtins: &["Option", "Result", "Some", "None", "Ok", "Err", "String", "Vec", "Box"],
        constants: &["true", "false"],
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
        quotes: b"\"",
        ..LexerConfig::base("rust")
    })
}

// ---------------------------------------------------------------------------
// LexerRegistry
// ---------------------------------------------------------------------------

/// Lexers by lowercase name and alias.
#[derive(Default)]
pub struct LexerRegistry {
    lexers: Vec<Box<dyn Lexer>>,
    by_name: HashMap<String, usize>,
}

impl LexerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in lexer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ipython_lexer()));
        registry.register(Box::new(python_lexer()));
        registry.register(Box::new(bash_lexer()));
        registry.register(Box::new(json_lexer()));
        registry.register(Box::new(r_lexer()));
        registry.register(Box::new(julia_lexer()));
        registry.register(Box::new(javascript_lexer()));
        registry.register(Box::new(HtmlLexer));
        registry.register(Box::new(MarkdownLexer));
        registry.register(Box::new(sql_lexer()));
        registry.register(Box::new(rust_lexer()));
        registry.register(Box::new(PlainLexer));
        registry
    }

    /// Later registrations win on name collisions.
    pub fn register(&mut self, lexer: Box<dyn Lexer>) {
        let index = self.lexers.len();
        for name in std::iter::once(lexer.name()).chain(lexer.aliases().iter().copied()) {
            self.by_name.insert(name.to_ascii_lowercase(), index);
        }
        self.lexers.push(lexer);
    }

    /// Look up by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<&dyn Lexer> {
        let index = self.by_name.get(&name.trim().to_ascii_lowercase())?;
        self.lexers.get(*index).map(|lexer| &**lexer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.lexers.iter().map(|lexer| lexer.name()).collect()
    }
}

impl std::fmt::Debug for LexerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexerRegistry")
            .field("lexers", &self.names())
            .finish()
    }
}

/// The lexer for a notebook kernel language.
#[must_use]
pub fn default_lexer_name(language: &str) -> &str {
    if language == "python" {
        "ipython"
    } else {
        language
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// Styles per token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntaxTheme {
    pub keyword: Style,
    pub builtin: Style,
    pub constant: Style,
    pub string: Style,
    pub number: Style,
    pub comment: Style,
    pub operator: Style,
    pub magic: Style,
    pub variable: Style,
    pub decorator: Style,
    pub key: Style,
    pub tag: Style,
    pub heading: Style,
    pub line_number: Style,
}

const fn ansi(color: Ansi16) -> Color {
    Color::Ansi16(color)
}

const fn hex(rgb: u32) -> Color {
    Color::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

impl SyntaxTheme {
    #[must_use]
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::AnsiDark => Self {
                keyword: Style::new().fg(ansi(Ansi16::BrightMagenta)),
                builtin: Style::new().fg(ansi(Ansi16::BrightCyan)),
                constant: Style::new().fg(ansi(Ansi16::BrightBlue)),
                string: Style::new().fg(ansi(Ansi16::Yellow)),
                number: Style::new().fg(ansi(Ansi16::BrightBlue)),
                comment: Style::new().fg(ansi(Ansi16::BrightBlack)).italic(),
                operator: Style::new().fg(ansi(Ansi16::BrightMagenta)),
                magic: Style::new().fg(ansi(Ansi16::BrightGreen)).bold(),
                variable: Style::new().fg(ansi(Ansi16::BrightRed)),
                decorator: Style::new().fg(ansi(Ansi16::BrightGreen)),
                key: Style::new().fg(ansi(Ansi16::BrightBlue)),
                tag: Style::new().fg(ansi(Ansi16::BrightMagenta)),
                heading: Style::new().fg(ansi(Ansi16::BrightBlue)).bold(),
                line_number: Style::new().dim(),
            },
            Theme::AnsiLight => Self {
                keyword: Style::new().fg(ansi(Ansi16::Magenta)),
                builtin: Style::new().fg(ansi(Ansi16::Cyan)),
                constant: Style::new().fg(ansi(Ansi16::Blue)),
                string: Style::new().fg(ansi(Ansi16::Green)),
                number: Style::new().fg(ansi(Ansi16::Blue)),
                comment: Style::new().fg(ansi(Ansi16::BrightBlack)).italic(),
                operator: Style::new().fg(ansi(Ansi16::Magenta)),
                magic: Style::new().fg(ansi(Ansi16::Green)).bold(),
                variable: Style::new().fg(ansi(Ansi16::Red)),
                decorator: Style::new().fg(ansi(Ansi16::Green)),
                key: Style::new().fg(ansi(Ansi16::Blue)),
                tag: Style::new().fg(ansi(Ansi16::Magenta)),
                heading: Style::new().fg(ansi(Ansi16::Blue)).bold(),
                line_number: Style::new().dim(),
            },
            Theme::Monokai => Self {
                keyword: Style::new().fg(hex(0xF92672)),
                builtin: Style::new().fg(hex(0x66D9EF)),
                constant: Style::new().fg(hex(0xAE81FF)),
                string: Style::new().fg(hex(0xE6DB74)),
                number: Style::new().fg(hex(0xAE81FF)),
                comment: Style::new().fg(hex(0x75715E)).italic(),
                operator: Style::new().fg(hex(0xF92672)),
                magic: Style::new().fg(hex(0xA6E22E)).bold(),
                variable: Style::new().fg(hex(0xFD971F)),
                decorator: Style::new().fg(hex(0xA6E22E)),
                key: Style::new().fg(hex(0xF92672)),
                tag: Style::new().fg(hex(0xF92672)),
                heading: Style::new().fg(hex(0xA6E22E)).bold(),
                line_number: Style::new().fg(hex(0x90908A)),
            },
            Theme::Material => Self {
                keyword: Style::new().fg(hex(0xC792EA)),
                builtin: Style::new().fg(hex(0x82AAFF)),
                constant: Style::new().fg(hex(0xF78C6C)),
                string: Style::new().fg(hex(0xC3E88D)),
                number: Style::new().fg(hex(0xF78C6C)),
                comment: Style::new().fg(hex(0x546E7A)).italic(),
                operator: Style::new().fg(hex(0x89DDFF)),
                magic: Style::new().fg(hex(0xFFCB6B)).bold(),
                variable: Style::new().fg(hex(0xF07178)),
                decorator: Style::new().fg(hex(0xFFCB6B)),
                key: Style::new().fg(hex(0xC792EA)),
                tag: Style::new().fg(hex(0xF07178)),
                heading: Style::new().fg(hex(0x82AAFF)).bold(),
                line_number: Style::new().fg(hex(0x37474F)),
            },
        }
    }

    /// `None` for kinds drawn in the terminal's default style.
    #[must_use]
    pub fn style_for(&self, kind: TokenKind) -> Option<Style> {
        let style = match kind {
            TokenKind::Keyword => self.keyword,
            TokenKind::Builtin => self.builtin,
            TokenKind::Constant => self.constant,
            TokenKind::String => self.string,
            TokenKind::Number => self.number,
            TokenKind::Comment => self.comment,
            TokenKind::Operator => self.operator,
            TokenKind::Magic => self.magic,
            TokenKind::Variable => self.variable,
            TokenKind::Decorator => self.decorator,
            TokenKind::Key => self.key,
            TokenKind::Tag => self.tag,
            TokenKind::Heading => self.heading,
            TokenKind::Punctuation
            | TokenKind::Identifier
            | TokenKind::Whitespace
            | TokenKind::Text => return None,
        };
        Some(style)
    }
}

// ---------------------------------------------------------------------------
// Highlighter
// ---------------------------------------------------------------------------

/// Lexer registry plus a theme.
#[derive(Debug)]
pub struct Highlighter {
    registry: LexerRegistry,
    theme: SyntaxTheme,
}

impl Highlighter {
    #[must_use]
    pub fn new(theme: Theme) -> Self {
        Self {
            registry: LexerRegistry::with_builtins(),
            theme: SyntaxTheme::for_theme(theme),
        }
    }

    #[must_use]
    pub fn theme(&self) -> &SyntaxTheme {
        &self.theme
    }

    #[must_use]
    pub fn registry(&self) -> &LexerRegistry {
        &self.registry
    }

    /// Highlight `code` with the lexer named `lexer`, or `None` if no such
    /// lexer exists.
    #[must_use]
    pub fn highlight(&self, code: &str, lexer: &str) -> Option<Text> {
        let lexer = self.registry.get(lexer)?;
        let mut state = LineState::Normal;
        let lines = code.split('\n').map(|source_line| {
            let source_line = source_line.strip_suffix('\r').unwrap_or(source_line);
            let (tokens, next) = lexer.tokenize_line(source_line, state);
            state = next;
            self.line_from_tokens(source_line, &tokens)
        });
        Some(Text::from_lines(lines.collect::<Vec<_>>()))
    }

    /// Like [`highlight`](Self::highlight) but unknown lexers yield
    /// unstyled text.
    #[must_use]
    pub fn highlight_or_plain(&self, code: &str, lexer: &str) -> Text {
        self.highlight(code, lexer).unwrap_or_else(|| {
            tracing::debug!(lexer, "no lexer registered; rendering plain text");
            Text::from_lines(code.split('\n').map(Line::raw).collect::<Vec<_>>())
        })
    }

    /// Highlight a code cell, honoring a leading `%%name` cell magic.
    #[must_use]
    pub fn highlight_cell(&self, source: &str, default_lexer: &str) -> Text {
        if source.starts_with("%%") {
            let (magic_line, body) = match source.split_once('\n') {
                Some((magic_line, body)) => (magic_line, Some(body)),
                None => (source, None),
            };
            let name = magic_line[2..].split_whitespace().next().unwrap_or_default();
            if self.registry.contains(name) {
                let mut text = self.highlight_or_plain(magic_line, default_lexer);
                if let Some(body) = body {
                    text.append(self.highlight_or_plain(body, name));
                }
                return text;
            }
            tracing::debug!(lexer = name, "unknown cell magic lexer; using the default lexer");
        }
        self.highlight_or_plain(source, default_lexer)
    }

    fn line_from_tokens(&self, source: &str, tokens: &[Token]) -> Line {
        let mut line = Line::new();
        let mut last_end = 0;
        for token in tokens {
            if token.range.start > last_end
                && let Some(gap) = source.get(last_end..token.range.start)
            {
                line.push_span(Span::raw(gap));
            }
            if let Some(text) = source.get(token.range.clone()) {
                line.push_span(match self.theme.style_for(token.kind) {
                    Some(style) => Span::styled(text, style),
                    None => Span::raw(text),
                });
            }
            last_end = last_end.max(token.range.end);
        }
        if let Some(tail) = source.get(last_end..)
            && !tail.is_empty()
        {
            line.push_span(Span::raw(tail));
        }
        line
    }
}

// ---------------------------------------------------------------------------
// CodeBlock
// ---------------------------------------------------------------------------

/// Highlighted code, cropped or wrapped to the width, with optional line
/// numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    text: Text,
    line_numbers: bool,
    wrap: bool,
    number_style: Style,
}

impl CodeBlock {
    #[must_use]
    pub fn new(text: Text) -> Self {
        Self {
            text,
            line_numbers: false,
            wrap: false,
            number_style: Style::new().dim(),
        }
    }

    #[must_use]
    pub fn line_numbers(mut self, enabled: bool, style: Style) -> Self {
        self.line_numbers = enabled;
        self.number_style = style;
        self
    }

    #[must_use]
    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    fn gutter_width(&self) -> usize {
        if self.line_numbers {
            self.text.height().max(1).to_string().len() + 1
        } else {
            0
        }
    }
}

impl Renderable for CodeBlock {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let gutter = self.gutter_width();
        let available = ctx.width.saturating_sub(gutter).max(1);
        let mut out = Vec::with_capacity(self.text.height());
        for (index, line) in self.text.iter().enumerate() {
            let pieces = if self.wrap {
                line.wrap(available, WrapMode::WordChar)
            } else {
                vec![line.truncated(available, None)]
            };
            for (piece_index, piece) in pieces.into_iter().enumerate() {
                let mut row = if gutter == 0 {
                    Line::new()
                } else if piece_index == 0 {
                    Line::styled(
                        format!("{:>width$} ", index + 1, width = gutter - 1),
                        self.number_style,
                    )
                } else {
                    Line::blank(gutter, None)
                };
                row.extend(piece);
                out.push(row);
            }
        }
        out
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let gutter = self.gutter_width();
        let widest = self.text.width() + gutter;
        let minimum = if self.wrap { gutter + 1 } else { widest };
        TextMeasurement {
            minimum,
            maximum: widest,
        }
        .clamp(None, Some(ctx.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(lexer: &dyn Lexer, line: &str) -> Vec<(TokenKind, String)> {
        lexer
            .tokenize_line(line, LineState::Normal)
            .0
            .into_iter()
            .filter(|token| token.kind != TokenKind::Whitespace)
            .map(|token| (token.kind, line[token.range].to_string()))
            .collect()
    }

    fn styled_spans(text: &Text) -> Vec<(String, bool)> {
        text.iter()
            .flat_map(|line| line.spans().iter())
            .map(|span| (span.as_str().to_string(), span.style.is_some()))
            .collect()
    }

    #[test]
    fn python_tokens() {
        let tokens = kinds(&python_lexer(), "def f(x): return x + 1  # done");
        assert_eq!(tokens[0], (TokenKind::Keyword, "def".into()));
        assert!(tokens.contains(&(TokenKind::Number, "1".into())));
        assert_eq!(tokens.last(), Some(&(TokenKind::Comment, "# done".into())));
    }

    #[test]
    fn triple_quoted_strings_span_lines() {
        let lexer = python_lexer();
        let (_, state) = lexer.tokenize_line("x = \"\"\"start", LineState::Normal);
        assert_eq!(
            state,
            LineState::InString {
                quote: b'"',
                triple: true
            }
        );
        let (tokens, state) = lexer.tokenize_line("end\"\"\" + y", state);
        assert_eq!(state, LineState::Normal);
        assert_eq!(tokens[0], Token::new(TokenKind::String, 0..6));
    }

    #[test]
    fn ipython_magics() {
        let tokens = kinds(&ipython_lexer(), "%timeit f(1)");
        assert_eq!(tokens[0], (TokenKind::Magic, "%timeit".into()));
        let tokens = kinds(&ipython_lexer(), "!ls -la");
        assert_eq!(tokens[0], (TokenKind::Magic, "!ls".into()));
        // python has no magics
        let tokens = kinds(&python_lexer(), "%timeit");
        assert_eq!(tokens[0], (TokenKind::Operator, "%".into()));
    }

    #[test]
    fn json_keys_and_constants() {
        let tokens = kinds(&json_lexer(), r#"{"a": true, "b": "c"}"#);
        assert!(tokens.contains(&(TokenKind::Key, "\"a\"".into())));
        assert!(tokens.contains(&(TokenKind::Constant, "true".into())));
        assert!(tokens.contains(&(TokenKind::String, "\"c\"".into())));
    }

    #[test]
    fn bash_variables() {
        let tokens = kinds(&bash_lexer(), "echo ${HOME} $USER");
        assert_eq!(tokens[0], (TokenKind::Builtin, "echo".into()));
        assert!(tokens.contains(&(TokenKind::Variable, "${HOME}".into())));
        assert!(tokens.contains(&(TokenKind::Variable, "$USER".into())));
    }

    #[test]
    fn sql_is_case_insensitive() {
        let tokens = kinds(&sql_lexer(), "SELECT * FROM t -- all");
        assert_eq!(tokens[0], (TokenKind::Keyword, "SELECT".into()));
        assert_eq!(tokens.last(), Some(&(TokenKind::Comment, "-- all".into())));
    }

    #[test]
    fn julia_block_comments() {
        let lexer = julia_lexer();
        let (_, state) = lexer.tokenize_line("#= open", LineState::Normal);
        assert_eq!(state, LineState::InComment);
        let (tokens, state) = lexer.tokenize_line("close =# x", state);
        assert_eq!(state, LineState::Normal);
        assert_eq!(tokens[0].kind, TokenKind::Comment);
    }

    #[test]
    fn html_tags_cover_the_line() {
        let line = r#"<a href="x">link</a>"#;
        let (tokens, _) = HtmlLexer.tokenize_line(line, LineState::Normal);
        let covered: usize = tokens.iter().map(|token| token.range.len()).sum();
        assert_eq!(covered, line.len());
        assert_eq!(tokens[0].kind, TokenKind::Tag);
        assert!(tokens.iter().any(|token| token.kind == TokenKind::String));
    }

    #[test]
    fn markdown_headings_and_code_spans() {
        assert_eq!(kinds(&MarkdownLexer, "# Title")[0].0, TokenKind::Heading);
        let tokens = kinds(&MarkdownLexer, "- use `x` here");
        assert_eq!(tokens[0], (TokenKind::Keyword, "-".into()));
        assert!(tokens.contains(&(TokenKind::String, "`x`".into())));
    }

    #[test]
    fn registry_lookup_ignores_case_and_uses_aliases() {
        let registry = LexerRegistry::with_builtins();
        assert_eq!(registry.get("PY").map(|lexer| lexer.name()), Some("python"));
        assert_eq!(registry.get("zsh").map(|lexer| lexer.name()), Some("bash"));
        assert_eq!(registry.get("jl").map(|lexer| lexer.name()), Some("julia"));
        assert!(registry.get("cobol").is_none());
    }

    #[test]
    fn default_lexer_for_python_is_ipython() {
        assert_eq!(default_lexer_name("python"), "ipython");
        assert_eq!(default_lexer_name("julia"), "julia");
    }

    #[test]
    fn highlighted_text_preserves_source() {
        let highlighter = Highlighter::new(Theme::Monokai);
        let code = "import os\n\nprint(os.getcwd())";
        let text = highlighter.highlight(code, "python").expect("python lexer");
        assert_eq!(text.to_plain_text(), code);
    }

    #[test]
    fn cell_magic_switches_lexer() {
        let highlighter = Highlighter::new(Theme::AnsiDark);
        let text = highlighter.highlight_cell("%%bash\necho 'hi'", "ipython");
        assert_eq!(text.to_plain_text(), "%%bash\necho 'hi'");
        let spans = styled_spans(&text);
        assert_eq!(spans[0], ("%%bash".to_string(), true));
        assert!(spans.contains(&("echo".to_string(), true)));
        assert!(spans.contains(&("'hi'".to_string(), true)));
    }

    #[test]
    fn unknown_cell_magic_uses_default_lexer() {
        let highlighter = Highlighter::new(Theme::AnsiDark);
        let text = highlighter.highlight_cell("%%unknownlang\nfoo", "ipython");
        assert_eq!(text.to_plain_text(), "%%unknownlang\nfoo");
        assert_eq!(styled_spans(&text)[0], ("%%unknownlang".to_string(), true));
    }

    #[test]
    fn unknown_language_is_plain() {
        let highlighter = Highlighter::new(Theme::AnsiDark);
        assert!(highlighter.highlight("x", "cobol").is_none());
        let text = highlighter.highlight_or_plain("print 1", "cobol");
        assert!(styled_spans(&text).iter().all(|(_, styled)| !styled));
    }

    #[test]
    fn code_block_crops_without_wrap() {
        let block = CodeBlock::new(Text::raw("abcdefgh\nxy"));
        let lines = block.render(&RenderContext::new(4));
        let plain: Vec<String> = lines.iter().map(Line::to_plain_text).collect();
        assert_eq!(plain, vec!["abcd", "xy"]);
    }

    #[test]
    fn code_block_wraps_with_numbered_gutter() {
        let block = CodeBlock::new(Text::raw("abcdefgh\nxy"))
            .wrap(true)
            .line_numbers(true, Style::new().dim());
        let lines = block.render(&RenderContext::new(6));
        let plain: Vec<String> = lines.iter().map(Line::to_plain_text).collect();
        assert_eq!(plain, vec!["1 abcd", "  efgh", "2 xy"]);
    }
}
