//! Content renderers for nbpreview.
//!
//! Higher-level pieces built on `nbpreview-render`, `nbpreview-style` and
//! `nbpreview-text`. Each module owns one kind of notebook content and
//! degrades to text instead of failing.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`drawing`] | Bitmaps as block, character or braille text, memoized |
//! | [`fetch`] | Blocking HTTP fetch with a timeout, behind a trait seam |
//! | [`html`] | DataFrame tables and HTML to markdown |
//! | [`latex`] | LaTeX to unicode transliteration |
//! | [`link`] | Hyperlink rows backed by temporary files |
//! | [`markdown`] | Markdown documents with custom headings, lists and images |
//! | [`splice`] | Tables and display math cut out of markdown |
//! | [`syntax`] | Lexers, themes and code blocks |

#![forbid(unsafe_code)]

pub mod drawing;
pub mod fetch;
pub mod html;
pub mod latex;
pub mod link;
pub mod markdown;
pub mod splice;
pub mod syntax;

pub use drawing::{Drawing, DrawingEngine, DrawingRequest, draw_image};
pub use fetch::{Fetch, FetchError, HttpFetcher, OfflineFetcher};
pub use html::{DataFrameKind, dataframe_kind, dataframe_table, has_custom_repr, html_to_markdown};
pub use latex::latex_to_unicode;
pub use link::{Hyperlink, LinkKind, LinkOptions};
pub use markdown::{Markdown, MarkdownRenderer};
pub use splice::{Segment, SegmentKind, SplicedMarkdown, render_markdown, splice};
pub use syntax::{CodeBlock, Highlighter, LexerRegistry, default_lexer_name};
