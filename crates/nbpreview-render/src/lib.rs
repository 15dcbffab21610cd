#![forbid(unsafe_code)]

//! Render: the layout layer between styled text and the terminal.
//!
//! Everything displayable implements [`Renderable`], which turns a
//! [`RenderContext`] (available width, glyph policy) into styled lines and
//! reports a width [`TextMeasurement`](nbpreview_text::TextMeasurement) so
//! containers can size columns before rendering. The [`Console`] writes
//! rendered lines as SGR/OSC 8 escaped bytes for a given color profile.

pub mod ansi;
pub mod border;
pub mod console;
pub mod layout;
pub mod renderable;
pub mod table;

pub use border::BorderChars;
pub use console::{Console, ConsoleOptions};
pub use layout::{Padding, Panel, Rule, Sides};
pub use renderable::{Justify, Paragraph, RenderContext, Renderable, Stack, align_line};
pub use table::{Column, Grid, Row, Table};
