#![forbid(unsafe_code)]

//! Core: everything decided before anything is drawn.
//!
//! - [`TerminalCapabilities`] describes the output stream.
//! - [`RenderOptions`] is what the caller asked for.
//! - [`RenderFeatureFlags`] freezes the two into one configuration per
//!   render.
//! - [`Notebook`] is the loaded document.

pub mod capabilities;
pub mod error;
pub mod flags;
pub mod notebook;
pub mod options;

pub use capabilities::{DetectInputs, TerminalCapabilities, is_truthy};
pub use error::{ConfigError, NotebookError};
pub use flags::{DEFAULT_WIDTH, RenderFeatureFlags};
pub use notebook::{Cell, DEFAULT_LANGUAGE, MimeBundle, Notebook, Output, is_json_mime};
pub use options::{ColorSystem, ImageDrawing, RenderOptions, Theme};
