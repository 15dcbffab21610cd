#![forbid(unsafe_code)]

//! Render Jupyter notebooks in the terminal.
//!
//! The pipeline runs top to bottom:
//!
//! 1. [`NotebookRenderer`] walks the cells of a loaded
//!    [`Notebook`](nbpreview_core::Notebook).
//! 2. [`compose::Composer`] turns each cell into indicator/content rows.
//! 3. [`resolve::resolve`] picks what each rich output shows.
//! 4. The rows are laid out in a grid and written by the console.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Command-line arguments for the `nbpreview` binary |
//! | [`compose`] | Cell to row composition |
//! | [`notebook`] | The orchestrator |
//! | [`resolve`] | Output variant resolution |
//! | [`themes`] | Theme samples for `--list-themes` |

pub mod cli;
pub mod compose;
pub mod notebook;
pub mod resolve;
pub mod themes;

pub use compose::{CellRow, Composer};
pub use notebook::NotebookRenderer;
pub use resolve::{MainVariant, Resolved, resolve};
