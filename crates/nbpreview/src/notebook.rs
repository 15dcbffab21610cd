#![forbid(unsafe_code)]

//! Notebook orchestration.
//!
//! [`NotebookRenderer`] owns everything one render needs: the frozen flags,
//! the highlighter, the drawing cache and the fetcher. It walks the cells in
//! document order and lays their rows out in a [`Grid`].
//!
//! # Example
//!
//! ```
//! use nbpreview::NotebookRenderer;
//! use nbpreview_core::{Notebook, RenderFeatureFlags};
//!
//! let notebook: Notebook = r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
//!     "cells": [{"cell_type": "markdown", "metadata": {}, "source": "hello"}]}"#
//!     .parse()
//!     .unwrap();
//! let renderer = NotebookRenderer::new(RenderFeatureFlags::plain_text(20));
//! let mut out = Vec::new();
//! renderer.print(&notebook, &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap().trim_end(), "hello");
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use nbpreview_core::{Notebook, RenderFeatureFlags};
use nbpreview_extras::drawing::DrawingEngine;
use nbpreview_extras::fetch::{Fetch, HttpFetcher};
use nbpreview_extras::syntax::Highlighter;
use nbpreview_render::{Column, Console, ConsoleOptions, Grid, Justify, Renderable};

use crate::compose::{CellRow, Composer, Indicator};

/// Renders whole notebooks under one set of flags.
pub struct NotebookRenderer {
    flags: RenderFeatureFlags,
    highlighter: Highlighter,
    engine: Rc<DrawingEngine>,
    fetcher: Box<dyn Fetch>,
    temp_dir: Option<PathBuf>,
}

impl NotebookRenderer {
    /// A renderer that fetches remote assets over HTTP.
    #[must_use]
    pub fn new(flags: RenderFeatureFlags) -> Self {
        Self {
            highlighter: Highlighter::new(flags.theme),
            flags,
            engine: Rc::new(DrawingEngine::new()),
            fetcher: Box::new(HttpFetcher::new()),
            temp_dir: None,
        }
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Write link targets under `dir` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn flags(&self) -> &RenderFeatureFlags {
        &self.flags
    }

    /// The drawing cache shared by every image in every render.
    #[must_use]
    pub fn engine(&self) -> &DrawingEngine {
        &self.engine
    }

    /// Every row of `notebook`, in document order.
    #[must_use]
    pub fn rows(&self, notebook: &Notebook) -> Vec<CellRow> {
        let composer = Composer::new(
            &self.flags,
            &self.highlighter,
            Rc::clone(&self.engine),
            &*self.fetcher,
            &notebook.language,
        )
        .temp_dir(self.temp_dir.clone());
        let rows: Vec<CellRow> = notebook
            .cells
            .iter()
            .flat_map(|cell| composer.cell_rows(cell))
            .collect();
        tracing::debug!(
            cells = notebook.cells.len(),
            rows = rows.len(),
            language = %notebook.language,
            "composed notebook"
        );
        rows
    }

    /// The laid out notebook: indicator and content columns, or content
    /// only in plain mode.
    #[must_use]
    pub fn render(&self, notebook: &Notebook) -> Grid {
        let mut grid = Grid::new();
        if !self.flags.plain {
            grid.add_column(Column::new().justify(Justify::Right));
        }
        grid.add_column(Column::new());
        for row in self.rows(notebook) {
            let cells: Vec<Box<dyn Renderable>> = if self.flags.plain {
                vec![row.content]
            } else {
                vec![Box::new(Indicator::new(row.indicator)), row.content]
            };
            grid.add_row(cells);
        }
        grid
    }

    /// Console settings matching the flags.
    #[must_use]
    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions::new(self.flags.width)
            .profile(self.flags.color_profile)
            .hyperlinks(self.flags.hyperlinks)
            .ascii_only(!self.flags.unicode)
            .height(self.flags.height)
    }

    /// Render `notebook` and write it to `writer`.
    pub fn print<W: Write>(&self, notebook: &Notebook, writer: W) -> io::Result<()> {
        let grid = self.render(notebook);
        let mut console = Console::new(writer, self.console_options());
        console.print(&grid)?;
        console.into_inner()?;
        let (hits, misses) = self.engine.stats();
        tracing::trace!(hits, misses, "drawing cache");
        Ok(())
    }
}

impl std::fmt::Debug for NotebookRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotebookRenderer")
            .field("flags", &self.flags)
            .field("engine", &self.engine)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use nbpreview_extras::fetch::OfflineFetcher;
    use nbpreview_text::strip_ansi;
    use serde_json::{Value, json};

    use super::*;

    fn notebook(cells: Value) -> Notebook {
        Notebook::from_value(json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {"kernelspec": {"language": "python"}},
            "cells": cells,
        }))
        .unwrap()
    }

    fn decorated(width: usize) -> RenderFeatureFlags {
        let mut flags = RenderFeatureFlags::plain_text(width);
        flags.plain = false;
        flags.unicode = true;
        flags.files = false;
        flags
    }

    fn output(renderer: &NotebookRenderer, notebook: &Notebook) -> Vec<String> {
        let mut out = Vec::new();
        renderer.print(notebook, &mut out).unwrap();
        strip_ansi(&String::from_utf8(out).unwrap())
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    #[test]
    fn indicators_sit_beside_the_panel() {
        let nb = notebook(json!([
            {"cell_type": "code", "execution_count": 1, "metadata": {}, "outputs": [], "source": "x"}
        ]));
        let renderer = NotebookRenderer::new(decorated(16)).with_fetcher(OfflineFetcher);
        assert_eq!(
            output(&renderer, &nb),
            vec![
                "     ╭─────────╮",
                "[1]: │ x       │",
                "     ╰─────────╯",
            ]
        );
    }

    #[test]
    fn rows_are_separated_by_one_blank_line() {
        let nb = notebook(json!([
            {"cell_type": "markdown", "metadata": {}, "source": "one"},
            {"cell_type": "markdown", "metadata": {}, "source": "two"}
        ]));
        let renderer = NotebookRenderer::new(RenderFeatureFlags::plain_text(20));
        assert_eq!(output(&renderer, &nb), vec!["one", "", "two"]);
    }

    #[test]
    fn unknown_cells_do_not_disturb_neighbours() {
        let nb = notebook(json!([
            {"cell_type": "markdown", "metadata": {}, "source": "before"},
            {"cell_type": "unknown", "metadata": {}, "source": "skipped"},
            {"cell_type": "markdown", "metadata": {}, "source": "after"}
        ]));
        let renderer = NotebookRenderer::new(RenderFeatureFlags::plain_text(20));
        assert_eq!(renderer.rows(&nb).len(), 2);
        assert_eq!(output(&renderer, &nb), vec!["before", "", "after"]);
    }

    #[test]
    fn console_options_follow_flags() {
        let mut flags = decorated(33);
        flags.unicode = false;
        flags.hyperlinks = true;
        let options = NotebookRenderer::new(flags).console_options();
        assert_eq!(options.width, 33);
        assert!(options.ascii_only);
        assert!(options.hyperlinks);
    }

    proptest::proptest! {
        #[test]
        fn rendered_lines_fit_the_width(
            width in 24usize..100,
            words in proptest::collection::vec("[a-z]{1,12}", 1..40),
        ) {
            let source = words.join(" ");
            let nb = notebook(json!([
                {"cell_type": "markdown", "metadata": {}, "source": source},
                {"cell_type": "code", "execution_count": 12, "metadata": {},
                 "outputs": [{"output_type": "stream", "name": "stdout", "text": source}],
                 "source": source}
            ]));
            let renderer = NotebookRenderer::new(decorated(width)).with_fetcher(OfflineFetcher);
            for line in output(&renderer, &nb) {
                proptest::prop_assert!(
                    nbpreview_text::display_width(&line) <= width,
                    "{line:?} wider than {width}"
                );
            }
        }
    }
}
