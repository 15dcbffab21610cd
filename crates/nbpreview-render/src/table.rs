#![forbid(unsafe_code)]

//! Column layouts: a borderless data [`Table`] and the two-column [`Grid`]
//! that lays out notebook rows.
//!
//! Both size columns the same way: every column starts at the widest
//! content it holds, and when the total overflows the available width the
//! widest column gives up one cell at a time until it reaches its minimum.

use nbpreview_style::Style;
use nbpreview_text::{Line, Text, TextMeasurement};

use crate::border::BorderChars;
use crate::renderable::{Justify, RenderContext, Renderable, align_line};

/// Shrink `widths` (never below `minimums`) until their sum fits `budget`.
fn collapse_widths(widths: &mut [usize], minimums: &[usize], budget: usize) {
    let mut total: usize = widths.iter().sum();
    while total > budget {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| **width > minimums[*index])
            .max_by_key(|(index, width)| (**width, usize::MAX - index))
            .map(|(index, _)| index);
        let Some(index) = widest else {
            break;
        };
        widths[index] -= 1;
        total -= 1;
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Column settings shared by [`Table`] and [`Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Column {
    pub justify: Justify,
    /// Lower bound on the column width; `None` lets content decide.
    pub min_width: Option<usize>,
}

impl Column {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            justify: Justify::Left,
            min_width: None,
        }
    }

    #[must_use]
    pub const fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    #[must_use]
    pub const fn min_width(mut self, width: usize) -> Self {
        self.min_width = Some(width);
        self
    }
}

/// A table row: one text per column, optionally closing a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Text>,
    end_section: bool,
}

impl Row {
    pub fn new(cells: impl IntoIterator<Item = impl Into<Text>>) -> Self {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
            end_section: false,
        }
    }

    /// Draw a rule under this row.
    #[must_use]
    pub fn end_section(mut self, end: bool) -> Self {
        self.end_section = end;
        self
    }

    #[must_use]
    pub fn cells(&self) -> &[Text] {
        &self.cells
    }

    #[must_use]
    pub fn is_end_section(&self) -> bool {
        self.end_section
    }
}

/// A table drawn with horizontal section rules only: no outer edge, no
/// vertical lines, one space of padding on each side of every cell and a
/// space between columns.
///
/// Cells never wrap; over-wide content is cut with `…`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    rule_style: Option<Style>,
}

/// Padding on either side of a cell.
const CELL_PADDING: usize = 1;
/// Divider between two columns.
const COLUMN_DIVIDER: usize = 1;

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Append a row. Cells beyond the defined columns add new
    /// left-justified columns.
    pub fn add_row(&mut self, row: Row) {
        while self.columns.len() < row.cells.len() {
            self.columns.push(Column::new());
        }
        self.rows.push(row);
    }

    #[must_use]
    pub fn rule_style(mut self, style: Style) -> Self {
        self.rule_style = Some(style);
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mark the most recently added row as the end of a section.
    pub fn end_section(&mut self) {
        if let Some(row) = self.rows.last_mut() {
            row.end_section = true;
        }
    }

    fn chrome(&self) -> usize {
        let n = self.columns.len();
        n * CELL_PADDING * 2 + n.saturating_sub(1) * COLUMN_DIVIDER
    }

    /// Natural (widest content) and minimum width for each column.
    fn column_bounds(&self) -> (Vec<usize>, Vec<usize>) {
        let mut widest = vec![0; self.columns.len()];
        for row in &self.rows {
            for (index, cell) in row.cells.iter().enumerate() {
                widest[index] = widest[index].max(cell.width());
            }
        }
        let minimums = self
            .columns
            .iter()
            .zip(&widest)
            .map(|(column, widest)| column.min_width.unwrap_or(0).min(*widest))
            .collect();
        (widest, minimums)
    }

    fn render_row(&self, row: &Row, widths: &[usize]) -> Vec<Line> {
        let height = row.cells.iter().map(Text::height).max().unwrap_or(1).max(1);
        (0..height)
            .map(|line_index| {
                let mut line = Line::new();
                for (index, (column, width)) in self.columns.iter().zip(widths).enumerate() {
                    if index > 0 {
                        line.extend(Line::blank(COLUMN_DIVIDER, None));
                    }
                    let content = row
                        .cells
                        .get(index)
                        .and_then(|cell| cell.lines().get(line_index))
                        .map(|line| line.truncated(*width, Some("…")))
                        .unwrap_or_default();
                    line.extend(Line::blank(CELL_PADDING, None));
                    line.extend(align_line(content, *width, column.justify, None));
                    line.extend(Line::blank(CELL_PADDING, None));
                }
                line
            })
            .collect()
    }
}

impl Renderable for Table {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        if self.columns.is_empty() {
            return Vec::new();
        }
        let (mut widths, minimums) = self.column_bounds();
        collapse_widths(&mut widths, &minimums, ctx.width.saturating_sub(self.chrome()));
        let table_width = widths.iter().sum::<usize>() + self.chrome();

        let rule = BorderChars::SQUARE
            .or_ascii(ctx.ascii_only)
            .horizontal_run(table_width);
        let mut lines = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            lines.extend(self.render_row(row, &widths));
            if row.end_section && index + 1 < self.rows.len() {
                lines.push(match self.rule_style {
                    Some(style) => Line::styled(rule.clone(), style),
                    None => Line::raw(rule.clone()),
                });
            }
        }
        lines
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        let (widest, minimums) = self.column_bounds();
        let chrome = self.chrome();
        TextMeasurement {
            minimum: minimums.iter().sum::<usize>() + chrome,
            maximum: widest.iter().sum::<usize>() + chrome,
        }
        .clamp(None, Some(ctx.width))
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Borderless rows of renderables.
///
/// Columns are separated by a one-cell gutter and rows by one blank line;
/// nothing is added at the outer edges. Each column is as wide as the
/// widest measured cell in it, so a full-width cell (markdown) makes its
/// column take the remaining width.
#[derive(Default)]
pub struct Grid {
    columns: Vec<Column>,
    rows: Vec<Vec<Box<dyn Renderable>>>,
}

const GUTTER: usize = 1;
const ROW_GAP: usize = 1;

impl Grid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Append a row. Missing trailing cells render empty.
    pub fn add_row(&mut self, cells: Vec<Box<dyn Renderable>>) {
        while self.columns.len() < cells.len() {
            self.columns.push(Column::new());
        }
        self.rows.push(cells);
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn gutters(&self) -> usize {
        self.columns.len().saturating_sub(1) * GUTTER
    }

    fn column_measurements(&self, ctx: &RenderContext) -> Vec<TextMeasurement> {
        let mut measurements = vec![TextMeasurement::ZERO; self.columns.len()];
        let cell_ctx = ctx.with_width(ctx.width.saturating_sub(self.gutters()));
        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                measurements[index] = measurements[index].union(cell.measure(&cell_ctx));
            }
        }
        measurements
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl Renderable for Grid {
    fn render(&self, ctx: &RenderContext) -> Vec<Line> {
        let measurements = self.column_measurements(ctx);
        let mut widths: Vec<usize> = measurements.iter().map(|m| m.maximum).collect();
        let minimums: Vec<usize> = self
            .columns
            .iter()
            .zip(&measurements)
            .map(|(column, m)| column.min_width.unwrap_or(m.minimum).min(m.maximum))
            .collect();
        collapse_widths(&mut widths, &minimums, ctx.width.saturating_sub(self.gutters()));

        let mut lines = Vec::new();
        for (row_index, row) in self.rows.iter().enumerate() {
            if row_index > 0 {
                lines.extend(std::iter::repeat_n(Line::new(), ROW_GAP));
            }
            let rendered: Vec<Vec<Line>> = widths
                .iter()
                .enumerate()
                .map(|(index, width)| {
                    row.get(index)
                        .map(|cell| cell.render(&ctx.with_width(*width)))
                        .unwrap_or_default()
                })
                .collect();
            let height = rendered.iter().map(Vec::len).max().unwrap_or(0);
            for line_index in 0..height {
                let mut line = Line::new();
                for (index, (column, width)) in self.columns.iter().zip(&widths).enumerate() {
                    if index > 0 {
                        line.extend(Line::blank(GUTTER, None));
                    }
                    let cell_line = rendered[index]
                        .get(line_index)
                        .cloned()
                        .unwrap_or_default();
                    line.extend(align_line(cell_line, *width, column.justify, None));
                }
                lines.push(line);
            }
        }
        lines
    }

    fn measure(&self, ctx: &RenderContext) -> TextMeasurement {
        self.column_measurements(ctx)
            .into_iter()
            .fold(TextMeasurement::exact(self.gutters()), TextMeasurement::stack)
            .clamp(None, Some(ctx.width))
    }
}
