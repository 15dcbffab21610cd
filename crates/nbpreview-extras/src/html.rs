#![forbid(unsafe_code)]

//! HTML outputs: DataFrame tables and markdown conversion.
//!
//! pandas renders DataFrames as `<table class="dataframe">`, or, for styled
//! frames, as a full document whose head holds a single stylesheet and whose
//! body ends with the table. Both become a [`Table`]; any other HTML is
//! converted to markdown and drawn by the markdown renderer.
//!
//! # Table layout
//!
//! - Header rows are bold and the last one closes a section.
//! - A cell spanning `n` columns yields `n - 1` blank cells followed by its
//!   text.
//! - A body cell spanning `n` rows leaves a blank placeholder in its column
//!   for the next `n - 1` rows.
//! - A header-only table gets one blank body row so its header rule shows.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use nbpreview_core::MimeBundle;
use nbpreview_render::{Column, Justify, Row, Table};
use nbpreview_style::Style;
use nbpreview_text::Text;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Narrowest a DataFrame column shrinks to when the terminal is tight.
pub const DATAFRAME_MIN_WIDTH: usize = 4;

/// A bare `<object at 0x…>` style repr, i.e. no custom text form.
static DEFAULT_REPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([^\s<>]|[^\S\n\v\f\r\x{2028}\x{2029}])+>$").expect("valid default repr regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFrameKind {
    /// A `<table class="dataframe">` fragment.
    Plain,
    /// A pandas `Styler` document.
    Styled,
}

/// Classify `html` as a DataFrame, or `None` for other HTML.
#[must_use]
pub fn dataframe_kind(html: &str) -> Option<DataFrameKind> {
    let document = Html::parse_document(html);
    let dataframe = Selector::parse(".dataframe").ok()?;
    if let Some(element) = document.select(&dataframe).next()
        && element.value().name() == "table"
    {
        return Some(DataFrameKind::Plain);
    }

    let head = Selector::parse("head").ok()?;
    let body = Selector::parse("body").ok()?;
    let head_children: Vec<ElementRef> = document
        .select(&head)
        .next()
        .map(child_elements)
        .unwrap_or_default();
    let body_children: Vec<ElementRef> = document
        .select(&body)
        .next()
        .map(child_elements)
        .unwrap_or_default();

    let [style] = head_children.as_slice() else {
        return None;
    };
    let is_stylesheet = style.value().name() == "style"
        && style.value().attrs().count() == 1
        && style.value().attr("type") == Some("text/css");
    let ends_with_table = body_children
        .last()
        .is_some_and(|last| last.value().name() == "table");
    (is_stylesheet && ends_with_table && body_children.len() <= 2).then_some(DataFrameKind::Styled)
}

fn child_elements(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap).collect()
}

fn children_named<'a>(element: ElementRef<'a>, names: &[&str]) -> Vec<ElementRef<'a>> {
    child_elements(element)
        .into_iter()
        .filter(|child| names.contains(&child.value().name()))
        .collect()
}

/// Rows of the `section` (`thead` or `tbody`) of `table`.
fn section_rows<'a>(table: ElementRef<'a>, section: &str) -> Vec<ElementRef<'a>> {
    children_named(table, &[section])
        .into_iter()
        .flat_map(|section| children_named(section, &["tr"]))
        .collect()
}

fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// The text of one `th`/`td` preceded by the blanks of its colspan.
fn spanned_cell(cell: ElementRef<'_>) -> Vec<Text> {
    let colspan = span_attr(cell, "colspan");
    let content = cell.text().collect::<String>();
    let content = content.trim();
    let text = if cell.value().name() == "th" {
        Text::styled(content, Style::new().bold())
    } else {
        Text::raw(content)
    };
    let mut cells = vec![Text::new(); colspan - 1];
    cells.push(text);
    cells
}

/// Build the table for a DataFrame. `None` when the expected `<table>` is
/// missing.
#[must_use]
pub fn dataframe_table(html: &str, kind: DataFrameKind) -> Option<Table> {
    let document = Html::parse_document(html);
    let selector = match kind {
        DataFrameKind::Plain => Selector::parse("table.dataframe"),
        DataFrameKind::Styled => Selector::parse("body > table"),
    }
    .ok()?;
    let table_element = document.select(&selector).next()?;

    let mut rows: Vec<Row> = Vec::new();
    let header_rows = section_rows(table_element, "thead");
    let header_count = header_rows.len();
    for (index, header) in header_rows.into_iter().enumerate() {
        let cells: Vec<Text> = children_named(header, &["th", "td"])
            .into_iter()
            .flat_map(spanned_cell)
            .collect();
        rows.push(Row::new(cells).end_section(index + 1 == header_count));
    }

    // grid column -> rows still covered by a rowspan from above
    let mut carried: BTreeMap<usize, usize> = BTreeMap::new();
    for body_row in section_rows(table_element, "tbody") {
        let mut cells: Vec<Text> = Vec::new();
        let mut started: Vec<(usize, usize)> = Vec::new();
        for cell in children_named(body_row, &["th", "td"]) {
            while carried.contains_key(&cells.len()) {
                cells.push(Text::new());
            }
            let rowspan = span_attr(cell, "rowspan");
            let start = cells.len();
            cells.extend(spanned_cell(cell));
            if rowspan > 1 {
                started.extend((start..cells.len()).map(|column| (column, rowspan - 1)));
            }
        }
        if let Some((&last, _)) = carried.last_key_value()
            && last >= cells.len()
        {
            cells.resize(last + 1, Text::new());
        }
        carried.retain(|_, remaining| {
            *remaining -= 1;
            *remaining > 0
        });
        carried.extend(started);
        rows.push(Row::new(cells));
    }

    if rows.last().is_some_and(Row::is_end_section) {
        rows.push(Row::new([Text::new()]));
    }

    let column_count = rows.iter().map(|row| row.cells().len()).max().unwrap_or(0);
    let mut table = Table::new();
    for _ in 0..column_count {
        table.add_column(
            Column::new()
                .justify(Justify::Right)
                .min_width(DATAFRAME_MIN_WIDTH),
        );
    }
    for row in rows {
        table.add_row(row);
    }
    Some(table)
}

/// Whether the bundle's `text/plain` is a real representation rather than
/// a default `<...>` repr.
#[must_use]
pub fn has_custom_repr(bundle: &MimeBundle) -> bool {
    bundle
        .text("text/plain")
        .is_some_and(|plain| !DEFAULT_REPR.is_match(plain))
}

/// Convert HTML to markdown.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    html2md::parse_html(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbpreview_render::{RenderContext, Renderable};
    use serde_json::json;

    fn rendered(table: &Table, width: usize) -> Vec<String> {
        table
            .render(&RenderContext::new(width))
            .iter()
            .map(|line| line.to_plain_text().trim_end().to_string())
            .collect()
    }

    fn cell_texts(table: &Table) -> Vec<Vec<String>> {
        table
            .rows()
            .iter()
            .map(|row| row.cells().iter().map(Text::to_plain_text).collect())
            .collect()
    }

    const PLAIN: &str = r#"<div>
<table border="1" class="dataframe">
  <thead>
    <tr style="text-align: right;"><th></th><th>a</th><th>b</th></tr>
  </thead>
  <tbody>
    <tr><th>0</th><td>1</td><td>2</td></tr>
    <tr><th>1</th><td>3</td><td>4</td></tr>
  </tbody>
</table>
</div>"#;

    #[test]
    fn detects_plain_dataframes() {
        assert_eq!(dataframe_kind(PLAIN), Some(DataFrameKind::Plain));
        assert_eq!(dataframe_kind("<p>hello</p>"), None);
        assert_eq!(dataframe_kind(r#"<div class="dataframe">x</div>"#), None);
    }

    #[test]
    fn detects_styled_dataframes() {
        let styled = r#"<html><head><style type="text/css">td {}</style></head>
<body><table id="T_1"><thead><tr><th>a</th></tr></thead></table></body></html>"#;
        assert_eq!(dataframe_kind(styled), Some(DataFrameKind::Styled));

        let two_styles = r#"<html><head><style type="text/css"></style><style></style></head>
<body><table></table></body></html>"#;
        assert_eq!(dataframe_kind(two_styles), None);
    }

    #[test]
    fn plain_dataframe_table() {
        let table = dataframe_table(PLAIN, DataFrameKind::Plain).expect("table");
        assert_eq!(table.columns().len(), 3);
        assert!(table.rows()[0].is_end_section());
        assert_eq!(
            rendered(&table, 80),
            vec!["     a   b", "───────────", " 0   1   2", " 1   3   4"]
        );
    }

    #[test]
    fn header_cells_are_bold() {
        let table = dataframe_table(PLAIN, DataFrameKind::Plain).expect("table");
        let header = &table.rows()[0].cells()[1];
        let style = header.lines()[0].spans()[0].style.expect("styled");
        assert_eq!(style, Style::new().bold());
    }

    #[test]
    fn colspan_adds_blank_placeholders() {
        let html = r#"<table class="dataframe"><thead>
<tr><th colspan="2">wide</th><th>c</th></tr>
</thead><tbody><tr><td>1</td><td>2</td><td>3</td></tr></tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        assert_eq!(cell_texts(&table)[0], vec!["", "wide", "c"]);
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn rowspan_carries_placeholders() {
        let html = r#"<table class="dataframe"><tbody>
<tr><th rowspan="3">g</th><td>1</td></tr>
<tr><td>2</td></tr>
<tr><td>3</td></tr>
<tr><th>h</th><td>4</td></tr>
</tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        assert_eq!(
            cell_texts(&table),
            vec![
                vec!["g", "1"],
                vec!["", "2"],
                vec!["", "3"],
                vec!["h", "4"],
            ]
        );
    }

    #[test]
    fn nested_rowspans_keep_their_columns() {
        let html = r#"<table class="dataframe"><tbody>
<tr><th rowspan="4">A</th><th rowspan="2">x</th><td>1</td></tr>
<tr><td>2</td></tr>
<tr><th rowspan="2">y</th><td>3</td></tr>
<tr><td>4</td></tr>
</tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        assert_eq!(
            cell_texts(&table),
            vec![
                vec!["A", "x", "1"],
                vec!["", "", "2"],
                vec!["", "y", "3"],
                vec!["", "", "4"],
            ]
        );
    }

    #[test]
    fn trailing_rowspans_pad_short_rows() {
        let html = r#"<table class="dataframe"><tbody>
<tr><td>1</td><td rowspan="2">n</td></tr>
<tr><td>2</td></tr>
</tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        assert_eq!(cell_texts(&table), vec![vec!["1", "n"], vec!["2", ""]]);
    }

    #[test]
    fn header_only_tables_get_a_blank_row() {
        let html = r#"<table class="dataframe"><thead><tr><th>a</th><th>b</th></tr></thead>
<tbody></tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        assert_eq!(table.rows().len(), 2);
        assert_eq!(rendered(&table, 80).len(), 3);
    }

    #[test]
    fn narrow_columns_truncate() {
        let html = r#"<table class="dataframe"><tbody>
<tr><td>abcdefghij</td><td>klmnopqrst</td></tr></tbody></table>"#;
        let table = dataframe_table(html, DataFrameKind::Plain).expect("table");
        let lines = rendered(&table, 15);
        assert!(lines[0].contains('…'));
        assert!(lines[0].chars().count() <= 15);
    }

    #[test]
    fn missing_table_is_none() {
        assert!(dataframe_table("<p>no table</p>", DataFrameKind::Styled).is_none());
    }

    #[test]
    fn custom_repr_detection() {
        let bundle = MimeBundle::from([("text/plain", json!("<IPython.core.display.HTML object>"))]);
        assert!(!has_custom_repr(&bundle));
        let bundle = MimeBundle::from([("text/plain", json!("   a  b\n0  1  2"))]);
        assert!(has_custom_repr(&bundle));
        let bundle = MimeBundle::from([("text/html", json!("<b>x</b>"))]);
        assert!(!has_custom_repr(&bundle));
    }

    #[test]
    fn html_converts_to_markdown() {
        let markdown = html_to_markdown("<h1>Title</h1><p>Some <strong>bold</strong> text</p>");
        assert!(markdown.contains("Title"));
        assert!(markdown.contains("**bold**"));
    }
}
