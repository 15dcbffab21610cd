#![forbid(unsafe_code)]
//! End to end rendering of small notebooks through the console.
//!
//! Run:
//!   cargo test -p nbpreview --test render_notebooks

use std::fs;

use nbpreview::NotebookRenderer;
use nbpreview_core::{ImageDrawing, Notebook, RenderFeatureFlags};
use nbpreview_extras::fetch::OfflineFetcher;
use nbpreview_text::strip_ansi;
use serde_json::{Value, json};
use tempfile::TempDir;

const PNG_1PX: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn notebook(cells: Value) -> Notebook {
    Notebook::from_value(json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"kernelspec": {"language": "python", "name": "python3"}},
        "cells": cells,
    }))
    .unwrap()
}

fn decorated(width: usize) -> RenderFeatureFlags {
    let mut flags = RenderFeatureFlags::plain_text(width);
    flags.plain = false;
    flags.unicode = true;
    flags.hyperlinks = false;
    flags.files = false;
    flags.images = false;
    flags
}

fn raw_output(renderer: &NotebookRenderer, notebook: &Notebook) -> String {
    let mut out = Vec::new();
    renderer.print(notebook, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn lines(renderer: &NotebookRenderer, notebook: &Notebook) -> Vec<String> {
    strip_ansi(&raw_output(renderer, notebook))
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect()
}

fn code_cell(count: Option<i64>, source: &str, outputs: Value) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": count,
        "metadata": {},
        "outputs": outputs,
        "source": source,
    })
}

fn offline(flags: RenderFeatureFlags) -> NotebookRenderer {
    NotebookRenderer::new(flags).with_fetcher(OfflineFetcher)
}

#[test]
fn code_cell_with_stream_output() {
    let nb = notebook(json!([code_cell(
        Some(1),
        "print('hi')",
        json!([{"output_type": "stream", "name": "stdout", "text": "hi\n"}])
    )]));
    assert_eq!(
        lines(&offline(decorated(30)), &nb),
        vec![
            "     ╭───────────────────────╮",
            "[1]: │ print('hi')           │",
            "     ╰───────────────────────╯",
            "",
            "      hi",
        ]
    );
}

#[test]
fn plain_mode_is_undecorated() {
    let nb = notebook(json!([
        {"cell_type": "markdown", "metadata": {}, "source": "Some **bold** text"},
        code_cell(Some(2), "6 * 7", json!([
            {"output_type": "execute_result", "execution_count": 2, "metadata": {},
             "data": {"text/plain": "42"}}
        ]))
    ]));
    assert_eq!(
        lines(&offline(RenderFeatureFlags::plain_text(40)), &nb),
        vec!["Some bold text", "", "6 * 7", "", "42"]
    );
}

#[test]
fn markdown_tables_are_spliced() {
    let nb = notebook(json!([
        {"cell_type": "markdown", "metadata": {}, "source": "| a | b |\n|---|---|\n| 1 | 2 |"}
    ]));
    assert_eq!(
        lines(&offline(RenderFeatureFlags::plain_text(30)), &nb),
        vec![" a   b", "───────", " 1   2"]
    );
}

#[test]
fn vega_outputs_write_a_page() {
    let dir = TempDir::new().unwrap();
    let mut flags = decorated(80);
    flags.files = true;
    let nb = notebook(json!([code_cell(
        Some(3),
        "chart",
        json!([{"output_type": "display_data", "metadata": {},
                "data": {"application/vnd.vegalite.v4+json": {"mark": "bar"},
                         "text/plain": "<VegaLite 4 object>"}}])
    )]));
    let renderer = offline(flags).with_temp_dir(dir.path());
    let rendered = lines(&renderer, &nb);

    let pages: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    assert_eq!(pages.len(), 1);
    let page = fs::read_to_string(&pages[0]).unwrap();
    assert!(page.contains(r#"{"mark":"bar"}"#));
    assert!(page.contains("vegachart"));

    let link = rendered
        .iter()
        .find(|line| line.contains("📊"))
        .expect("link row");
    assert!(link.contains(&pages[0].display().to_string()));
}

#[test]
fn hyperlinks_carry_osc8_targets() {
    let dir = TempDir::new().unwrap();
    let mut flags = decorated(80);
    flags.files = true;
    flags.hyperlinks = true;
    let nb = notebook(json!([code_cell(
        None,
        "chart",
        json!([{"output_type": "display_data", "metadata": {},
                "data": {"application/vnd.vega.v5+json": {"marks": []}}}])
    )]));
    let out = raw_output(&offline(flags).with_temp_dir(dir.path()), &nb);
    assert!(out.contains("\u{1b}]8;"));
    assert!(out.contains("file://"));
    assert!(strip_ansi(&out).contains("📊 Click to view Vega chart"));
}

#[test]
fn files_disabled_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let nb = notebook(json!([code_cell(
        Some(1),
        "page",
        json!([{"output_type": "display_data", "metadata": {},
                "data": {"text/html": "<p>hello</p>",
                         "text/plain": "<IPython.core.display.HTML object>"}}])
    )]));
    let rendered = lines(&offline(decorated(40)).with_temp_dir(dir.path()), &nb);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(rendered.iter().any(|line| line.trim() == "🌐 HTML"));
    assert!(rendered.iter().any(|line| line.trim() == "hello"));
}

#[test]
fn dataframes_render_as_tables() {
    let html = concat!(
        r#"<table border="1" class="dataframe"><thead><tr style="text-align: right;">"#,
        "<th></th><th>col</th></tr></thead>",
        "<tbody><tr><th>0</th><td>10</td></tr><tr><th>1</th><td>20</td></tr></tbody></table>"
    );
    let nb = notebook(json!([code_cell(
        Some(5),
        "df",
        json!([{"output_type": "execute_result", "execution_count": 5, "metadata": {},
                "data": {"text/html": html, "text/plain": "   col\n0   10\n1   20"}}])
    )]));
    let rendered = lines(&offline(decorated(40)), &nb);
    let words: Vec<Vec<&str>> = rendered
        .iter()
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert!(words.contains(&vec!["[5]:", "🌐", "HTML"]));
    assert!(words.contains(&vec!["col"]));
    assert!(words.contains(&vec!["0", "10"]));
    assert!(words.contains(&vec!["1", "20"]));
    assert!(rendered.iter().any(|line| line.contains("───")));
}

#[test]
fn images_are_drawn_with_blocks() {
    let mut flags = decorated(20);
    flags.images = true;
    flags.color = true;
    flags.image_drawing = Some(ImageDrawing::Block);
    let nb = notebook(json!([code_cell(
        Some(1),
        "plot()",
        json!([{"output_type": "display_data", "metadata": {},
                "data": {"image/png": PNG_1PX, "text/plain": "<Figure>"}}])
    )]));
    let rendered = lines(&offline(flags), &nb);
    assert!(rendered.iter().any(|line| line.contains("🖼 Image")));
    assert!(rendered.iter().any(|line| line.contains('▀')));
    assert!(!rendered.iter().any(|line| line.contains("<Figure>")));
}

#[test]
fn undecodable_images_fall_back_to_text() {
    let mut flags = decorated(40);
    flags.images = true;
    flags.image_drawing = Some(ImageDrawing::Character);
    let nb = notebook(json!([code_cell(
        Some(1),
        "plot()",
        json!([{"output_type": "display_data", "metadata": {},
                "data": {"image/png": "bm90LWFuLWltYWdl", "text/plain": "<Figure size 10x10>"}}])
    )]));
    let rendered = lines(&offline(flags), &nb);
    assert!(rendered.iter().any(|line| line.trim() == "<Figure size 10x10>"));
}

#[test]
fn errors_and_stderr_in_plain_mode() {
    let nb = notebook(json!([code_cell(
        Some(1),
        "boom()",
        json!([
            {"output_type": "stream", "name": "stderr", "text": "warning\n"},
            {"output_type": "error", "ename": "NameError", "evalue": "boom",
             "traceback": ["\u{1b}[0;31mNameError\u{1b}[0m: name 'boom' is not defined"]}
        ])
    )]));
    assert_eq!(
        lines(&offline(RenderFeatureFlags::plain_text(60)), &nb),
        vec![
            "boom()",
            "",
            "",
            " warning",
            "",
            "NameError: name 'boom' is not defined",
        ]
    );
}

#[test]
fn hidden_outputs_and_unknown_cells() {
    let mut flags = RenderFeatureFlags::plain_text(40);
    flags.hide_output = true;
    let nb = notebook(json!([
        code_cell(Some(1), "x", json!([{"output_type": "stream", "name": "stdout", "text": "x"}])),
        {"cell_type": "mystery", "metadata": {}, "source": "?"},
        {"cell_type": "raw", "metadata": {}, "source": "raw"}
    ]));
    assert_eq!(lines(&offline(flags), &nb), vec!["x", "", "raw"]);
}

#[test]
fn drawings_are_cached_across_outputs() {
    let mut flags = decorated(20);
    flags.images = true;
    flags.color = true;
    flags.image_drawing = Some(ImageDrawing::Block);
    let output = json!({"output_type": "display_data", "metadata": {},
                        "data": {"image/png": PNG_1PX}});
    let nb = notebook(json!([code_cell(Some(1), "plot()", json!([output.clone(), output]))]));
    let renderer = offline(flags);
    let _ = raw_output(&renderer, &nb);
    let (hits, misses) = renderer.engine().stats();
    assert!(misses >= 1);
    assert!(hits >= 1);
}
