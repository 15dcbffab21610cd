#![forbid(unsafe_code)]

//! Output variant resolution.
//!
//! A rich output's MIME bundle resolves to at most one main variant and at
//! most one link variant. Both are plain data; the composer turns them into
//! renderables. Resolution never fails: a bundle nothing recognizes resolves
//! to nothing.
//!
//! # Main Variant Precedence
//!
//! | Step | Condition | Variant |
//! |------|-----------|---------|
//! | 1 | images on, a drawing strategy applies, a bitmap MIME type present | [`MainVariant::Drawing`] |
//! | 2 | not plain, `text/html` is a DataFrame | [`MainVariant::DataFrame`] |
//! | 2 | not plain, `text/html` without a custom plain repr | [`MainVariant::Html`] |
//! | 3 | `text/markdown` | [`MainVariant::Markdown`] |
//! | 4 | `text/latex`, unicode on | [`MainVariant::Latex`] |
//! | 5 | `application/json` | [`MainVariant::Json`] |
//! | 6 | `application/pdf`, unicode or nerd font on | [`MainVariant::Pdf`] |
//! | 7 | `text/plain` | [`MainVariant::PlainText`] |
//!
//! The link variant is Vega, then image, then HTML, independent of the
//! main variant.

use nbpreview_core::{ImageDrawing, MimeBundle, RenderFeatureFlags};
use nbpreview_extras::drawing::{decode_base64, strategy_applies};
use nbpreview_extras::fetch::Fetch;
use nbpreview_extras::html::{dataframe_kind, dataframe_table, has_custom_repr, html_to_markdown};
use nbpreview_extras::link::{Hyperlink, LinkOptions};
use nbpreview_render::Table;

/// Bitmap types the drawing engine accepts, in lookup order. SVG is only
/// ever linked.
pub const DRAWABLE_MIME_TYPES: [&str; 4] = ["image/bmp", "image/gif", "image/jpeg", "image/png"];

/// Fallback text for drawings without a `text/plain` entry.
pub const DEFAULT_IMAGE_TEXT: &str = "Image";

/// What an output shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainVariant {
    Drawing {
        mime: &'static str,
        /// Decoded bytes; empty when the payload was not base64.
        image: Vec<u8>,
        strategy: ImageDrawing,
        fallback: String,
    },
    DataFrame(Table),
    /// HTML converted to markdown.
    Html(String),
    Markdown(String),
    Latex(String),
    /// Pretty-printed JSON.
    Json(String),
    Pdf,
    PlainText(String),
}

impl MainVariant {
    /// Short name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Drawing { .. } => "drawing",
            Self::DataFrame(_) => "dataframe",
            Self::Html(_) => "html",
            Self::Markdown(_) => "markdown",
            Self::Latex(_) => "latex",
            Self::Json(_) => "json",
            Self::Pdf => "pdf",
            Self::PlainText(_) => "plain",
        }
    }
}

/// The resolution of one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolved {
    pub main: Option<MainVariant>,
    pub link: Option<Hyperlink>,
}

impl Resolved {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.link.is_none()
    }
}

/// Resolve both variants of `bundle`.
///
/// `indicator` is the execution indicator text, embedded in Vega pages.
#[must_use]
pub fn resolve(
    bundle: &MimeBundle,
    flags: &RenderFeatureFlags,
    link_options: LinkOptions,
    fetcher: &dyn Fetch,
    indicator: &str,
) -> Resolved {
    let main = resolve_main(bundle, flags);
    let link = resolve_link(bundle, link_options, fetcher, indicator);
    tracing::trace!(
        main = main.as_ref().map(MainVariant::name),
        link = link.as_ref().map(|link| link.kind().subject()),
        "resolved output"
    );
    Resolved { main, link }
}

/// The main variant, first match wins.
#[must_use]
pub fn resolve_main(bundle: &MimeBundle, flags: &RenderFeatureFlags) -> Option<MainVariant> {
    if let Some(drawing) = resolve_drawing(bundle, flags) {
        return Some(drawing);
    }

    if !flags.plain
        && let Some(html) = bundle.text("text/html")
    {
        if let Some(kind) = dataframe_kind(html) {
            if let Some(table) = dataframe_table(html, kind) {
                return Some(MainVariant::DataFrame(table));
            }
            tracing::debug!(?kind, "dataframe table could not be parsed; showing html");
            return Some(MainVariant::Html(html_to_markdown(html)));
        }
        if !has_custom_repr(bundle) {
            return Some(MainVariant::Html(html_to_markdown(html)));
        }
    }

    if let Some(markdown) = bundle.text("text/markdown") {
        return Some(MainVariant::Markdown(markdown.to_string()));
    }
    if flags.unicode
        && let Some(latex) = bundle.text("text/latex")
    {
        return Some(MainVariant::Latex(latex.to_string()));
    }
    if let Some(value) = bundle.get("application/json") {
        let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        return Some(MainVariant::Json(json));
    }
    if (flags.unicode || flags.nerd_font) && bundle.contains("application/pdf") {
        return Some(MainVariant::Pdf);
    }
    bundle
        .text("text/plain")
        .map(|text| MainVariant::PlainText(text.to_string()))
}

fn resolve_drawing(bundle: &MimeBundle, flags: &RenderFeatureFlags) -> Option<MainVariant> {
    if !flags.images {
        return None;
    }
    let strategy = flags
        .image_drawing
        .filter(|&strategy| strategy_applies(strategy, flags.unicode, flags.color))?;
    let mime = DRAWABLE_MIME_TYPES
        .into_iter()
        .find(|mime| bundle.contains(mime))?;
    let image = match bundle.text(mime).map(decode_base64) {
        Some(Ok(bytes)) => bytes,
        Some(Err(error)) => {
            tracing::debug!(mime, %error, "image data is not base64");
            Vec::new()
        }
        None => Vec::new(),
    };
    let fallback = bundle
        .text("text/plain")
        .unwrap_or(DEFAULT_IMAGE_TEXT)
        .to_string();
    Some(MainVariant::Drawing {
        mime,
        image,
        strategy,
        fallback,
    })
}

/// The link variant: Vega, then image, then HTML.
#[must_use]
pub fn resolve_link(
    bundle: &MimeBundle,
    options: LinkOptions,
    fetcher: &dyn Fetch,
    indicator: &str,
) -> Option<Hyperlink> {
    Hyperlink::vega(bundle, indicator, fetcher, options.clone())
        .or_else(|| Hyperlink::image(bundle, options.clone()))
        .or_else(|| Hyperlink::html(bundle, options))
}

#[cfg(test)]
mod tests {
    use nbpreview_extras::fetch::OfflineFetcher;
    use nbpreview_extras::link::LinkKind;
    use serde_json::json;

    use super::*;

    const PNG_1PX: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn terminal_flags() -> RenderFeatureFlags {
        let mut flags = RenderFeatureFlags::plain_text(80);
        flags.plain = false;
        flags.unicode = true;
        flags.images = true;
        flags.color = true;
        flags.image_drawing = Some(ImageDrawing::Block);
        flags
    }

    fn main_of(bundle: &MimeBundle, flags: &RenderFeatureFlags) -> Option<&'static str> {
        resolve_main(bundle, flags).as_ref().map(MainVariant::name)
    }

    fn link_kind(bundle: &MimeBundle) -> Option<LinkKind> {
        resolve_link(bundle, LinkOptions::default(), &OfflineFetcher, "").map(|link| link.kind())
    }

    #[test]
    fn markdown_beats_plain_text() {
        let bundle = MimeBundle::from([
            ("text/plain", json!("plain")),
            ("text/markdown", json!("**md**")),
        ]);
        assert_eq!(
            resolve_main(&bundle, &terminal_flags()),
            Some(MainVariant::Markdown("**md**".to_string()))
        );
    }

    #[test]
    fn latex_needs_unicode() {
        let bundle = MimeBundle::from([
            ("text/latex", json!("$x$")),
            ("application/json", json!({"a": 1})),
            ("text/plain", json!("x")),
        ]);
        let mut flags = terminal_flags();
        assert_eq!(main_of(&bundle, &flags), Some("latex"));
        flags.unicode = false;
        assert_eq!(main_of(&bundle, &flags), Some("json"));
    }

    #[test]
    fn json_is_pretty_printed() {
        let bundle = MimeBundle::from([("application/json", json!({"a": [1, 2]}))]);
        let Some(MainVariant::Json(json)) = resolve_main(&bundle, &terminal_flags()) else {
            panic!("expected json");
        };
        assert!(json.contains("\"a\": [\n"));
    }

    #[test]
    fn pdf_needs_a_glyph() {
        let bundle = MimeBundle::from([("application/pdf", json!("JVBERi0="))]);
        let mut flags = terminal_flags();
        assert_eq!(main_of(&bundle, &flags), Some("pdf"));
        flags.unicode = false;
        assert_eq!(main_of(&bundle, &flags), None);
        flags.nerd_font = true;
        assert_eq!(main_of(&bundle, &flags), Some("pdf"));
    }

    #[test]
    fn images_win_when_enabled() {
        let bundle = MimeBundle::from([
            ("image/png", json!(PNG_1PX)),
            ("text/plain", json!("<Figure>")),
        ]);
        let Some(MainVariant::Drawing {
            mime,
            image,
            fallback,
            ..
        }) = resolve_main(&bundle, &terminal_flags())
        else {
            panic!("expected a drawing");
        };
        assert_eq!(mime, "image/png");
        assert!(image.starts_with(b"\x89PNG"));
        assert_eq!(fallback, "<Figure>");
    }

    #[test]
    fn images_fall_through_when_disabled_or_inapplicable() {
        let bundle = MimeBundle::from([
            ("image/png", json!(PNG_1PX)),
            ("text/plain", json!("fig")),
        ]);
        let mut flags = terminal_flags();
        flags.images = false;
        assert_eq!(main_of(&bundle, &flags), Some("plain"));

        let mut flags = terminal_flags();
        flags.color = false;
        assert_eq!(main_of(&bundle, &flags), Some("plain"));
        flags.image_drawing = Some(ImageDrawing::Character);
        assert_eq!(main_of(&bundle, &flags), Some("drawing"));
    }

    #[test]
    fn svg_is_never_drawn() {
        let bundle = MimeBundle::from([("image/svg+xml", json!("<svg/>"))]);
        assert_eq!(main_of(&bundle, &terminal_flags()), None);
        assert_eq!(link_kind(&bundle), Some(LinkKind::Image));
    }

    #[test]
    #[tracing_test::traced_test]
    fn bad_base64_is_logged() {
        let bundle = MimeBundle::from([("image/gif", json!("not base64!"))]);
        assert_eq!(main_of(&bundle, &terminal_flags()), Some("drawing"));
        assert!(logs_contain("image data is not base64"));
    }

    #[test]
    fn bad_base64_still_draws_the_fallback() {
        let bundle = MimeBundle::from([("image/png", json!("***"))]);
        let Some(MainVariant::Drawing {
            image, fallback, ..
        }) = resolve_main(&bundle, &terminal_flags())
        else {
            panic!("expected a drawing");
        };
        assert!(image.is_empty());
        assert_eq!(fallback, DEFAULT_IMAGE_TEXT);
    }

    #[test]
    fn dataframes_become_tables() {
        let html = r#"<table class="dataframe"><thead><tr><th>a</th></tr></thead>
<tbody><tr><td>1</td></tr></tbody></table>"#;
        let bundle = MimeBundle::from([
            ("text/html", json!(html)),
            ("text/plain", json!("   a\n0  1")),
        ]);
        assert_eq!(main_of(&bundle, &terminal_flags()), Some("dataframe"));
        assert_eq!(link_kind(&bundle), Some(LinkKind::Html));
    }

    #[test]
    fn html_needs_a_default_repr() {
        let mut bundle = MimeBundle::from([
            ("text/html", json!("<b>bold</b>")),
            ("text/plain", json!("<IPython.core.display.HTML object>")),
        ]);
        assert_eq!(main_of(&bundle, &terminal_flags()), Some("html"));

        bundle = MimeBundle::from([
            ("text/html", json!("<b>bold</b>")),
            ("text/plain", json!("custom")),
        ]);
        assert_eq!(main_of(&bundle, &terminal_flags()), Some("plain"));
    }

    #[test]
    fn plain_mode_skips_html() {
        let bundle = MimeBundle::from([("text/html", json!("<b>bold</b>"))]);
        let mut flags = terminal_flags();
        flags.plain = true;
        assert_eq!(main_of(&bundle, &flags), None);
    }

    #[test]
    fn unknown_bundles_resolve_to_nothing() {
        let bundle = MimeBundle::from([("application/x-custom", json!("?"))]);
        let resolved = resolve(
            &bundle,
            &terminal_flags(),
            LinkOptions::default(),
            &OfflineFetcher,
            "",
        );
        assert!(resolved.is_empty());
    }

    #[test]
    fn vega_links_win() {
        let bundle = MimeBundle::from([
            ("application/vnd.vegalite.v4+json", json!({"mark": "bar"})),
            ("image/png", json!(PNG_1PX)),
            ("text/html", json!("<div></div>")),
        ]);
        assert_eq!(link_kind(&bundle), Some(LinkKind::Vega));
    }

    #[test]
    fn image_links_beat_html_links() {
        let bundle = MimeBundle::from([
            ("image/png", json!(PNG_1PX)),
            ("text/html", json!("<div></div>")),
        ]);
        assert_eq!(link_kind(&bundle), Some(LinkKind::Image));
    }
}
