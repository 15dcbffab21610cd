#![forbid(unsafe_code)]

//! Hyperlinks to auxiliary files.
//!
//! Outputs that the terminal cannot show faithfully (HTML, images, Vega
//! charts) get a link row pointing at a temporary file holding the content.
//! A [`Hyperlink`] is built from an output's MIME bundle and turned into a
//! single [`Line`] by [`Hyperlink::into_line`], which is the only place a
//! file is written.
//!
//! # Rendering
//!
//! | files | content | hyperlinks | line |
//! |-------|---------|------------|------|
//! | on | present | on | `icon + message`, link style, OSC 8 `file://path` |
//! | on | present | off | `icon + path` |
//! | off or absent | - | - | `icon + subject` |
//!
//! A failed write degrades to the last row.

use std::io::Write;
use std::path::{Path, PathBuf};

use nbpreview_core::{MimeBundle, RenderFeatureFlags};
use nbpreview_style::{Ansi16, Color, Style};
use nbpreview_text::{Line, Span};
use serde_json::Value;

use crate::drawing::decode_base64;
use crate::fetch::{Fetch, is_url};

/// Image MIME types in lookup order.
pub const IMAGE_MIME_TYPES: [&str; 5] = [
    "image/bmp",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
];

pub const VEGA_MIME: &str = "application/vnd.vega.v5+json";
pub const VEGA_LITE_MIME: &str = "application/vnd.vegalite.v4+json";

/// Style of clickable link text.
pub const LINK_STYLE: Style = Style::new().fg(Color::Ansi16(Ansi16::BrightBlue));

const VEGA_SCRIPTS: [&str; 4] = [
    "https://cdn.jsdelivr.net/npm/vega@5",
    "https://cdn.jsdelivr.net/npm/vega-lite@5",
    "https://cdn.jsdelivr.net/npm/vega-embed@6",
    "https://cdn.jsdelivr.net/gh/koaning/justcharts/justcharts.js",
];

// ---------------------------------------------------------------------------
// Kinds and icons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Html,
    Image,
    Pdf,
    Vega,
}

impl LinkKind {
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Image => "Image",
            Self::Pdf => "PDF",
            Self::Vega => "Vega chart",
        }
    }

    #[must_use]
    pub const fn nerd_font_icon(self) -> &'static str {
        match self {
            Self::Html => "\u{F13B}",
            Self::Image => "\u{F1C5}",
            Self::Pdf => "\u{F1C1}",
            Self::Vega => "\u{F080}",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Html => "🌐",
            Self::Image => "🖼",
            Self::Pdf => "📄",
            Self::Vega => "📊",
        }
    }

    /// Icon followed by a space, or empty when neither nerd font glyphs nor
    /// unicode are available.
    #[must_use]
    pub fn icon(self, nerd_font: bool, unicode: bool) -> String {
        if nerd_font {
            format!("{} ", self.nerd_font_icon())
        } else if unicode {
            format!("{} ", self.emoji())
        } else {
            String::new()
        }
    }
}

/// Link text: the click hint, or the subject when both hint and icon are
/// empty.
#[must_use]
pub fn hint_message(subject: &str, hide_hints: bool, icon: &str) -> String {
    if !hide_hints {
        format!("Click to view {subject}")
    } else if icon.is_empty() {
        subject.to_string()
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// The render flags that affect link rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkOptions {
    pub unicode: bool,
    pub hyperlinks: bool,
    pub nerd_font: bool,
    pub files: bool,
    pub hide_hyperlink_hints: bool,
    /// Where temporary files go; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
}

impl From<&RenderFeatureFlags> for LinkOptions {
    fn from(flags: &RenderFeatureFlags) -> Self {
        Self {
            unicode: flags.unicode,
            hyperlinks: flags.hyperlinks,
            nerd_font: flags.nerd_font,
            files: flags.files,
            hide_hyperlink_hints: flags.hide_hyperlink_hints,
            temp_dir: None,
        }
    }
}

/// Write `content` to a new, persisted temporary file ending in
/// `.{extension}`.
pub fn write_temp_file(
    content: &[u8],
    extension: &str,
    dir: Option<&Path>,
) -> std::io::Result<PathBuf> {
    let suffix = format!(".{extension}");
    let mut builder = tempfile::Builder::new();
    builder.prefix("nbpreview-").suffix(&suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(content)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|error| error.error)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Hyperlink
// ---------------------------------------------------------------------------

/// A link to content written out to a temporary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    kind: LinkKind,
    content: Option<Vec<u8>>,
    extension: String,
    options: LinkOptions,
}

impl Hyperlink {
    #[must_use]
    pub fn new(
        kind: LinkKind,
        content: Option<Vec<u8>>,
        extension: impl Into<String>,
        options: LinkOptions,
    ) -> Self {
        Self {
            kind,
            content,
            extension: extension.into(),
            options,
        }
    }

    /// Link to the bundle's `text/html`, if any.
    #[must_use]
    pub fn html(bundle: &MimeBundle, options: LinkOptions) -> Option<Self> {
        let value = bundle.get("text/html")?;
        let content = value.as_str().map(|html| html.as_bytes().to_vec());
        Some(Self::new(LinkKind::Html, content, "html", options))
    }

    /// Link to the first image in the bundle. SVG is written as-is, other
    /// formats are base64-decoded; undecodable data leaves no content.
    #[must_use]
    pub fn image(bundle: &MimeBundle, options: LinkOptions) -> Option<Self> {
        let mime = IMAGE_MIME_TYPES
            .into_iter()
            .find(|mime| bundle.contains(mime))?;
        let extension = if mime == "image/svg+xml" {
            "svg"
        } else {
            mime.rsplit('/').next().unwrap_or(mime)
        };
        let content = bundle.text(mime).and_then(|encoded| {
            if mime == "image/svg+xml" {
                return Some(encoded.as_bytes().to_vec());
            }
            decode_base64(encoded)
                .inspect_err(|error| tracing::debug!(mime, %error, "image data is not base64"))
                .ok()
        });
        Some(Self::new(LinkKind::Image, content, extension, options))
    }

    /// Link to a standalone HTML page embedding the bundle's Vega or
    /// Vega-Lite spec. The page is only built when files are enabled.
    #[must_use]
    pub fn vega(
        bundle: &MimeBundle,
        indicator: &str,
        fetcher: &dyn Fetch,
        options: LinkOptions,
    ) -> Option<Self> {
        let spec = bundle.get(VEGA_MIME).or_else(|| bundle.get(VEGA_LITE_MIME))?;
        let content = if options.files {
            let json = vega_json(spec, fetcher);
            (!json.is_empty()).then(|| vega_page(indicator, &json).into_bytes())
        } else {
            None
        };
        Some(Self::new(LinkKind::Vega, content, "html", options))
    }

    #[must_use]
    pub const fn kind(&self) -> LinkKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Write the temporary file (when enabled) and produce the link row.
    #[must_use]
    pub fn into_line(self) -> Line {
        let opts = &self.options;
        let subject = self.kind.subject();
        let icon = self.kind.icon(opts.nerd_font, opts.unicode);
        let fallback = || Line::raw(format!("{icon}{subject}"));

        let Some(content) = self.content.as_deref().filter(|_| opts.files) else {
            return fallback();
        };
        let path = match write_temp_file(content, &self.extension, opts.temp_dir.as_deref()) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(%error, subject, "could not write link target");
                return fallback();
            }
        };
        tracing::debug!(path = %path.display(), subject, "wrote link target");

        if opts.hyperlinks {
            let message = hint_message(subject, opts.hide_hyperlink_hints, &icon);
            let target = format!("file://{}", path.display());
            Line::from(Span::styled(format!("{icon}{message}"), LINK_STYLE).link(target))
        } else {
            Line::raw(format!("{icon}{}", path.display()))
        }
    }
}

/// The spec as JSON text. URLs are fetched; a failed fetch yields "".
fn vega_json(spec: &Value, fetcher: &dyn Fetch) -> String {
    match spec {
        Value::String(url) if is_url(url) => {
            String::from_utf8_lossy(&fetcher.fetch_or_empty(url)).into_owned()
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Standalone page rendering `json` with vega-embed.
#[must_use]
pub fn vega_page(indicator: &str, json: &str) -> String {
    let subject = LinkKind::Vega.subject();
    let title = if indicator.trim().is_empty() {
        subject.to_string()
    } else {
        format!("{} {subject}", indicator.trim())
    };
    let mut page = String::from("<html>\n<head>\n");
    for script in VEGA_SCRIPTS {
        page.push_str(&format!("    <script src=\"{script}\"></script>\n"));
    }
    page.push_str(&format!("    <title>{title}</title>\n</head>\n<body>\n"));
    page.push_str(&format!(
        "    <vegachart style=\"width: 100%\">\n        {json}\n    </vegachart>\n"
    ));
    page.push_str("</body>\n</html>\n");
    page
}
