#![forbid(unsafe_code)]

//! Command-line arguments.
//!
//! Every option can also be set through an `NBPREVIEW_*` environment
//! variable. Paired switches (`--plain`/`--decorated`, `--color`/`--no-color`
//! and so on) are tri-state: neither given means "detect from the terminal".
//!
//! `-h` is `--hide-output`, so help is only available as `--help`.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use nbpreview_core::{ColorSystem, ImageDrawing, RenderOptions, Theme};

/// Render a Jupyter Notebook in the terminal.
#[derive(Debug, Clone, Parser)]
#[command(name = "nbpreview", version, about, disable_help_flag = true)]
pub struct Cli {
    /// A Jupyter Notebook file to render. Reads stdin when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Syntax highlighting theme: dark, light, monokai or material.
    #[arg(short, long, env = "NBPREVIEW_THEME")]
    pub theme: Option<Theme>,

    /// Preview every available theme and exit.
    #[arg(long)]
    pub list_themes: bool,

    /// Hide notebook outputs.
    #[arg(short = 'h', long, env = "NBPREVIEW_HIDE_OUTPUT")]
    pub hide_output: bool,

    /// Render without boxes or execution counts.
    #[arg(short, long, env = "NBPREVIEW_PLAIN", overrides_with = "decorated")]
    pub plain: bool,

    /// Force boxes and execution counts.
    #[arg(short, long, overrides_with = "plain")]
    pub decorated: bool,

    /// Force unicode characters.
    #[arg(short, long, env = "NBPREVIEW_UNICODE", overrides_with = "no_unicode")]
    pub unicode: bool,

    /// Use only ASCII characters.
    #[arg(short = 'x', long, overrides_with = "unicode")]
    pub no_unicode: bool,

    /// Use Nerd Font icons.
    #[arg(short, long, env = "NBPREVIEW_NERD_FONT")]
    pub nerd_font: bool,

    /// Do not write temporary files for previews.
    #[arg(short = 'l', long, env = "NBPREVIEW_NO_FILES")]
    pub no_files: bool,

    /// Draw character images with dense glyphs for dark pixels.
    #[arg(short = 's', long, env = "NBPREVIEW_POSITIVE_SPACE")]
    pub positive_space: bool,

    /// Force terminal hyperlinks.
    #[arg(short = 'k', long, env = "NBPREVIEW_HYPERLINKS", overrides_with = "no_hyperlinks")]
    pub hyperlinks: bool,

    /// Never emit terminal hyperlinks.
    #[arg(short = 'r', long, overrides_with = "hyperlinks")]
    pub no_hyperlinks: bool,

    /// Hide the "Click to view" hints on hyperlinks.
    #[arg(short = 'y', long, env = "NBPREVIEW_HIDE_HYPERLINK_HINTS")]
    pub hide_hyperlink_hints: bool,

    /// Force image drawings.
    #[arg(short, long, env = "NBPREVIEW_IMAGES", overrides_with = "no_images")]
    pub images: bool,

    /// Never draw images.
    #[arg(short = 'e', long, overrides_with = "images")]
    pub no_images: bool,

    /// Image drawing style: block, character or braille.
    #[arg(long, visible_alias = "id", env = "NBPREVIEW_IMAGE_DRAWING")]
    pub image_drawing: Option<ImageDrawing>,

    /// Force color.
    #[arg(short, long, env = "NBPREVIEW_COLOR", overrides_with = "no_color")]
    pub color: bool,

    /// Disable color.
    #[arg(short = 'o', long, overrides_with = "color")]
    pub no_color: bool,

    /// Color system: standard, 256, truecolor, windows, none or auto.
    #[arg(long, visible_alias = "cs", env = "NBPREVIEW_COLOR_SYSTEM")]
    pub color_system: Option<ColorSystem>,

    /// Render width in columns. Defaults to the terminal width.
    #[arg(short, long, env = "NBPREVIEW_WIDTH")]
    pub width: Option<usize>,

    /// Show line numbers in code cells.
    #[arg(short = 'm', long, env = "NBPREVIEW_LINE_NUMBERS")]
    pub line_numbers: bool,

    /// Wrap long code lines instead of cropping them.
    #[arg(short = 'q', long, env = "NBPREVIEW_CODE_WRAP")]
    pub code_wrap: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// `Some(true)` for the on switch, `Some(false)` for the off switch.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Cli {
    /// The notebook path, or `None` for stdin.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }

    /// Name used in messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path()
            .map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string())
    }

    /// Render options for a notebook whose relative paths resolve against
    /// `relative_dir`.
    #[must_use]
    pub fn render_options(&self, relative_dir: PathBuf, no_color_env: bool) -> RenderOptions {
        let color = switch(self.color, self.no_color).or(no_color_env.then_some(false));
        RenderOptions {
            theme: self.theme.unwrap_or_default(),
            plain: switch(self.plain, self.decorated),
            unicode: switch(self.unicode, self.no_unicode),
            hide_output: self.hide_output,
            nerd_font: self.nerd_font,
            files: !self.no_files,
            negative_space: !self.positive_space,
            hyperlinks: switch(self.hyperlinks, self.no_hyperlinks),
            hide_hyperlink_hints: self.hide_hyperlink_hints,
            images: switch(self.images, self.no_images),
            image_drawing: self.image_drawing,
            color,
            color_system: self.color_system.unwrap_or_default(),
            width: self.width,
            line_numbers: self.line_numbers,
            code_wrap: self.code_wrap,
            relative_dir,
            characters: None,
        }
    }

    /// Directory that markdown image paths resolve against: the notebook's
    /// parent, or the working directory for stdin.
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        match self.path().and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}
