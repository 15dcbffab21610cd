//! Caller-facing render options.
//!
//! Every field that can be auto-detected is an `Option`: `None` defers to
//! terminal detection in [`RenderFeatureFlags::resolve`](crate::RenderFeatureFlags::resolve).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use nbpreview_style::ColorProfile;

use crate::error::ConfigError;

/// How images are drawn as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageDrawing {
    /// Upper half blocks, two pixels per cell.
    Block,
    /// Brightness gradient characters.
    Character,
    /// Braille dot patterns, eight pixels per cell.
    Braille,
}

impl ImageDrawing {
    pub const ALL: [Self; 3] = [Self::Block, Self::Character, Self::Braille];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Character => "character",
            Self::Braille => "braille",
        }
    }
}

impl fmt::Display for ImageDrawing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageDrawing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|drawing| drawing.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownImageDrawing(s.to_string()))
    }
}

/// Requested color depth of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSystem {
    Standard,
    EightBit,
    TrueColor,
    Windows,
    None,
    /// Detect from the terminal.
    #[default]
    Auto,
}

impl ColorSystem {
    /// The profile to emit, or `None` to use the detected one.
    #[must_use]
    pub const fn profile(self) -> Option<ColorProfile> {
        match self {
            Self::Standard | Self::Windows => Some(ColorProfile::Ansi16),
            Self::EightBit => Some(ColorProfile::Ansi256),
            Self::TrueColor => Some(ColorProfile::TrueColor),
            Self::None => Some(ColorProfile::Mono),
            Self::Auto => None,
        }
    }
}

impl FromStr for ColorSystem {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "256" | "eight_bit" => Ok(Self::EightBit),
            "truecolor" => Ok(Self::TrueColor),
            "windows" => Ok(Self::Windows),
            "none" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::UnknownColorSystem(s.to_string())),
        }
    }
}

/// Syntax highlighting palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// ANSI colors tuned for dark backgrounds.
    #[default]
    AnsiDark,
    /// ANSI colors tuned for light backgrounds.
    AnsiLight,
    Monokai,
    Material,
}

impl Theme {
    pub const ALL: [Self; 4] = [Self::AnsiDark, Self::AnsiLight, Self::Monokai, Self::Material];

    /// The short name shown by `--list-themes`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnsiDark => "dark",
            Self::AnsiLight => "light",
            Self::Monokai => "monokai",
            Self::Material => "material",
        }
    }

    /// The alternate name, if the theme has one.
    #[must_use]
    pub const fn alias(self) -> Option<&'static str> {
        match self {
            Self::AnsiDark => Some("ansi_dark"),
            Self::AnsiLight => Some("ansi_light"),
            Self::Monokai | Self::Material => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|theme| theme.name() == wanted || theme.alias() == Some(wanted.as_str()))
            .ok_or_else(|| ConfigError::UnknownTheme(s.to_string()))
    }
}

/// Everything a caller can configure about a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub theme: Theme,
    /// Drop boxes and execution indicators. Detected: not a terminal.
    pub plain: Option<bool>,
    /// Allow non-ASCII glyphs. Detected: not a legacy/ASCII console.
    pub unicode: Option<bool>,
    pub hide_output: bool,
    pub nerd_font: bool,
    /// Write temporary files for hyperlink targets.
    pub files: bool,
    /// Dense glyphs for bright pixels when drawing characters and braille.
    pub negative_space: bool,
    /// Emit OSC 8 hyperlinks. Detected: not a legacy console.
    pub hyperlinks: Option<bool>,
    pub hide_hyperlink_hints: bool,
    /// Draw images. Detected: stdout is a terminal.
    pub images: Option<bool>,
    pub image_drawing: Option<ImageDrawing>,
    /// Color image drawings. Detected: stdout is a terminal.
    pub color: Option<bool>,
    pub color_system: ColorSystem,
    /// Render width. Detected: terminal width, else 80.
    pub width: Option<usize>,
    pub line_numbers: bool,
    pub code_wrap: bool,
    /// Directory that relative markdown image paths resolve against.
    pub relative_dir: PathBuf,
    /// Gradient for the character drawing, darkest to brightest.
    pub characters: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            plain: None,
            unicode: None,
            hide_output: false,
            nerd_font: false,
            files: true,
            negative_space: true,
            hyperlinks: None,
            hide_hyperlink_hints: false,
            images: None,
            image_drawing: None,
            color: None,
            color_system: ColorSystem::default(),
            width: None,
            line_numbers: false,
            code_wrap: false,
            relative_dir: PathBuf::from("."),
            characters: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_drawing_parses_case_insensitively() {
        assert_eq!("Braille".parse::<ImageDrawing>(), Ok(ImageDrawing::Braille));
        assert_eq!(
            "sixel".parse::<ImageDrawing>(),
            Err(ConfigError::UnknownImageDrawing("sixel".into()))
        );
    }

    #[test]
    fn theme_aliases() {
        assert_eq!("ansi_dark".parse::<Theme>(), Ok(Theme::AnsiDark));
        assert_eq!("light".parse::<Theme>(), Ok(Theme::AnsiLight));
        assert_eq!("MONOKAI".parse::<Theme>(), Ok(Theme::Monokai));
        assert!("solarized".parse::<Theme>().is_err());
    }

    #[test]
    fn color_system_profiles() {
        assert_eq!("256".parse::<ColorSystem>(), Ok(ColorSystem::EightBit));
        assert_eq!(ColorSystem::None.profile(), Some(ColorProfile::Mono));
        assert_eq!(ColorSystem::Auto.profile(), None);
        assert!("16".parse::<ColorSystem>().is_err());
    }

    #[test]
    fn defaults_write_files_with_negative_space() {
        let options = RenderOptions::default();
        assert!(options.files);
        assert!(options.negative_space);
        assert_eq!(options.plain, None);
    }
}
