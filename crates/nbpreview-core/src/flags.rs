//! Per-render feature flags.
//!
//! [`RenderFeatureFlags::resolve`] combines caller options with detected
//! terminal capabilities exactly once. An explicit option always wins; only
//! unset options fall back to detection. The result is passed by reference
//! through every renderer and never mutated.

use std::path::PathBuf;

use nbpreview_style::ColorProfile;

use crate::capabilities::TerminalCapabilities;
use crate::options::{ImageDrawing, RenderOptions, Theme};

/// Width used when neither the caller nor the terminal provides one.
pub const DEFAULT_WIDTH: usize = 80;

/// Frozen configuration for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFeatureFlags {
    pub plain: bool,
    pub unicode: bool,
    pub hyperlinks: bool,
    pub images: bool,
    pub image_drawing: Option<ImageDrawing>,
    pub color: bool,
    pub nerd_font: bool,
    pub negative_space: bool,
    pub hide_hyperlink_hints: bool,
    pub hide_output: bool,
    pub files: bool,
    pub theme: Theme,
    pub line_numbers: bool,
    pub code_wrap: bool,
    pub relative_dir: PathBuf,
    pub characters: Option<String>,
    /// Console color depth.
    pub color_profile: ColorProfile,
    /// Render width in cells.
    pub width: usize,
    /// Height budget for image drawings.
    pub height: Option<usize>,
}

fn pick(option: Option<bool>, detected: bool) -> bool {
    option.unwrap_or(detected)
}

impl RenderFeatureFlags {
    #[must_use]
    pub fn resolve(options: &RenderOptions, caps: &TerminalCapabilities) -> Self {
        let plain = pick(options.plain, !caps.is_terminal);
        let unicode = pick(options.unicode, !(caps.legacy_windows || caps.ascii_only));
        let hyperlinks = pick(options.hyperlinks, !caps.legacy_windows);
        let images = pick(options.images, caps.is_terminal);
        let color = pick(options.color, caps.is_terminal);
        let image_drawing = options.image_drawing.or_else(|| {
            (caps.is_terminal && !plain && unicode).then_some(ImageDrawing::Block)
        });

        let color_profile = if options.color == Some(false) {
            ColorProfile::Mono
        } else {
            options
                .color_system
                .profile()
                .unwrap_or_else(|| caps.color_profile())
        };

        let flags = Self {
            plain,
            unicode,
            hyperlinks,
            images,
            image_drawing,
            color,
            nerd_font: options.nerd_font,
            negative_space: options.negative_space,
            hide_hyperlink_hints: options.hide_hyperlink_hints,
            hide_output: options.hide_output,
            files: options.files,
            theme: options.theme,
            line_numbers: options.line_numbers,
            code_wrap: options.code_wrap,
            relative_dir: options.relative_dir.clone(),
            characters: options.characters.clone(),
            color_profile,
            width: options.width.or(caps.width).unwrap_or(DEFAULT_WIDTH),
            height: caps.height,
        };
        tracing::debug!(
            plain = flags.plain,
            unicode = flags.unicode,
            images = flags.images,
            image_drawing = ?flags.image_drawing,
            profile = ?flags.color_profile,
            width = flags.width,
            "resolved render flags"
        );
        flags
    }

    /// Flags for a plain, undecorated render at `width`, independent of the
    /// environment.
    #[must_use]
    pub fn plain_text(width: usize) -> Self {
        let options = RenderOptions {
            width: Some(width),
            ..RenderOptions::default()
        };
        Self::resolve(&options, &TerminalCapabilities::basic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ColorSystem;

    fn terminal() -> TerminalCapabilities {
        TerminalCapabilities {
            is_terminal: true,
            legacy_windows: false,
            ascii_only: false,
            no_color: false,
            true_color: true,
            colors_256: true,
            width: Some(100),
            height: Some(30),
        }
    }

    #[test]
    fn terminal_detection_enables_decorations() {
        let flags = RenderFeatureFlags::resolve(&RenderOptions::default(), &terminal());
        assert!(!flags.plain);
        assert!(flags.unicode);
        assert!(flags.hyperlinks);
        assert!(flags.images);
        assert!(flags.color);
        assert_eq!(flags.image_drawing, Some(ImageDrawing::Block));
        assert_eq!(flags.width, 100);
        assert_eq!(flags.height, Some(30));
        assert_eq!(flags.color_profile, ColorProfile::TrueColor);
    }

    #[test]
    fn pipe_detection_is_plain() {
        let flags =
            RenderFeatureFlags::resolve(&RenderOptions::default(), &TerminalCapabilities::basic());
        assert!(flags.plain);
        assert!(!flags.images);
        assert!(!flags.color);
        assert_eq!(flags.image_drawing, None);
        assert_eq!(flags.width, DEFAULT_WIDTH);
    }

    #[test]
    fn explicit_options_win() {
        let options = RenderOptions {
            plain: Some(false),
            unicode: Some(false),
            hyperlinks: Some(false),
            image_drawing: Some(ImageDrawing::Braille),
            color_system: ColorSystem::Standard,
            width: Some(60),
            ..RenderOptions::default()
        };
        let flags = RenderFeatureFlags::resolve(&options, &terminal());
        assert!(!flags.plain);
        assert!(!flags.unicode);
        assert!(!flags.hyperlinks);
        assert_eq!(flags.image_drawing, Some(ImageDrawing::Braille));
        assert_eq!(flags.color_profile, ColorProfile::Ansi16);
        assert_eq!(flags.width, 60);
    }

    #[test]
    fn no_unicode_disables_block_detection() {
        let options = RenderOptions {
            unicode: Some(false),
            ..RenderOptions::default()
        };
        let flags = RenderFeatureFlags::resolve(&options, &terminal());
        assert_eq!(flags.image_drawing, None);
    }

    #[test]
    fn legacy_windows_disables_unicode_and_links() {
        let caps = TerminalCapabilities {
            legacy_windows: true,
            ..terminal()
        };
        let flags = RenderFeatureFlags::resolve(&RenderOptions::default(), &caps);
        assert!(!flags.unicode);
        assert!(!flags.hyperlinks);
    }

    #[test]
    fn no_color_forces_mono() {
        let options = RenderOptions {
            color: Some(false),
            color_system: ColorSystem::TrueColor,
            ..RenderOptions::default()
        };
        let flags = RenderFeatureFlags::resolve(&options, &terminal());
        assert_eq!(flags.color_profile, ColorProfile::Mono);
        assert!(!flags.color);
    }

    fn caps_strategy() -> impl proptest::strategy::Strategy<Value = TerminalCapabilities> {
        use proptest::prelude::*;
        (
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            proptest::option::of(20usize..300),
        )
            .prop_map(|(is_terminal, legacy_windows, ascii_only, true_color, width)| {
                TerminalCapabilities {
                    is_terminal,
                    legacy_windows,
                    ascii_only,
                    no_color: false,
                    true_color,
                    colors_256: true_color,
                    width,
                    height: None,
                }
            })
    }

    proptest::proptest! {
        #[test]
        fn explicit_switches_beat_detection(
            caps in caps_strategy(),
            plain in proptest::option::of(proptest::bool::ANY),
            unicode in proptest::option::of(proptest::bool::ANY),
            hyperlinks in proptest::option::of(proptest::bool::ANY),
            images in proptest::option::of(proptest::bool::ANY),
            color in proptest::option::of(proptest::bool::ANY),
            width in proptest::option::of(10usize..400),
        ) {
            let options = RenderOptions {
                plain,
                unicode,
                hyperlinks,
                images,
                color,
                width,
                ..RenderOptions::default()
            };
            let flags = RenderFeatureFlags::resolve(&options, &caps);
            let detected = RenderFeatureFlags::resolve(&RenderOptions::default(), &caps);
            proptest::prop_assert_eq!(flags.plain, plain.unwrap_or(detected.plain));
            proptest::prop_assert_eq!(flags.unicode, unicode.unwrap_or(detected.unicode));
            proptest::prop_assert_eq!(flags.hyperlinks, hyperlinks.unwrap_or(detected.hyperlinks));
            proptest::prop_assert_eq!(flags.images, images.unwrap_or(detected.images));
            proptest::prop_assert_eq!(flags.color, color.unwrap_or(detected.color));
            proptest::prop_assert_eq!(flags.width, width.unwrap_or(detected.width));
            if color == Some(false) {
                proptest::prop_assert_eq!(flags.color_profile, ColorProfile::Mono);
            }
        }
    }
}

