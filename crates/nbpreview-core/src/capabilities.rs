#![forbid(unsafe_code)]

//! Terminal capability detection.
//!
//! Detection reads a handful of environment variables and asks whether
//! stdout is a terminal. It runs once per render; the result is frozen into
//! [`RenderFeatureFlags`](crate::RenderFeatureFlags) and never re-queried.
//!
//! # Detection Rules
//!
//! | Capability | Source |
//! |------------|--------|
//! | `is_terminal` | `std::io::IsTerminal` on stdout |
//! | `no_color` | `NO_COLOR`, `NBPREVIEW_NO_COLOR`, or `TERM=dumb` |
//! | `true_color` | `COLORTERM` of `truecolor`/`24bit`, a known modern terminal, or Windows Terminal |
//! | `colors_256` | true color, or `TERM` containing `256` |
//! | `legacy_windows` | Windows console without `WT_SESSION` or `TERM` |
//! | `ascii_only` | locale (`LC_ALL`, `LC_CTYPE`, `LANG`) naming a non-UTF-8 codeset |

use std::env;
use std::io::IsTerminal;

use nbpreview_style::ColorProfile;

/// Raw detection inputs, separated from the environment so detection is a
/// pure function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectInputs {
    pub is_terminal: bool,
    pub windows: bool,
    pub no_color: bool,
    pub term: String,
    pub term_program: String,
    pub colorterm: String,
    pub wt_session: bool,
    /// First non-empty of `LC_ALL`, `LC_CTYPE`, `LANG`.
    pub locale: String,
    pub size: Option<(u16, u16)>,
}

impl DetectInputs {
    /// Read the process environment and stdout.
    #[must_use]
    pub fn from_env() -> Self {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .into_iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        let is_terminal = std::io::stdout().is_terminal();
        Self {
            is_terminal,
            windows: cfg!(windows),
            no_color: ["NO_COLOR", "NBPREVIEW_NO_COLOR"]
                .into_iter()
                .any(|key| is_truthy(env::var(key).ok().as_deref())),
            term: env::var("TERM").unwrap_or_default(),
            term_program: env::var("TERM_PROGRAM").unwrap_or_default(),
            colorterm: env::var("COLORTERM").unwrap_or_default(),
            wt_session: env::var_os("WT_SESSION").is_some(),
            locale,
            size: if is_terminal {
                crossterm::terminal::size().ok()
            } else {
                None
            },
        }
    }
}

/// Whether a switch-like variable is on: set, non-empty, and neither `0`
/// nor `false`.
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        let value = value.trim();
        !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
    })
}

/// Known terminal programs with 24-bit color.
const MODERN_TERMINALS: &[&str] = &[
    "iTerm.app",
    "WezTerm",
    "Alacritty",
    "Ghostty",
    "kitty",
    "Rio",
    "Hyper",
    "Contour",
    "vscode",
];

/// What the output stream can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCapabilities {
    /// Stdout is an interactive terminal.
    pub is_terminal: bool,
    /// Legacy Windows console (no VT sequences).
    pub legacy_windows: bool,
    /// The output encoding cannot represent non-ASCII glyphs.
    pub ascii_only: bool,
    /// Color output is disabled by the environment.
    pub no_color: bool,
    pub true_color: bool,
    pub colors_256: bool,
    /// Terminal width in columns, when stdout is a terminal.
    pub width: Option<usize>,
    /// Terminal height in rows, when stdout is a terminal.
    pub height: Option<usize>,
}

impl TerminalCapabilities {
    /// Detect capabilities from the environment.
    #[must_use]
    pub fn detect() -> Self {
        let caps = Self::detect_from_inputs(&DetectInputs::from_env());
        tracing::debug!(?caps, "detected terminal capabilities");
        caps
    }

    #[must_use]
    pub fn detect_from_inputs(env: &DetectInputs) -> Self {
        let term = env.term.as_str();
        let is_dumb = term == "dumb";
        let no_color = env.no_color || is_dumb;

        let is_modern_terminal = MODERN_TERMINALS
            .iter()
            .any(|t| env.term_program.contains(t) || term.contains(&t.to_lowercase()))
            || env.wt_session;
        let colorterm = env.colorterm.to_ascii_lowercase();
        let true_color = !no_color
            && (colorterm.contains("truecolor") || colorterm.contains("24bit") || is_modern_terminal);
        let colors_256 = !no_color && (true_color || term.contains("256"));

        let legacy_windows = env.windows && !env.wt_session && term.is_empty();

        Self {
            is_terminal: env.is_terminal,
            legacy_windows,
            ascii_only: locale_is_ascii(&env.locale),
            no_color,
            true_color,
            colors_256,
            width: env.size.map(|(w, _)| usize::from(w)),
            height: env.size.map(|(_, h)| usize::from(h)),
        }
    }

    /// A non-interactive, colorless, unicode-capable stream of unknown size.
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            is_terminal: false,
            legacy_windows: false,
            ascii_only: false,
            no_color: true,
            true_color: false,
            colors_256: false,
            width: None,
            height: None,
        }
    }

    /// The richest color profile the stream supports.
    #[must_use]
    pub const fn color_profile(&self) -> ColorProfile {
        ColorProfile::from_flags(self.true_color, self.colors_256, self.no_color)
    }
}

/// `C`/`POSIX` locales and explicit non-UTF-8 codesets are ASCII-only. An
/// unset locale is assumed to be UTF-8.
fn locale_is_ascii(locale: &str) -> bool {
    if locale.is_empty() {
        return false;
    }
    if locale == "C" || locale == "POSIX" {
        return true;
    }
    match locale.split_once('.') {
        Some((_, codeset)) => {
            let codeset = codeset.split('@').next().unwrap_or_default().to_ascii_lowercase();
            codeset != "utf-8" && codeset != "utf8"
        }
        None => false,
    }
}
