#![forbid(unsafe_code)]

//! Style: colors, color profiles, and text attributes shared by every
//! nbpreview layer.

pub mod color;
pub mod style;

pub use color::{
    Ansi16, Color, ColorProfile, Rgb, ansi16_to_rgb, ansi256_to_rgb,
    rgb_to_256, rgb_to_ansi16,
};
pub use style::{Style, StyleFlags};
