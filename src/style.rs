//! Caption styling policy.
//!
//! [`CaptionStyle`] holds every visual constant used when a caption is
//! burned into the frame: font, colors, text box limits, background box and
//! bottom margin. The defaults reproduce the house style (36pt bold
//! sans-serif, white text with a thin black outline, on a 650×120 dark grey
//! box 50 units above the bottom edge). Override individual values with the
//! builder methods.
//!
//! # Example
//!
//! ```
//! use hardsub::{CaptionStyle, Color};
//!
//! let style = CaptionStyle::default()
//!     .font_size(42.0)
//!     .background_color(Color::rgb(0, 0, 0));
//! assert_eq!(style.max_text_width, 600);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// 255 is fully opaque.
    pub alpha: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const DARK_GREY: Color = Color::rgb(50, 50, 50);

    /// An opaque color.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    /// Return the same color with a different alpha.
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// FFmpeg color syntax, e.g. `0x323232@1.000`.
    pub fn to_ffmpeg(self) -> String {
        format!(
            "0x{:02X}{:02X}{:02X}@{:.3}",
            self.red,
            self.green,
            self.blue,
            self.alpha as f32 / 255.0
        )
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

/// Visual policy applied to every caption.
///
/// All lengths are in output pixels; the font size is in the rasterizer's
/// point scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    /// Fontconfig pattern used when no [`font_file`](Self::font_file) is set.
    pub font_family: String,
    /// Explicit font file. Takes precedence over `font_family`.
    pub font_file: Option<PathBuf>,
    pub font_size: f32,
    pub text_color: Color,
    pub stroke_color: Color,
    /// Outline thickness. FFmpeg draws whole pixels, so fractional values
    /// are rounded up when rendered.
    pub stroke_width: f32,
    /// Text wider than this is re-laid out as wrapped, centered lines.
    pub max_text_width: u32,
    /// Background box width.
    pub box_width: u32,
    /// Background box height.
    pub box_height: u32,
    pub background_color: Color,
    /// Transparent gap between the box and the bottom edge of the frame.
    pub bottom_margin: u32,
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_family: "Sans:style=Bold".to_string(),
            font_file: None,
            font_size: 36.0,
            text_color: Color::WHITE,
            stroke_color: Color::BLACK,
            stroke_width: 0.5,
            max_text_width: 600,
            box_width: 650,
            box_height: 120,
            background_color: Color::DARK_GREY,
            bottom_margin: 50,
            line_spacing: 1.2,
        }
    }
}

impl CaptionStyle {
    /// Create the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fontconfig family pattern.
    #[must_use]
    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Render with a specific font file instead of a family lookup.
    #[must_use]
    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    #[must_use]
    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    #[must_use]
    pub fn stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke_color = color;
        self.stroke_width = width;
        self
    }

    /// Set the width past which captions wrap.
    #[must_use]
    pub fn max_text_width(mut self, width: u32) -> Self {
        self.max_text_width = width;
        self
    }

    /// Set the background box dimensions.
    #[must_use]
    pub fn box_size(mut self, width: u32, height: u32) -> Self {
        self.box_width = width;
        self.box_height = height;
        self
    }

    #[must_use]
    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    #[must_use]
    pub fn bottom_margin(mut self, margin: u32) -> Self {
        self.bottom_margin = margin;
        self
    }

    /// Height of one laid-out line.
    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_spacing
    }

    /// Stroke width as drawn by FFmpeg's `drawtext` (`borderw`).
    pub(crate) fn border_pixels(&self) -> u32 {
        if self.stroke_width <= 0.0 {
            0
        } else {
            self.stroke_width.ceil() as u32
        }
    }
}
